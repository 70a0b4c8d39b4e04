//! The module runtime that loads compiled bundles, and its import map.

use crate::config::SandboxConfig;
use crate::error::Result;
use crate::fault::FaultHook;
use async_trait::async_trait;
use esmpack_core::ConfigError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Bare specifiers the runtime aliases, as (specifier, package, subpath).
const RUNTIME_MODULES: [(&str, &str, &str); 5] = [
    ("react", "react", ""),
    ("react/jsx-runtime", "react", "/jsx-runtime"),
    ("react/jsx-dev-runtime", "react", "/jsx-dev-runtime"),
    ("react-dom", "react-dom", ""),
    ("react-dom/client", "react-dom", "/client"),
];

/// Loadable address of an ephemeral module, valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleUrl(String);

impl ModuleUrl {
    /// Mint a fresh, unique module address.
    pub fn new() -> Self {
        Self(format!("blob:esmpack/{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModuleUrl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModuleUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mapping from bare specifiers to absolute module URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportMap {
    pub imports: BTreeMap<String, String>,
}

impl ImportMap {
    /// Aliases for the React runtime, pinned to the configured version.
    pub fn for_config(config: &SandboxConfig) -> std::result::Result<Self, ConfigError> {
        let base = config.cdn_url()?;
        let mut imports = BTreeMap::new();
        for (specifier, package, subpath) in RUNTIME_MODULES {
            let relative = format!("{package}@{}{subpath}", config.react_version);
            let url = base.join(&relative).map_err(|e| ConfigError::InvalidUrl {
                url: relative.clone(),
                reason: e.to_string(),
            })?;
            imports.insert(specifier.to_string(), url.to_string());
        }
        Ok(Self { imports })
    }

    /// The URL a bare specifier maps to, if any.
    pub fn get(&self, specifier: &str) -> Option<&str> {
        self.imports.get(specifier).map(String::as_str)
    }

    /// The `<script type="importmap">` body.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"imports\":{}}".to_string())
    }
}

/// The execution environment that turns code into running modules.
///
/// In a browser: blob URLs, an import map script and dynamic `import()`.
#[async_trait]
pub trait ModuleRuntime: Send + Sync {
    /// Store `code` and return an address it can be imported from.
    fn create_module(&self, code: &str) -> ModuleUrl;

    /// Release the storage behind `url`.
    fn revoke_module(&self, url: &ModuleUrl);

    /// Make bare specifiers in loaded modules resolve through `map`.
    fn install_import_map(&self, map: &ImportMap) -> Result<()>;

    /// Load and evaluate a module. Errors thrown during evaluation are
    /// returned as [`SandboxError::Evaluation`](crate::SandboxError::Evaluation).
    async fn import(&self, url: &ModuleUrl) -> Result<()>;

    /// Route uncaught errors and unhandled rejections from running modules
    /// to `hook`.
    fn attach_fault_hook(&self, hook: FaultHook);
}

/// One-time installation of the runtime aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasState {
    #[default]
    Pending,
    Installed,
}

impl AliasState {
    /// Install `map` unless already done. Returns whether it installed now.
    pub fn ensure(&mut self, runtime: &dyn ModuleRuntime, map: &ImportMap) -> Result<bool> {
        if *self == Self::Installed {
            return Ok(false);
        }
        runtime.install_import_map(map)?;
        *self = Self::Installed;
        tracing::debug!(aliases = map.imports.len(), "Import map installed");
        Ok(true)
    }
}
