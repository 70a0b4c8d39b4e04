//! The compiler capability consumed by the orchestrator.
//!
//! Parsing, transforming and bundling are delegated to an opaque
//! [`Compiler`]. The orchestrator only supplies options and a pair of hooks
//! ([`CompileHooks`]) that serve every module in the virtual namespace from
//! the current [`VirtualFileStore`](crate::VirtualFileStore) snapshot.

mod hooks;
mod process;
pub(crate) mod rpc;

pub use hooks::VirtualFsPlugin;
pub use process::{ProcessCompiler, ProcessCompilerConfig, RpcBridge};

use crate::config::BuildOptions;
use crate::error::CompileError;
use crate::resolver::{Loader, Resolution};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Namespace tag for modules served from the in-memory store.
pub const VIRTUAL_NAMESPACE: &str = "virtual";

/// Why the compiler is asking to resolve a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveKind {
    EntryPoint,
    ImportStatement,
    DynamicImport,
    RequireCall,
    ImportRule,
    UrlToken,
}

/// Arguments to the resolve hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveArgs {
    /// The specifier as written in the importing module.
    pub path: String,
    /// Path of the importing module, absent for entry points.
    #[serde(default)]
    pub importer: Option<String>,
    pub kind: ResolveKind,
    /// Namespace of the importing module.
    #[serde(default)]
    pub namespace: String,
}

impl ResolveArgs {
    /// Resolve request for an entry point.
    pub fn entry_point(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            importer: None,
            kind: ResolveKind::EntryPoint,
            namespace: String::new(),
        }
    }

    /// Resolve request for an `import` statement inside a virtual module.
    pub fn import(path: impl Into<String>, importer: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            importer: Some(importer.into()),
            kind: ResolveKind::ImportStatement,
            namespace: VIRTUAL_NAMESPACE.to_string(),
        }
    }
}

/// Arguments to the load hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadArgs {
    pub path: String,
    pub namespace: String,
}

impl LoadArgs {
    /// Load request for a module in the virtual namespace.
    pub fn virtual_module(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: VIRTUAL_NAMESPACE.to_string(),
        }
    }
}

/// A module served by the load hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedModule {
    pub contents: String,
    pub loader: Loader,
    /// Directory nested imports inside this module resolve against.
    pub resolve_dir: String,
}

/// Resolve and load callbacks the compiler invokes while bundling.
pub trait CompileHooks: Send + Sync {
    /// Map a specifier to a module location.
    fn on_resolve(&self, args: &ResolveArgs) -> Resolution;

    /// Serve a module's contents, or `None` to let the compiler handle it.
    fn on_load(&self, args: &LoadArgs) -> Option<LoadedModule>;
}

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Esm,
}

/// Execution model the bundle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Browser,
}

/// JSX transform mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsxMode {
    Automatic,
}

/// Options passed to the compiler for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub entry_points: Vec<String>,
    pub write: bool,
    pub bundle: bool,
    pub format: OutputFormat,
    pub platform: Platform,
    pub target: Vec<String>,
    pub jsx: JsxMode,
    pub jsx_import_source: String,
    pub log_level: String,
    pub outdir: String,
    pub asset_names: String,
}

impl CompileOptions {
    /// Fixed options for bundling `entry` as a browser ES module.
    pub fn for_entry(entry: impl Into<String>, options: &BuildOptions) -> Self {
        Self {
            entry_points: vec![entry.into()],
            write: false,
            bundle: true,
            format: OutputFormat::Esm,
            platform: Platform::Browser,
            target: vec![options.target.clone()],
            jsx: JsxMode::Automatic,
            jsx_import_source: options.jsx_import_source.clone(),
            log_level: "silent".to_string(),
            outdir: "/".to_string(),
            asset_names: "[name]".to_string(),
        }
    }
}

/// One file emitted by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    pub path: String,
    pub text: String,
}

impl OutputFile {
    /// Create a new output file.
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// True for stylesheet outputs.
    pub fn is_stylesheet(&self) -> bool {
        self.path.ends_with(".css")
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    #[serde(default)]
    pub output_files: Vec<OutputFile>,
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
}

/// Source position a diagnostic points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// Diagnostic severity, used when formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A message reported by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a diagnostic without a location.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// Attach a source location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Plain-text rendering, e.g. `src/a.ts:3:1: warning: unused import`.
    pub fn format(&self, severity: Severity) -> String {
        match &self.location {
            Some(loc) => format!(
                "{}:{}:{}: {}: {}",
                loc.file, loc.line, loc.column, severity, self.text
            ),
            None => format!("{}: {}", severity, self.text),
        }
    }
}

/// An external compilation engine.
///
/// Implementations bundle `options.entry_points`, asking `hooks` to resolve
/// every specifier and to load every module in the virtual namespace.
/// Specifiers resolved as external stay unresolved runtime imports.
#[async_trait]
pub trait Compiler: Send + Sync {
    async fn compile(
        &self,
        options: CompileOptions,
        hooks: Arc<dyn CompileHooks>,
    ) -> Result<CompileOutput, CompileError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_options_fixed_fields() {
        let options = CompileOptions::for_entry("src/index.tsx", &BuildOptions::default());
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["entryPoints"], serde_json::json!(["src/index.tsx"]));
        assert_eq!(json["bundle"], true);
        assert_eq!(json["write"], false);
        assert_eq!(json["format"], "esm");
        assert_eq!(json["platform"], "browser");
        assert_eq!(json["target"], serde_json::json!(["es2022"]));
        assert_eq!(json["jsx"], "automatic");
        assert_eq!(json["jsxImportSource"], "react");
    }

    #[test]
    fn test_output_file_kind() {
        assert!(OutputFile::new("/index.css", "").is_stylesheet());
        assert!(!OutputFile::new("/index.js", "").is_stylesheet());
    }

    #[test]
    fn test_diagnostic_format() {
        let diag = Diagnostic::new("unused import").with_location(Location {
            file: "src/a.ts".into(),
            line: 3,
            column: 1,
        });
        assert_eq!(
            diag.format(Severity::Warning),
            "src/a.ts:3:1: warning: unused import"
        );
        assert_eq!(
            Diagnostic::new("boom").format(Severity::Error),
            "error: boom"
        );
    }

    #[test]
    fn test_resolve_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(ResolveKind::EntryPoint).unwrap(),
            "entry-point"
        );
        assert_eq!(
            serde_json::to_value(ResolveKind::ImportStatement).unwrap(),
            "import-statement"
        );
    }
}
