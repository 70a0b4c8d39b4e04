//! Sandbox runtime configuration.

use esmpack_core::ConfigError;
use url::Url;

/// Default CDN serving the runtime libraries as ES modules.
pub const DEFAULT_CDN_BASE: &str = "https://esm.sh/";

/// React version every runtime alias is pinned to.
pub const DEFAULT_REACT_VERSION: &str = "18.3.1";

/// Configuration for one preview sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Base URL the runtime aliases point into (default: esm.sh).
    pub cdn_base: String,
    /// Pinned version for `react` and `react-dom` (default: 18.3.1).
    pub react_version: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            react_version: DEFAULT_REACT_VERSION.to_string(),
        }
    }
}

impl SandboxConfig {
    /// Create a new config builder.
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    /// Load overrides from `ESMPACK_CDN_BASE` and `ESMPACK_REACT_VERSION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(base) = std::env::var("ESMPACK_CDN_BASE") {
            config.cdn_base = base;
        }
        if let Ok(version) = std::env::var("ESMPACK_REACT_VERSION") {
            config.react_version = version;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cdn_url()?;
        if self.react_version.trim().is_empty() {
            return Err(ConfigError::Missing("react_version"));
        }
        Ok(())
    }

    /// The CDN base as a URL, always ending in `/` so joins append.
    pub fn cdn_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidUrl {
            url: self.cdn_base.clone(),
            reason: reason.to_string(),
        };
        if self.cdn_base.trim().is_empty() {
            return Err(ConfigError::Missing("cdn_base"));
        }
        let mut url = Url::parse(&self.cdn_base).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

/// Builder for SandboxConfig.
#[derive(Debug, Default)]
pub struct SandboxConfigBuilder {
    config: SandboxConfig,
}

impl SandboxConfigBuilder {
    /// Set the CDN base URL.
    pub fn cdn_base(mut self, base: impl Into<String>) -> Self {
        self.config.cdn_base = base.into();
        self
    }

    /// Set the pinned React version.
    pub fn react_version(mut self, version: impl Into<String>) -> Self {
        self.config.react_version = version.into();
        self
    }

    /// Build the configuration, validating all fields.
    pub fn build(self) -> Result<SandboxConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.cdn_base, "https://esm.sh/");
        assert_eq!(config.react_version, "18.3.1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cdn_url_gets_trailing_slash() {
        let config = SandboxConfig::builder()
            .cdn_base("https://cdn.example.com/npm")
            .build()
            .expect("should build successfully");
        assert_eq!(
            config.cdn_url().unwrap().as_str(),
            "https://cdn.example.com/npm/"
        );
    }

    #[test]
    fn test_builder_rejects_bad_urls() {
        assert!(matches!(
            SandboxConfig::builder().cdn_base("not a url").build(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            SandboxConfig::builder().cdn_base("file:///tmp/").build(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert_eq!(
            SandboxConfig::builder().cdn_base("").build(),
            Err(ConfigError::Missing("cdn_base"))
        );
    }

    #[test]
    fn test_builder_rejects_empty_version() {
        let result = SandboxConfig::builder().react_version(" ").build();
        assert_eq!(result, Err(ConfigError::Missing("react_version")));
    }
}
