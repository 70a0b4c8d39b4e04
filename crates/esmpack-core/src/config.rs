//! Build configuration types.

use thiserror::Error;

/// Default language target for emitted code.
pub const DEFAULT_TARGET: &str = "es2022";

/// Default package that provides the automatic JSX runtime.
pub const DEFAULT_JSX_IMPORT_SOURCE: &str = "react";

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("target must not be empty")]
    EmptyTarget,

    #[error("jsx import source must be a bare package name, got {0:?}")]
    InvalidJsxImportSource(String),

    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0} must not be empty")]
    Missing(&'static str),
}

/// Options fixed for every build an orchestrator performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Language target (default: es2022).
    pub target: String,
    /// Package the automatic JSX transform imports from (default: react).
    pub jsx_import_source: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            jsx_import_source: DEFAULT_JSX_IMPORT_SOURCE.to_string(),
        }
    }
}

impl BuildOptions {
    /// Create a new options builder.
    pub fn builder() -> BuildOptionsBuilder {
        BuildOptionsBuilder::default()
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        let source = self.jsx_import_source.as_str();
        if source.is_empty() || source.starts_with('.') || source.starts_with('/') {
            return Err(ConfigError::InvalidJsxImportSource(source.to_string()));
        }
        Ok(())
    }
}

/// Builder for BuildOptions.
#[derive(Debug, Default)]
pub struct BuildOptionsBuilder {
    options: BuildOptions,
}

impl BuildOptionsBuilder {
    /// Set the language target.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.options.target = target.into();
        self
    }

    /// Set the JSX runtime package.
    pub fn jsx_import_source(mut self, source: impl Into<String>) -> Self {
        self.options.jsx_import_source = source.into();
        self
    }

    /// Build the options, validating all fields.
    pub fn build(self) -> Result<BuildOptions, ConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = BuildOptions::default();
        assert_eq!(options.target, "es2022");
        assert_eq!(options.jsx_import_source, "react");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_empty_target() {
        let result = BuildOptions::builder().target("  ").build();
        assert_eq!(result, Err(ConfigError::EmptyTarget));
    }

    #[test]
    fn test_builder_rejects_relative_jsx_source() {
        let result = BuildOptions::builder().jsx_import_source("./jsx").build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidJsxImportSource(ref s)) if s == "./jsx"
        ));
    }

    #[test]
    fn test_builder_success() {
        let options = BuildOptions::builder()
            .target("es2020")
            .jsx_import_source("preact")
            .build()
            .expect("should build successfully");
        assert_eq!(options.target, "es2020");
        assert_eq!(options.jsx_import_source, "preact");
    }
}
