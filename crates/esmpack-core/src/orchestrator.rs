//! Build orchestration: one compile cycle over a fresh store snapshot.

use crate::compiler::{CompileOptions, Compiler, Severity, VirtualFsPlugin};
use crate::config::BuildOptions;
use crate::error::{BuildError, Result};
use crate::resolver::normalize_path;
use crate::store::{VirtualFile, VirtualFileStore};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic identifier minted once per build request.
///
/// Only the build holding the latest token may commit its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildToken(u64);

impl BuildToken {
    /// The raw counter value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BuildToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Artifacts of a successful compile, separated by content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle {
    /// The first non-stylesheet output.
    pub code: String,
    /// Every stylesheet output, in compiler order.
    pub css_chunks: Vec<String>,
    /// Compiler warnings formatted as plain text.
    pub warnings: Vec<String>,
}

impl Bundle {
    /// Fail with [`BuildError::EmptyBundle`] if there is no usable code.
    pub fn ensure_code(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(BuildError::EmptyBundle);
        }
        Ok(())
    }
}

/// Drives the compiler for one preview, guarding against superseded builds.
///
/// Builds never share mutable state: each gets its own store snapshot, so
/// several may be in flight at once. Callers mint a [`BuildToken`] with
/// [`begin`](Self::begin) before building and check
/// [`is_current`](Self::is_current) before committing anything.
pub struct BuildOrchestrator {
    compiler: Arc<dyn Compiler>,
    options: BuildOptions,
    latest: AtomicU64,
}

impl BuildOrchestrator {
    /// Create an orchestrator with default build options.
    pub fn new(compiler: Arc<dyn Compiler>) -> Self {
        Self::with_options(compiler, BuildOptions::default())
    }

    /// Create an orchestrator with explicit build options.
    pub fn with_options(compiler: Arc<dyn Compiler>, options: BuildOptions) -> Self {
        Self {
            compiler,
            options,
            latest: AtomicU64::new(0),
        }
    }

    /// Get the build options.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Mint a new token; every earlier token becomes stale.
    pub fn begin(&self) -> BuildToken {
        BuildToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True if no newer token has been minted since `token`.
    pub fn is_current(&self, token: BuildToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Compile `files` starting from `entry`.
    ///
    /// Fails with [`BuildError::EntryNotFound`] before invoking the compiler
    /// if the normalized entry is empty or absent from the files.
    pub async fn build(&self, files: &[VirtualFile], entry: &str) -> Result<Bundle> {
        let start = std::time::Instant::now();
        let store = Arc::new(VirtualFileStore::from_files(files));
        let entry_path = normalize_path(entry);

        if entry_path.is_empty() || !store.contains(entry_path) {
            tracing::debug!(entry = %entry, files = store.len(), "Entry file not in store");
            return Err(BuildError::EntryNotFound(entry.to_string()));
        }

        tracing::debug!(entry = %entry_path, files = store.len(), "Starting build");
        let hooks = Arc::new(VirtualFsPlugin::new(Arc::clone(&store), entry_path));
        let options = CompileOptions::for_entry(entry_path, &self.options);

        let output = match self.compiler.compile(options, hooks).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(
                    entry = %entry_path,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Build failed"
                );
                return Err(e.into());
            }
        };

        let mut bundle = Bundle {
            warnings: output
                .warnings
                .iter()
                .map(|w| w.format(Severity::Warning))
                .collect(),
            ..Bundle::default()
        };
        let mut have_code = false;
        for file in output.output_files {
            if file.is_stylesheet() {
                bundle.css_chunks.push(file.text);
            } else if !have_code {
                bundle.code = file.text;
                have_code = true;
            } else {
                tracing::trace!(path = %file.path, "Ignoring extra script output");
            }
        }

        tracing::debug!(
            entry = %entry_path,
            elapsed_ms = start.elapsed().as_millis() as u64,
            code_len = bundle.code.len(),
            css_chunks = bundle.css_chunks.len(),
            warnings = bundle.warnings.len(),
            "Build completed"
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileHooks, CompileOutput, Diagnostic, OutputFile};
    use crate::error::CompileError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Returns canned outputs and counts invocations.
    struct CannedCompiler {
        outputs: Vec<OutputFile>,
        warnings: Vec<Diagnostic>,
        calls: AtomicUsize,
    }

    impl CannedCompiler {
        fn new(outputs: Vec<OutputFile>) -> Self {
            Self {
                outputs,
                warnings: Vec::new(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Compiler for CannedCompiler {
        async fn compile(
            &self,
            _options: CompileOptions,
            _hooks: Arc<dyn CompileHooks>,
        ) -> std::result::Result<CompileOutput, CompileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompileOutput {
                output_files: self.outputs.clone(),
                warnings: self.warnings.clone(),
            })
        }
    }

    fn files() -> Vec<VirtualFile> {
        vec![VirtualFile::new("src/index.tsx", "render()")]
    }

    #[test]
    fn test_tokens_are_monotonic() {
        let orchestrator =
            BuildOrchestrator::new(Arc::new(CannedCompiler::new(Vec::new())));
        let first = orchestrator.begin();
        assert!(orchestrator.is_current(first));

        let second = orchestrator.begin();
        assert!(second > first);
        assert!(!orchestrator.is_current(first));
        assert!(orchestrator.is_current(second));
    }

    #[tokio::test]
    async fn test_outputs_split_by_content_type() {
        let compiler = Arc::new(CannedCompiler::new(vec![
            OutputFile::new("/index.css", "h1{}"),
            OutputFile::new("/index.js", "first"),
            OutputFile::new("/chunk.js", "second"),
            OutputFile::new("/extra.css", "p{}"),
        ]));
        let orchestrator = BuildOrchestrator::new(compiler);
        let bundle = orchestrator.build(&files(), "src/index.tsx").await.unwrap();
        assert_eq!(bundle.code, "first");
        assert_eq!(bundle.css_chunks, vec!["h1{}", "p{}"]);
        assert!(bundle.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_missing_entry_skips_compiler() {
        let compiler = Arc::new(CannedCompiler::new(Vec::new()));
        let orchestrator = BuildOrchestrator::new(compiler.clone());

        let err = orchestrator.build(&files(), "src/main.tsx").await.unwrap_err();
        assert!(matches!(err, BuildError::EntryNotFound(ref e) if e == "src/main.tsx"));

        let err = orchestrator.build(&[], "").await.unwrap_err();
        assert!(matches!(err, BuildError::EntryNotFound(_)));

        assert_eq!(compiler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_entry_is_normalized() {
        let compiler = Arc::new(CannedCompiler::new(vec![OutputFile::new("/index.js", "x")]));
        let orchestrator = BuildOrchestrator::new(compiler.clone());
        orchestrator.build(&files(), "./src/index.tsx").await.unwrap();
        orchestrator.build(&files(), "/src/index.tsx").await.unwrap();
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_warnings_are_formatted() {
        let mut compiler = CannedCompiler::new(vec![OutputFile::new("/index.js", "x")]);
        compiler.warnings = vec![Diagnostic::new("Duplicate key \"a\"")];
        let orchestrator = BuildOrchestrator::new(Arc::new(compiler));
        let bundle = orchestrator.build(&files(), "src/index.tsx").await.unwrap();
        assert_eq!(bundle.warnings, vec!["warning: Duplicate key \"a\""]);
    }

    #[tokio::test]
    async fn test_empty_output_is_empty_bundle() {
        let compiler = Arc::new(CannedCompiler::new(vec![OutputFile::new("/index.js", "  \n")]));
        let orchestrator = BuildOrchestrator::new(compiler);
        let bundle = orchestrator.build(&files(), "src/index.tsx").await.unwrap();
        assert!(matches!(bundle.ensure_code(), Err(BuildError::EmptyBundle)));

        let only_css = Bundle {
            css_chunks: vec!["h1{}".into()],
            ..Bundle::default()
        };
        assert!(only_css.ensure_code().is_err());
    }
}
