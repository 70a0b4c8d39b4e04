//! Compiler doubles for tests and embedders without a real compiler.
//!
//! [`ScanningCompiler`] walks `import` statements with a regex and drives the
//! hooks exactly the way a bundler would, so resolution behavior can be
//! checked end to end. [`GatedCompiler`] holds builds until released, for
//! exercising out-of-order completion.

use crate::compiler::{
    CompileHooks, CompileOptions, CompileOutput, Compiler, Diagnostic, LoadArgs, Location,
    OutputFile, ResolveArgs,
};
use crate::error::CompileError;
use crate::resolver::{Loader, Resolution};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::{mpsc, oneshot};

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)(?:^\s*(?:import|export)\s+(?:[^'";]*?\s+from\s+)?|import\s*\(\s*)['"]([^'"]+)['"]"#,
        )
        .unwrap_or_else(|e| panic!("import pattern is valid: {e}"))
    })
}

/// Extract import specifiers with the 1-based line they appear on.
pub fn scan_imports(source: &str) -> Vec<(String, u32)> {
    import_pattern()
        .captures_iter(source)
        .filter_map(|caps| {
            let spec = caps.get(1)?;
            let line = source[..spec.start()].matches('\n').count() as u32 + 1;
            Some((spec.as_str().to_string(), line))
        })
        .collect()
}

/// A fake bundler that concatenates every reachable virtual module.
///
/// Script modules are emitted in discovery order into `/<entry-stem>.js`,
/// stylesheet modules into `/<entry-stem>.css`. Relative imports that do not
/// resolve become error diagnostics, like a real bundler's
/// `Could not resolve` message.
#[derive(Debug, Default)]
pub struct ScanningCompiler {
    warnings: Vec<Diagnostic>,
    calls: AtomicUsize,
}

impl ScanningCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report this warning on every successful compile.
    pub fn with_warning(mut self, text: impl Into<String>) -> Self {
        self.warnings.push(Diagnostic::new(text));
        self
    }

    /// How many times `compile` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Compiler for ScanningCompiler {
    async fn compile(
        &self,
        options: CompileOptions,
        hooks: Arc<dyn CompileHooks>,
    ) -> Result<CompileOutput, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry_spec = options.entry_points.first().cloned().unwrap_or_default();
        let entry = match hooks.on_resolve(&ResolveArgs::entry_point(&entry_spec)) {
            Resolution::Virtual { path } => path,
            other => {
                return Err(CompileError::Diagnostics {
                    errors: vec![Diagnostic::new(format!(
                        "Could not resolve entry point \"{}\"",
                        other.path()
                    ))],
                })
            }
        };

        let mut queue = VecDeque::from([entry.clone()]);
        let mut seen = HashSet::from([entry.clone()]);
        let mut errors = Vec::new();
        let mut code = String::new();
        let mut css = String::new();

        while let Some(path) = queue.pop_front() {
            let Some(module) = hooks.on_load(&LoadArgs::virtual_module(&path)) else {
                errors.push(Diagnostic::new(format!("Could not load \"{path}\"")));
                continue;
            };
            if module.loader == Loader::Css {
                css.push_str(&module.contents);
                css.push('\n');
                continue;
            }

            for (specifier, line) in scan_imports(&module.contents) {
                match hooks.on_resolve(&ResolveArgs::import(&specifier, &path)) {
                    Resolution::Virtual { path: target } => {
                        if seen.insert(target.clone()) {
                            queue.push_back(target);
                        }
                    }
                    Resolution::External { .. } => {}
                    Resolution::NotFound { .. } => errors.push(
                        Diagnostic::new(format!("Could not resolve \"{specifier}\"")).with_location(
                            Location {
                                file: path.clone(),
                                line,
                                column: 0,
                            },
                        ),
                    ),
                }
            }
            code.push_str(&format!("// {path}\n{}\n", module.contents));
        }

        if !errors.is_empty() {
            return Err(CompileError::Diagnostics { errors });
        }

        let stem = entry
            .rsplit('/')
            .next()
            .and_then(|name| name.split('.').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("index");
        let mut output_files = vec![OutputFile::new(format!("/{stem}.js"), code)];
        if !css.is_empty() {
            output_files.push(OutputFile::new(format!("/{stem}.css"), css));
        }
        Ok(CompileOutput {
            output_files,
            warnings: self.warnings.clone(),
        })
    }
}

/// Wraps a compiler and holds each call until its gate is opened.
///
/// Gates are handed out in call order by [`gate`](Self::gate); a call that
/// finds no gate waiting runs straight through. Every call announces itself
/// on the receiver returned by [`new`](Self::new) before it waits.
pub struct GatedCompiler<C> {
    inner: C,
    gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    started: mpsc::UnboundedSender<usize>,
    calls: AtomicUsize,
}

impl<C: Compiler> GatedCompiler<C> {
    pub fn new(inner: C) -> (Self, mpsc::UnboundedReceiver<usize>) {
        let (started, rx) = mpsc::unbounded_channel();
        let compiler = Self {
            inner,
            gates: Mutex::new(VecDeque::new()),
            started,
            calls: AtomicUsize::new(0),
        };
        (compiler, rx)
    }

    /// Register a gate for the next ungated call; send on it to release.
    pub fn gate(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(rx);
        tx
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Compiler> Compiler for GatedCompiler<C> {
    async fn compile(
        &self,
        options: CompileOptions,
        hooks: Arc<dyn CompileHooks>,
    ) -> Result<CompileOutput, CompileError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = self
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        let _ = self.started.send(call);
        if let Some(gate) = gate {
            if gate.await.is_err() {
                return Err(CompileError::Unavailable("gate dropped".into()));
            }
        }
        self.inner.compile(options, hooks).await
    }
}
