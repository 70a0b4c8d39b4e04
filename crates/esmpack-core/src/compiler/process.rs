//! Compiler implementation backed by an external process.
//!
//! The process speaks newline-delimited JSON-RPC 2.0 on stdin/stdout. The
//! host sends one `build` request; while it is outstanding the process may
//! send any number of `resolve` and `load` requests, which are answered from
//! the build's [`CompileHooks`]. The `build` response carries the output
//! files and warnings, or an error whose `data.errors` lists diagnostics.
//!
//! ```text
//! host                                  compiler process
//!  │ ── build {options} ───────────────────▶ │
//!  │ ◀──────────── resolve {path, importer} ─ │
//!  │ ── {kind: "virtual", path} ───────────▶ │
//!  │ ◀────────────────────── load {path} ─── │
//!  │ ── {contents, loader, resolveDir} ────▶ │
//!  │ ◀──────── {outputFiles, warnings} ───── │
//! ```

use super::rpc::{self, error_codes, Incoming, Request, Response};
use super::{CompileHooks, CompileOptions, CompileOutput, Compiler, Diagnostic, LoadArgs, ResolveArgs};
use crate::config::ConfigError;
use crate::error::CompileError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Command;

/// Configuration for [`ProcessCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCompilerConfig {
    /// Compiler executable.
    pub program: PathBuf,
    /// Extra arguments passed on every spawn.
    pub args: Vec<String>,
}

impl ProcessCompilerConfig {
    /// Create a config for `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `ESMPACK_COMPILER` | compiler executable (required) |
    /// | `ESMPACK_COMPILER_ARGS` | whitespace-separated arguments |
    pub fn from_env() -> Result<Self, ConfigError> {
        let program = std::env::var("ESMPACK_COMPILER")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("ESMPACK_COMPILER"))?;
        let args = std::env::var("ESMPACK_COMPILER_ARGS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self {
            program: PathBuf::from(program),
            args,
        })
    }
}

/// Runs one compiler process per build and bridges its hook callbacks.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    config: ProcessCompilerConfig,
}

impl ProcessCompiler {
    /// Create a compiler that spawns `config.program` for every build.
    pub fn new(config: ProcessCompilerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ProcessCompilerConfig {
        &self.config
    }
}

#[async_trait]
impl Compiler for ProcessCompiler {
    async fn compile(
        &self,
        options: CompileOptions,
        hooks: Arc<dyn CompileHooks>,
    ) -> Result<CompileOutput, CompileError> {
        let start = std::time::Instant::now();
        tracing::debug!(program = %self.config.program.display(), "Spawning compiler process");

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!(program = %self.config.program.display(), error = %e, "Failed to spawn compiler");
                CompileError::Unavailable(format!(
                    "failed to spawn {}: {e}",
                    self.config.program.display()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompileError::Unavailable("compiler stdin not piped".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CompileError::Unavailable("compiler stdout not piped".into()))?;

        let result = RpcBridge::new(stdout, stdin)
            .build(&options, hooks.as_ref())
            .await;

        // The bridge has dropped stdin; a well-behaved compiler exits on EOF.
        if let Err(e) = child.start_kill() {
            tracing::trace!(error = %e, "Compiler process already exited");
        }

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Compiler process finished"
        );
        result
    }
}

/// Newline-delimited JSON-RPC session with a compiler over any byte stream.
pub struct RpcBridge<R, W> {
    reader: BufReader<R>,
    writer: BufWriter<W>,
    next_id: u64,
}

impl<R, W> RpcBridge<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wrap a reader (compiler stdout) and writer (compiler stdin).
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            next_id: 1,
        }
    }

    /// Run one build, answering hook callbacks until the build response arrives.
    pub async fn build(
        mut self,
        options: &CompileOptions,
        hooks: &dyn CompileHooks,
    ) -> Result<CompileOutput, CompileError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = Request::new(id, rpc::METHOD_BUILD, json!({ "options": options }));
        tracing::debug!(id, entry_points = ?options.entry_points, "Sending build request");
        self.send(&request).await?;

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                tracing::warn!(id, "Compiler closed the stream before answering");
                return Err(CompileError::Unavailable(
                    "compiler exited before finishing the build".into(),
                ));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            tracing::trace!(message = %trimmed, "Compiler message");

            match serde_json::from_str::<Incoming>(trimmed) {
                Ok(Incoming::Request(callback)) => {
                    let response = handle_callback(callback, hooks);
                    self.send(&response).await?;
                }
                Ok(Incoming::Response(response)) if response.id == id => {
                    return finish_build(response);
                }
                Ok(Incoming::Response(response)) => {
                    tracing::warn!(id = response.id, "Ignoring response to unknown request");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse compiler message");
                    let response =
                        Response::error(0, error_codes::PARSE_ERROR, format!("parse error: {e}"));
                    self.send(&response).await?;
                }
            }
        }
    }

    async fn send<T: serde::Serialize>(&mut self, message: &T) -> Result<(), CompileError> {
        let text = serde_json::to_string(message)?;
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Answer a `resolve` or `load` callback from the hooks.
fn handle_callback(req: Request, hooks: &dyn CompileHooks) -> Response {
    match req.method.as_str() {
        rpc::METHOD_RESOLVE => match serde_json::from_value::<ResolveArgs>(req.params) {
            Ok(args) => {
                let resolution = hooks.on_resolve(&args);
                match serde_json::to_value(&resolution) {
                    Ok(v) => Response::success(req.id, v),
                    Err(e) => Response::error(req.id, error_codes::INTERNAL_ERROR, e.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(id = req.id, error = %e, "Invalid resolve params");
                Response::error(
                    req.id,
                    error_codes::INVALID_PARAMS,
                    format!("invalid params: {e}"),
                )
            }
        },

        rpc::METHOD_LOAD => match serde_json::from_value::<LoadArgs>(req.params) {
            Ok(args) => {
                let loaded = hooks.on_load(&args);
                match serde_json::to_value(&loaded) {
                    Ok(v) => Response::success(req.id, v),
                    Err(e) => Response::error(req.id, error_codes::INTERNAL_ERROR, e.to_string()),
                }
            }
            Err(e) => {
                tracing::warn!(id = req.id, error = %e, "Invalid load params");
                Response::error(
                    req.id,
                    error_codes::INVALID_PARAMS,
                    format!("invalid params: {e}"),
                )
            }
        },

        _ => {
            tracing::warn!(method = %req.method, "Unknown compiler callback");
            Response::error(
                req.id,
                error_codes::METHOD_NOT_FOUND,
                format!("method not found: {}", req.method),
            )
        }
    }
}

/// Turn the final `build` response into an output or a diagnostic failure.
fn finish_build(response: Response) -> Result<CompileOutput, CompileError> {
    if let Some(error) = response.error {
        let diagnostics = error
            .data
            .as_ref()
            .and_then(|data| data.get("errors"))
            .cloned()
            .map(serde_json::from_value::<Vec<Diagnostic>>)
            .transpose()?
            .unwrap_or_default();

        if diagnostics.is_empty() {
            return Err(CompileError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        tracing::debug!(count = diagnostics.len(), "Build failed with diagnostics");
        return Err(CompileError::Diagnostics {
            errors: diagnostics,
        });
    }

    let result = response.result.unwrap_or(Value::Null);
    if result.is_null() {
        return Err(CompileError::Rpc {
            code: -1,
            message: "missing result in response".into(),
        });
    }
    Ok(serde_json::from_value(result)?)
}
