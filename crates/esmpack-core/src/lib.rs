//! # esmpack-core
//!
//! Virtual module resolution and build orchestration for esmpack previews.
//!
//! This crate turns an in-memory set of source files into a browser bundle
//! by driving an external compiler through a pair of resolve/load hooks,
//! and defines the message protocol spoken between the host application
//! and its preview sandbox.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 esmpack-core (both sides)                │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │ Orchestrator    │────▶│  VirtualFileStore        │   │
//! │  │   - begin()     │     │  (immutable per build)   │   │
//! │  │   - build()     │     └──────────────────────────┘   │
//! │  └─────────────────┘                │                   │
//! │           │                         ▼                   │
//! │           │              ┌──────────────────────────┐   │
//! │           │              │  VirtualFsPlugin         │   │
//! │           │              │  - on_resolve (resolver) │   │
//! │           ▼              │  - on_load               │   │
//! │  ┌─────────────────┐     └──────────────────────────┘   │
//! │  │ dyn Compiler    │◀──── hooks ────┘                   │
//! │  │ (opaque)        │                                    │
//! │  └─────────────────┘                                    │
//! │                                                          │
//! │  ┌─────────────────┐     ┌──────────────────────────┐   │
//! │  │  Port (host)    │◀───▶│  Port (sandbox)          │   │
//! │  │  Message        │     │  origin-checked          │   │
//! │  └─────────────────┘     └──────────────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use esmpack_core::{BuildOrchestrator, VirtualFile};
//! use std::sync::Arc;
//!
//! # async fn example(compiler: Arc<dyn esmpack_core::Compiler>) -> esmpack_core::Result<()> {
//! let orchestrator = BuildOrchestrator::new(compiler);
//!
//! let files = vec![
//!     VirtualFile::new("src/index.tsx", "import App from './App'; App();"),
//!     VirtualFile::new("src/App.tsx", "export default () => <h1>Hi</h1>;"),
//! ];
//!
//! let bundle = orchestrator.build(&files, "src/index.tsx").await?;
//! bundle.ensure_code()?;
//! println!("{} bytes of code, {} stylesheets", bundle.code.len(), bundle.css_chunks.len());
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod compiler;
mod config;
mod error;
mod orchestrator;
pub mod protocol;
pub mod resolver;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use channel::{ChannelClosed, ContextId, Envelope, Port, PortSender};
pub use compiler::{
    CompileHooks, CompileOptions, CompileOutput, Compiler, Diagnostic, Location, OutputFile,
    ProcessCompiler, ProcessCompilerConfig, Severity, VirtualFsPlugin,
};
pub use config::{BuildOptions, BuildOptionsBuilder, ConfigError};
pub use error::{BuildError, CompileError, Result};
pub use orchestrator::{BuildOrchestrator, BuildToken, Bundle};
pub use protocol::{FilesAck, FilesUpdate, Message};
pub use resolver::{Loader, Resolution};
pub use store::{VirtualFile, VirtualFileStore};
