//! # esmpack-sandbox
//!
//! The disposable execution context of an esmpack preview.
//!
//! A [`SandboxAgent`] receives file sets from the host, builds them with a
//! [`BuildOrchestrator`](esmpack_core::BuildOrchestrator), executes the
//! bundle through a [`ModuleRuntime`] and reports back with a `files-ack`.
//! Uncaught faults raised by running code are rendered on the [`Surface`]
//! by the [`FaultReporter`] instead of escaping to the host.
//!
//! ## Quick Start
//!
//! ```ignore
//! use esmpack_sandbox::{HeadlessSurface, SandboxAgent, SandboxConfig};
//! use std::sync::Arc;
//!
//! let (host_port, sandbox_port) = esmpack_core::channel::pair();
//! let agent = SandboxAgent::new(
//!     sandbox_port,
//!     compiler,
//!     runtime,
//!     Arc::new(HeadlessSurface::new()),
//!     &SandboxConfig::from_env()?,
//! )?;
//! tokio::spawn(agent.run());
//! ```

mod agent;
mod config;
mod error;
pub mod fault;
mod preview;
pub mod runtime;
pub mod surface;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{SandboxAgent, BUILDING_MESSAGE};
pub use config::{SandboxConfig, SandboxConfigBuilder, DEFAULT_CDN_BASE, DEFAULT_REACT_VERSION};
pub use error::{Result, SandboxError};
pub use fault::{FaultHook, FaultOrigin, FaultReport, FaultReporter, FaultValue, RuntimeFault};
pub use preview::PreviewSandbox;
pub use runtime::{AliasState, ImportMap, ModuleRuntime, ModuleUrl};
pub use surface::{HeadlessSurface, Overlay, StyleId, Surface, SurfaceState};
