//! # esmpack-host
//!
//! The host application's side of an esmpack preview: the editable
//! [`Workspace`] of virtual files and the [`PreviewFrame`] that keeps a
//! sandbox in sync with it.
//!
//! ```ignore
//! use esmpack_host::{template, PreviewFrame};
//!
//! let mut workspace = template::starter();
//! let (mut frame, sandbox_port) = PreviewFrame::new();
//! // start the sandbox agent on `sandbox_port` ...
//!
//! while let Some(_message) = frame.next_event(&workspace).await? {
//!     println!("{}", frame.status());
//! }
//!
//! workspace.update("src/App.tsx", "export default () => <p>edited</p>;")?;
//! frame.sync(&workspace)?;
//! ```

mod error;
mod frame;
mod status;
pub mod template;
mod workspace;

pub use error::{HostError, Result, WorkspaceError};
pub use frame::PreviewFrame;
pub use status::{BuildStatus, StatusLine};
pub use workspace::Workspace;
