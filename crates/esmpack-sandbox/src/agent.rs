//! The sandbox half of the sync protocol.
//!
//! The agent announces readiness, then turns every `files-update` into one
//! build cycle: compile, run, acknowledge. Cycles run as spawned tasks so
//! the message loop keeps draining the port while a compile or module load
//! is in flight. Each cycle carries a [`BuildToken`]; a cycle whose token is
//! no longer the latest finishes silently.

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::fault::{FaultReceiver, FaultReporter, RuntimeFault};
use crate::preview::PreviewSandbox;
use crate::runtime::{ImportMap, ModuleRuntime};
use crate::surface::Surface;
use esmpack_core::{
    BuildError, BuildOrchestrator, BuildToken, Compiler, FilesAck, FilesUpdate, Message, Port,
    PortSender,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Status line shown while a build is running.
pub const BUILDING_MESSAGE: &str = "Building preview...";

/// State shared by every build cycle.
#[derive(Clone)]
struct Cycle {
    orchestrator: Arc<BuildOrchestrator>,
    preview: Arc<Mutex<PreviewSandbox>>,
    reporter: Arc<FaultReporter>,
    surface: Arc<dyn Surface>,
    host: PortSender,
}

/// Runs inside the sandbox, serving one host.
pub struct SandboxAgent {
    port: Port,
    cycle: Cycle,
    faults: Option<FaultReceiver>,
    tasks: Vec<JoinHandle<()>>,
}

impl SandboxAgent {
    /// Wire up a sandbox and install fault capture on `runtime`.
    pub fn new(
        port: Port,
        compiler: Arc<dyn Compiler>,
        runtime: Arc<dyn ModuleRuntime>,
        surface: Arc<dyn Surface>,
        config: &SandboxConfig,
    ) -> Result<Self> {
        config.validate()?;
        let import_map = ImportMap::for_config(config)?;

        let mut reporter = FaultReporter::new(Arc::clone(&surface));
        let faults = reporter.install();
        if let Some(hook) = reporter.hook() {
            runtime.attach_fault_hook(hook);
        }

        let preview = PreviewSandbox::new(runtime, Arc::clone(&surface), import_map);
        let cycle = Cycle {
            orchestrator: Arc::new(BuildOrchestrator::new(compiler)),
            preview: Arc::new(Mutex::new(preview)),
            reporter: Arc::new(reporter),
            surface,
            host: port.sender(),
        };

        Ok(Self {
            port,
            cycle,
            faults,
            tasks: Vec::new(),
        })
    }

    /// The orchestrator builds run through.
    pub fn orchestrator(&self) -> Arc<BuildOrchestrator> {
        Arc::clone(&self.cycle.orchestrator)
    }

    /// Announce readiness and serve messages until the host goes away.
    ///
    /// Returns once the port closes and every in-flight cycle has finished.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(sandbox = %self.port.id(), host = %self.port.peer(), "Sandbox agent starting");
        self.port.post(&Message::IframeReady)?;

        loop {
            tokio::select! {
                message = self.port.recv() => match message {
                    Some(Message::FilesUpdate(update)) => {
                        let token = self.cycle.orchestrator.begin();
                        tracing::debug!(%token, files = update.file_count(), "Files update received");
                        let cycle = self.cycle.clone();
                        self.tasks.retain(|task| !task.is_finished());
                        self.tasks.push(tokio::spawn(async move {
                            cycle.handle_update(token, update).await;
                        }));
                    }
                    Some(other) => {
                        tracing::debug!(kind = other.kind(), "Ignoring message not meant for the sandbox");
                    }
                    None => break,
                },
                Some(fault) = next_fault(&mut self.faults) => {
                    self.cycle.reporter.report(&fault);
                }
            }
        }

        tracing::info!(sandbox = %self.port.id(), "Host closed the channel, stopping");
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Build cycle task failed");
            }
        }
        self.cycle.preview.lock().await.dispose();
        Ok(())
    }
}

async fn next_fault(faults: &mut Option<FaultReceiver>) -> Option<RuntimeFault> {
    match faults {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl Cycle {
    async fn handle_update(&self, token: BuildToken, update: FilesUpdate) {
        let file_count = update.file_count();
        let Some(entry) = update
            .entry()
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
        else {
            self.fail(token, file_count, &SandboxError::Build(BuildError::NoEntry));
            return;
        };

        if self.orchestrator.is_current(token) {
            self.surface.set_message(BUILDING_MESSAGE);
        }
        match self.build_and_run(token, &update, &entry).await {
            Ok(Some(warnings)) => self.succeed(token, file_count, &entry, warnings),
            Ok(None) => tracing::debug!(%token, "Discarding superseded build"),
            Err(e) => self.fail(token, file_count, &e),
        }
    }

    /// `Ok(None)` when a newer update superseded this one.
    async fn build_and_run(
        &self,
        token: BuildToken,
        update: &FilesUpdate,
        entry: &str,
    ) -> Result<Option<Vec<String>>> {
        let bundle = self.orchestrator.build(&update.files, entry).await?;
        if !self.orchestrator.is_current(token) {
            return Ok(None);
        }
        bundle.ensure_code()?;

        let mut preview = self.preview.lock().await;
        if !self.orchestrator.is_current(token) {
            return Ok(None);
        }
        // Cleared before loading so faults from the new module stay visible.
        self.reporter.clear();
        preview.run(&bundle.code, &bundle.css_chunks).await?;
        if !self.orchestrator.is_current(token) {
            return Ok(None);
        }
        Ok(Some(bundle.warnings))
    }

    fn succeed(&self, token: BuildToken, file_count: usize, entry: &str, warnings: Vec<String>) {
        let mut message = format!("Rendered {entry} successfully.");
        if !warnings.is_empty() {
            message.push_str("\nWarnings:\n");
            message.push_str(&warnings.join("\n"));
        }
        self.surface.set_message(&message);
        tracing::info!(%token, entry = %entry, warnings = warnings.len(), "Preview rendered");
        self.ack(FilesAck::success(file_count, warnings));
    }

    fn fail(&self, token: BuildToken, file_count: usize, error: &SandboxError) {
        if !self.orchestrator.is_current(token) {
            tracing::debug!(%token, error = %error, "Superseded build failed");
            return;
        }
        let text = error.to_string();
        self.surface.set_message(&format!("Build failed:\n{text}"));
        tracing::warn!(%token, error = %text, "Build failed");
        self.ack(FilesAck::failure(file_count, text));
    }

    fn ack(&self, ack: FilesAck) {
        if let Err(e) = self.host.post(&Message::FilesAck(ack)) {
            tracing::debug!(error = %e, "Could not acknowledge build");
        }
    }
}
