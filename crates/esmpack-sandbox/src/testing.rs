//! In-memory [`ModuleRuntime`] that records what the sandbox asks of it.

use crate::error::{Result, SandboxError};
use crate::fault::{FaultHook, FaultOrigin, FaultValue};
use crate::runtime::{ImportMap, ModuleRuntime, ModuleUrl};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// One call made on a [`RecordingRuntime`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    Create(ModuleUrl, String),
    Revoke(ModuleUrl),
    InstallImportMap,
    Import(ModuleUrl),
}

#[derive(Default)]
struct State {
    events: Vec<RuntimeEvent>,
    modules: HashMap<ModuleUrl, String>,
    import_map: Option<ImportMap>,
    hook: Option<FaultHook>,
    import_failures: VecDeque<String>,
    import_gates: VecDeque<oneshot::Receiver<()>>,
}

/// Records every runtime call and never executes anything.
///
/// Clones share state, so a test can keep one and hand another to the
/// sandbox.
#[derive(Clone, Default)]
pub struct RecordingRuntime {
    state: Arc<Mutex<State>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call so far, in order.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.lock().events.clone()
    }

    /// Modules created and not yet revoked.
    pub fn live_modules(&self) -> usize {
        self.lock().modules.len()
    }

    /// Code of every module imported so far, in order.
    pub fn imported_code(&self) -> Vec<String> {
        let state = self.lock();
        state
            .events
            .iter()
            .filter_map(|event| match event {
                RuntimeEvent::Import(url) => state.events.iter().find_map(|e| match e {
                    RuntimeEvent::Create(created, code) if created == url => Some(code.clone()),
                    _ => None,
                }),
                _ => None,
            })
            .collect()
    }

    pub fn import_map(&self) -> Option<ImportMap> {
        self.lock().import_map.clone()
    }

    /// Make the next import fail as if evaluation threw `message`.
    pub fn fail_next_import(&self, message: impl Into<String>) {
        self.lock().import_failures.push_back(message.into());
    }

    /// Hold the next ungated import until the returned sender fires.
    pub fn gate_next_import(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().import_gates.push_back(rx);
        tx
    }

    /// Raise an uncaught fault as a running module would.
    ///
    /// Returns `false` if no fault hook has been attached.
    pub fn raise(&self, value: FaultValue, origin: FaultOrigin) -> bool {
        match self.lock().hook.clone() {
            Some(hook) => {
                hook.raise(value, origin);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ModuleRuntime for RecordingRuntime {
    fn create_module(&self, code: &str) -> ModuleUrl {
        let url = ModuleUrl::new();
        let mut state = self.lock();
        state.modules.insert(url.clone(), code.to_string());
        state
            .events
            .push(RuntimeEvent::Create(url.clone(), code.to_string()));
        url
    }

    fn revoke_module(&self, url: &ModuleUrl) {
        let mut state = self.lock();
        state.modules.remove(url);
        state.events.push(RuntimeEvent::Revoke(url.clone()));
    }

    fn install_import_map(&self, map: &ImportMap) -> Result<()> {
        let mut state = self.lock();
        state.import_map = Some(map.clone());
        state.events.push(RuntimeEvent::InstallImportMap);
        Ok(())
    }

    async fn import(&self, url: &ModuleUrl) -> Result<()> {
        let (gate, failure) = {
            let mut state = self.lock();
            state.events.push(RuntimeEvent::Import(url.clone()));
            if !state.modules.contains_key(url) {
                return Err(SandboxError::Evaluation(format!(
                    "Failed to fetch dynamically imported module: {url}"
                )));
            }
            (
                state.import_gates.pop_front(),
                state.import_failures.pop_front(),
            )
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match failure {
            Some(message) => Err(SandboxError::Evaluation(message)),
            None => Ok(()),
        }
    }

    fn attach_fault_hook(&self, hook: FaultHook) {
        self.lock().hook = Some(hook);
    }
}
