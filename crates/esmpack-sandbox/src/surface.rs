//! The rendering surface a sandbox draws into.
//!
//! In a browser this is the sandbox document: injected `<style>` elements,
//! the `#root` element, the status line and the fault overlay.
//! [`HeadlessSurface`] keeps the same state in memory.

use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to one injected stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyleId(u64);

/// Content of the fault overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// Element id, so the overlay is found and reused rather than duplicated.
    pub id: String,
    /// Stacking order; the overlay must sit above everything else.
    pub z_index: u32,
    pub title: String,
    /// HTML-escaped summary line.
    pub message_html: String,
    /// HTML-escaped stack trace.
    pub stack_html: String,
}

/// Operations the sandbox performs on its document.
///
/// Implementations are shared between the preview, the fault reporter and
/// the agent, so every method takes `&self`.
pub trait Surface: Send + Sync {
    /// Append a stylesheet to the document head.
    fn insert_style(&self, css: &str) -> StyleId;

    /// Remove a stylesheet previously inserted.
    fn remove_style(&self, id: StyleId);

    /// Swap the rendering root for a fresh, empty element.
    fn replace_root(&self);

    /// Replace the status line text.
    fn set_message(&self, text: &str);

    /// Show the overlay, creating it only if it does not exist yet.
    fn render_overlay(&self, overlay: &Overlay);

    /// Remove the overlay if present.
    fn remove_overlay(&self);
}

/// Snapshot of a [`HeadlessSurface`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// Live stylesheets in document order.
    pub styles: Vec<(StyleId, String)>,
    /// Incremented on every root replacement.
    pub root_generation: u64,
    pub message: String,
    /// Every status line text set, oldest first.
    pub message_log: Vec<String>,
    pub overlay: Option<Overlay>,
    /// How many times an overlay element was created.
    pub overlays_created: usize,
    next_style: u64,
}

impl SurfaceState {
    /// CSS text of the live stylesheets, in order.
    pub fn style_texts(&self) -> Vec<&str> {
        self.styles.iter().map(|(_, css)| css.as_str()).collect()
    }
}

/// In-memory surface for tests and for embedders without a DOM.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SurfaceState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Surface for HeadlessSurface {
    fn insert_style(&self, css: &str) -> StyleId {
        let mut state = self.lock();
        state.next_style += 1;
        let id = StyleId(state.next_style);
        state.styles.push((id, css.to_string()));
        id
    }

    fn remove_style(&self, id: StyleId) {
        self.lock().styles.retain(|(existing, _)| *existing != id);
    }

    fn replace_root(&self) {
        self.lock().root_generation += 1;
    }

    fn set_message(&self, text: &str) {
        let mut state = self.lock();
        state.message = text.to_string();
        state.message_log.push(text.to_string());
    }

    fn render_overlay(&self, overlay: &Overlay) {
        let mut state = self.lock();
        if state.overlay.is_none() {
            state.overlays_created += 1;
        }
        state.overlay = Some(overlay.clone());
    }

    fn remove_overlay(&self) {
        self.lock().overlay = None;
    }
}
