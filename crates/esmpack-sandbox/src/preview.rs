//! Executes compiled bundles on the sandbox surface.

use crate::error::Result;
use crate::runtime::{AliasState, ImportMap, ModuleRuntime, ModuleUrl};
use crate::surface::{StyleId, Surface};
use std::sync::Arc;

/// Owns the rendered output of the sandbox.
///
/// At most one module is live at a time. Each [`run`](Self::run) replaces
/// the stylesheets, releases the previous module, resets the root and loads
/// the new code, in that order.
pub struct PreviewSandbox {
    runtime: Arc<dyn ModuleRuntime>,
    surface: Arc<dyn Surface>,
    import_map: ImportMap,
    aliases: AliasState,
    styles: Vec<StyleId>,
    current: Option<ModuleUrl>,
}

impl PreviewSandbox {
    pub fn new(
        runtime: Arc<dyn ModuleRuntime>,
        surface: Arc<dyn Surface>,
        import_map: ImportMap,
    ) -> Self {
        Self {
            runtime,
            surface,
            import_map,
            aliases: AliasState::default(),
            styles: Vec::new(),
            current: None,
        }
    }

    /// Render `code` with `css_chunks` applied.
    ///
    /// Errors from loading or evaluating the module are returned as-is. The
    /// new module stays tracked as current even then, so the next run still
    /// releases it.
    pub async fn run(&mut self, code: &str, css_chunks: &[String]) -> Result<()> {
        self.apply_css(css_chunks);

        if let Some(previous) = self.current.take() {
            tracing::debug!(url = %previous, "Revoking previous module");
            self.runtime.revoke_module(&previous);
        }
        self.surface.replace_root();

        let url = self.runtime.create_module(code);
        self.current = Some(url.clone());
        self.aliases.ensure(self.runtime.as_ref(), &self.import_map)?;

        tracing::debug!(url = %url, code_len = code.len(), "Importing module");
        self.runtime.import(&url).await
    }

    /// The module currently tracked as live.
    pub fn current_module(&self) -> Option<&ModuleUrl> {
        self.current.as_ref()
    }

    pub fn aliases(&self) -> AliasState {
        self.aliases
    }

    /// Release the live module and injected styles.
    pub fn dispose(&mut self) {
        if let Some(url) = self.current.take() {
            self.runtime.revoke_module(&url);
        }
        for id in self.styles.drain(..) {
            self.surface.remove_style(id);
        }
    }

    fn apply_css(&mut self, css_chunks: &[String]) {
        for id in self.styles.drain(..) {
            self.surface.remove_style(id);
        }
        for chunk in css_chunks {
            if chunk.trim().is_empty() {
                continue;
            }
            self.styles.push(self.surface.insert_style(chunk));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use crate::surface::HeadlessSurface;
    use crate::testing::{RecordingRuntime, RuntimeEvent};

    fn preview() -> (PreviewSandbox, RecordingRuntime, HeadlessSurface) {
        let runtime = RecordingRuntime::new();
        let surface = HeadlessSurface::new();
        let map = ImportMap::for_config(&SandboxConfig::default()).unwrap();
        let preview = PreviewSandbox::new(
            Arc::new(runtime.clone()),
            Arc::new(surface.clone()),
            map,
        );
        (preview, runtime, surface)
    }

    #[tokio::test]
    async fn test_run_order() {
        let (mut preview, runtime, surface) = preview();
        preview.run("first", &[]).await.unwrap();
        let first = preview.current_module().cloned().unwrap();
        preview.run("second", &[]).await.unwrap();
        let second = preview.current_module().cloned().unwrap();

        let events = runtime.events();
        assert_eq!(
            events,
            vec![
                RuntimeEvent::Create(first.clone(), "first".into()),
                RuntimeEvent::InstallImportMap,
                RuntimeEvent::Import(first.clone()),
                RuntimeEvent::Revoke(first),
                RuntimeEvent::Create(second.clone(), "second".into()),
                RuntimeEvent::Import(second),
            ]
        );
        assert_eq!(surface.snapshot().root_generation, 2);
        assert_eq!(runtime.live_modules(), 1);
        assert_eq!(preview.aliases(), AliasState::Installed);
    }

    #[tokio::test]
    async fn test_styles_replaced_and_blank_chunks_skipped() {
        let (mut preview, _, surface) = preview();
        preview
            .run("x", &["a{}".into(), "  \n".into(), "b{}".into()])
            .await
            .unwrap();
        assert_eq!(surface.snapshot().style_texts(), vec!["a{}", "b{}"]);

        preview.run("x", &["c{}".into()]).await.unwrap();
        assert_eq!(surface.snapshot().style_texts(), vec!["c{}"]);
    }

    #[tokio::test]
    async fn test_failed_import_still_tracks_module() {
        let (mut preview, runtime, _) = preview();
        runtime.fail_next_import("Unexpected token '<'");

        let err = preview.run("<bad", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Unexpected token '<'");
        let failed = preview.current_module().cloned().unwrap();

        preview.run("ok", &[]).await.unwrap();
        assert!(runtime.events().contains(&RuntimeEvent::Revoke(failed)));
        assert_eq!(runtime.live_modules(), 1);
    }

    #[tokio::test]
    async fn test_dispose_releases_everything() {
        let (mut preview, runtime, surface) = preview();
        preview.run("x", &["a{}".into()]).await.unwrap();
        preview.dispose();
        assert!(preview.current_module().is_none());
        assert_eq!(runtime.live_modules(), 0);
        assert!(surface.snapshot().styles.is_empty());
    }
}
