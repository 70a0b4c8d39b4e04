//! Resolve/load hooks serving the virtual namespace from a store snapshot.

use super::{CompileHooks, LoadArgs, LoadedModule, ResolveArgs, ResolveKind, VIRTUAL_NAMESPACE};
use crate::resolver::{self, Loader, Resolution};
use crate::store::VirtualFileStore;
use std::sync::Arc;

/// Hooks bound to one store snapshot and one normalized entry path.
#[derive(Debug, Clone)]
pub struct VirtualFsPlugin {
    store: Arc<VirtualFileStore>,
    entry: String,
}

impl VirtualFsPlugin {
    /// Bind hooks to a store and an already-normalized entry path.
    pub fn new(store: Arc<VirtualFileStore>, entry: impl Into<String>) -> Self {
        Self {
            store,
            entry: entry.into(),
        }
    }

    /// The store these hooks serve from.
    pub fn store(&self) -> &VirtualFileStore {
        &self.store
    }

    /// The entry path every entry-point request maps to.
    pub fn entry(&self) -> &str {
        &self.entry
    }
}

impl CompileHooks for VirtualFsPlugin {
    fn on_resolve(&self, args: &ResolveArgs) -> Resolution {
        if args.kind == ResolveKind::EntryPoint {
            return Resolution::Virtual {
                path: self.entry.clone(),
            };
        }

        let resolution = if args.namespace == VIRTUAL_NAMESPACE
            || resolver::is_path_specifier(&args.path)
        {
            resolver::resolve(&args.path, args.importer.as_deref(), &self.store)
        } else {
            // Bare imports from outside the virtual namespace are never
            // matched against the store.
            Resolution::External {
                path: args.path.clone(),
            }
        };

        tracing::trace!(
            specifier = %args.path,
            importer = ?args.importer,
            resolution = ?resolution,
            "Resolved specifier"
        );
        resolution
    }

    fn on_load(&self, args: &LoadArgs) -> Option<LoadedModule> {
        if args.namespace != VIRTUAL_NAMESPACE {
            return None;
        }
        let contents = self.store.get(&args.path)?;
        let dir = resolver::dirname(&args.path);
        Some(LoadedModule {
            contents: contents.to_string(),
            loader: Loader::for_path(&args.path),
            resolve_dir: format!("/{dir}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VirtualFile;

    fn plugin() -> VirtualFsPlugin {
        let files = vec![
            VirtualFile::new("src/index.tsx", "import App from './App';"),
            VirtualFile::new("src/App.tsx", "export default 1;"),
            VirtualFile::new("main", "entry"),
        ];
        VirtualFsPlugin::new(
            Arc::new(VirtualFileStore::from_files(&files)),
            "src/index.tsx",
        )
    }

    #[test]
    fn test_entry_point_always_maps_to_entry() {
        let plugin = plugin();
        for specifier in ["src/index.tsx", "./whatever", "react", ""] {
            assert_eq!(
                plugin.on_resolve(&ResolveArgs::entry_point(specifier)),
                Resolution::Virtual {
                    path: "src/index.tsx".into()
                }
            );
        }
    }

    #[test]
    fn test_import_resolves_in_virtual_namespace() {
        let plugin = plugin();
        assert_eq!(
            plugin.on_resolve(&ResolveArgs::import("./App", "src/index.tsx")),
            Resolution::Virtual {
                path: "src/App.tsx".into()
            }
        );
        assert!(plugin
            .on_resolve(&ResolveArgs::import("react-dom/client", "src/index.tsx"))
            .is_external());
    }

    #[test]
    fn test_bare_import_outside_namespace_is_external() {
        let plugin = plugin();
        let args = ResolveArgs {
            path: "main".into(),
            importer: None,
            kind: ResolveKind::ImportStatement,
            namespace: "file".into(),
        };
        assert!(plugin.on_resolve(&args).is_external());
    }

    #[test]
    fn test_load_returns_contents_loader_and_dir() {
        let plugin = plugin();
        let loaded = plugin
            .on_load(&LoadArgs::virtual_module("src/App.tsx"))
            .expect("module should load");
        assert_eq!(loaded.contents, "export default 1;");
        assert_eq!(loaded.loader, Loader::Tsx);
        assert_eq!(loaded.resolve_dir, "/src");

        let root = plugin.on_load(&LoadArgs::virtual_module("main")).unwrap();
        assert_eq!(root.resolve_dir, "/");
        assert_eq!(root.loader, Loader::Tsx);
    }

    #[test]
    fn test_load_ignores_other_namespaces_and_missing_paths() {
        let plugin = plugin();
        assert!(plugin
            .on_load(&LoadArgs {
                path: "src/App.tsx".into(),
                namespace: "file".into()
            })
            .is_none());
        assert!(plugin.on_load(&LoadArgs::virtual_module("nope.ts")).is_none());
    }
}
