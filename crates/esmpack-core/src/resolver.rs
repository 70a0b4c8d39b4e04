//! Module specifier resolution against a [`VirtualFileStore`].
//!
//! Resolution mirrors filesystem module semantics without a filesystem:
//! relative and absolute specifiers are joined against the importer's
//! directory with URL rules, then probed through a fixed extension/index
//! ladder. Bare specifiers are tried against the store first and are left
//! to the execution environment when nothing matches.
//!
//! Every function here is pure: the same specifier, importer and store
//! snapshot always produce the same answer.

use crate::store::VirtualFileStore;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

/// Extensions probed, in order, when a path has no exact match.
pub const EXTENSION_FALLBACKS: [&str; 6] = [".tsx", ".ts", ".jsx", ".js", ".json", ".css"];

/// Dummy origin used to get standard relative-URL joining.
const RESOLVE_BASE: &str = "https://app.local/";

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Resolution {
    /// Found in the store; served from the virtual namespace.
    Virtual { path: String },
    /// Bare specifier left for the execution environment to satisfy.
    External { path: String },
    /// Relative or absolute specifier that matched nothing.
    NotFound { path: String, specifier: String },
}

impl Resolution {
    /// The resolved (or attempted) path.
    pub fn path(&self) -> &str {
        match self {
            Self::Virtual { path } | Self::External { path } | Self::NotFound { path, .. } => path,
        }
    }

    /// True if the module will be bundled from the store.
    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual { .. })
    }

    /// True if the specifier is passed through untouched.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// How the compiler should interpret a file's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Tsx,
    Ts,
    Jsx,
    Js,
    Json,
    Css,
    Text,
}

impl Loader {
    /// Classify a path purely by its suffix.
    ///
    /// A final segment without any `.` is treated as TSX so extensionless
    /// entry files still compile with markup and types enabled.
    pub fn for_path(path: &str) -> Self {
        let normalized = normalize_path(path);
        let base = normalized.rsplit('/').next().unwrap_or_default();
        if !base.contains('.') {
            return Self::Tsx;
        }
        if normalized.ends_with(".tsx") {
            Self::Tsx
        } else if normalized.ends_with(".ts") {
            Self::Ts
        } else if normalized.ends_with(".jsx") {
            Self::Jsx
        } else if normalized.ends_with(".json") {
            Self::Json
        } else if normalized.ends_with(".css") {
            Self::Css
        } else if normalized.ends_with(".txt") {
            Self::Text
        } else {
            Self::Js
        }
    }

    /// Loader name as the compiler knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tsx => "tsx",
            Self::Ts => "ts",
            Self::Jsx => "jsx",
            Self::Js => "js",
            Self::Json => "json",
            Self::Css => "css",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip one leading `./` and then every leading `/`.
pub fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}

/// Directory part of a normalized path (empty for root-level files).
pub fn dirname(path: &str) -> &str {
    let normalized = normalize_path(path);
    match normalized.rfind('/') {
        Some(idx) => &normalized[..idx],
        None => "",
    }
}

/// True for specifiers that are resolved against the importer (`.` or `/` prefixed).
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with('.') || specifier.starts_with('/')
}

fn resolve_base() -> Option<&'static Url> {
    static BASE: OnceLock<Option<Url>> = OnceLock::new();
    BASE.get_or_init(|| Url::parse(RESOLVE_BASE).ok()).as_ref()
}

/// Join `specifier` against the directory of `importer` using URL rules.
///
/// `..` segments collapse (never above the root), `.` segments are elided,
/// and query strings or fragments are dropped. Without an importer the
/// specifier is resolved against the store root.
pub fn resolve_relative(importer: Option<&str>, specifier: &str) -> Option<String> {
    let root = resolve_base()?;
    let importer = importer.map(normalize_path).unwrap_or_default();
    let base = root.join(if importer.is_empty() { "." } else { importer }).ok()?;
    let resolved = base.join(specifier).ok()?;

    // url keeps the path percent-encoded; store keys are plain text.
    let path = percent_decode_str(resolved.path())
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| resolved.path().to_string());
    Some(path.trim_start_matches('/').to_string())
}

/// Walk the fallback ladder for `path` and return the first stored match.
///
/// Order: exact path, path + each extension, then (unless the path ends in
/// `/`) path + `/index` + each extension.
pub fn resolve_to_existing(path: &str, store: &VirtualFileStore) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    if store.contains(path) {
        return Some(path.to_string());
    }
    for ext in EXTENSION_FALLBACKS {
        let candidate = format!("{path}{ext}");
        if store.contains(&candidate) {
            return Some(candidate);
        }
    }
    if !path.ends_with('/') {
        for ext in EXTENSION_FALLBACKS {
            let candidate = format!("{path}/index{ext}");
            if store.contains(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Resolve a module specifier imported from `importer`.
///
/// Relative/absolute specifiers that match nothing are [`Resolution::NotFound`];
/// bare specifiers that match nothing are [`Resolution::External`].
pub fn resolve(specifier: &str, importer: Option<&str>, store: &VirtualFileStore) -> Resolution {
    if is_path_specifier(specifier) {
        let target = resolve_relative(importer, specifier);
        let found = target
            .as_deref()
            .and_then(|target| resolve_to_existing(target, store));
        return match found {
            Some(path) => Resolution::Virtual { path },
            None => Resolution::NotFound {
                path: target.unwrap_or_else(|| specifier.to_string()),
                specifier: specifier.to_string(),
            },
        };
    }

    match resolve_to_existing(normalize_path(specifier), store) {
        Some(path) => Resolution::Virtual { path },
        None => Resolution::External {
            path: specifier.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VirtualFile;

    fn store(paths: &[&str]) -> VirtualFileStore {
        let files: Vec<VirtualFile> = paths.iter().map(|p| VirtualFile::new(*p, "")).collect();
        VirtualFileStore::from_files(&files)
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("///src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("./../a.ts"), "../a.ts");
        // Only one leading "./" is stripped.
        assert_eq!(normalize_path("././a.ts"), "./a.ts");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_dirname() {
        assert_eq!(dirname("src/components/Counter.tsx"), "src/components");
        assert_eq!(dirname("/index.tsx"), "");
        assert_eq!(dirname("index.tsx"), "");
    }

    #[test]
    fn test_resolve_relative_collapses_segments() {
        assert_eq!(
            resolve_relative(Some("src/components/Counter.tsx"), "../App.tsx").as_deref(),
            Some("src/App.tsx")
        );
        assert_eq!(
            resolve_relative(Some("src/index.tsx"), "./././App").as_deref(),
            Some("src/App")
        );
        assert_eq!(
            resolve_relative(Some("a/b/c.ts"), "../../../../x.ts").as_deref(),
            Some("x.ts")
        );
    }

    #[test]
    fn test_resolve_relative_without_importer_uses_root() {
        assert_eq!(resolve_relative(None, "./src/a.ts").as_deref(), Some("src/a.ts"));
        assert_eq!(resolve_relative(None, "/lib/b").as_deref(), Some("lib/b"));
    }

    #[test]
    fn test_resolve_relative_absolute_ignores_importer_dir() {
        assert_eq!(
            resolve_relative(Some("src/deep/x.ts"), "/util.ts").as_deref(),
            Some("util.ts")
        );
    }

    #[test]
    fn test_resolve_relative_drops_query_and_decodes() {
        assert_eq!(
            resolve_relative(Some("src/a.ts"), "./b.ts?raw#frag").as_deref(),
            Some("src/b.ts")
        );
        assert_eq!(
            resolve_relative(Some("src/a.ts"), "./my file.ts").as_deref(),
            Some("src/my file.ts")
        );
    }

    #[test]
    fn test_extension_before_index() {
        let store = store(&["a/b.ts", "a/b.ts/index.ts"]);
        assert_eq!(
            resolve("./b", Some("a/x"), &store),
            Resolution::Virtual {
                path: "a/b.ts".into()
            }
        );
    }

    #[test]
    fn test_extension_order() {
        let store = store(&["c.js", "c.ts", "c.json"]);
        assert_eq!(resolve_to_existing("c", &store).as_deref(), Some("c.ts"));
    }

    #[test]
    fn test_exact_match_wins() {
        let store = store(&["data", "data.ts"]);
        assert_eq!(resolve_to_existing("data", &store).as_deref(), Some("data"));
    }

    #[test]
    fn test_index_fallback_for_bare_specifier() {
        let store = store(&["a/index.tsx"]);
        assert_eq!(
            resolve("a", None, &store),
            Resolution::Virtual {
                path: "a/index.tsx".into()
            }
        );
    }

    #[test]
    fn test_no_index_fallback_after_trailing_slash() {
        let store = store(&["lib/index.ts"]);
        assert_eq!(resolve_to_existing("lib/", &store), None);
        assert_eq!(resolve_to_existing("lib", &store).as_deref(), Some("lib/index.ts"));
    }

    #[test]
    fn test_bare_specifier_is_external() {
        let store = store(&["src/index.tsx"]);
        assert_eq!(
            resolve("left-pad", Some("src/index.tsx"), &store),
            Resolution::External {
                path: "left-pad".into()
            }
        );
        assert!(resolve("react/jsx-runtime", None, &store).is_external());
    }

    #[test]
    fn test_bare_specifier_matches_store_path() {
        let store = store(&["src/utils/math.ts"]);
        assert_eq!(
            resolve("src/utils/math", Some("src/index.tsx"), &store),
            Resolution::Virtual {
                path: "src/utils/math.ts".into()
            }
        );
    }

    #[test]
    fn test_missing_relative_is_not_found() {
        let store = store(&["src/index.tsx"]);
        assert_eq!(
            resolve("./missing.ts", Some("src/index.tsx"), &store),
            Resolution::NotFound {
                path: "src/missing.ts".into(),
                specifier: "./missing.ts".into(),
            }
        );
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let store = store(&["src/App.tsx", "src/App/index.ts", "src/index.tsx"]);
        let first = resolve("./App", Some("src/index.tsx"), &store);
        for _ in 0..10 {
            assert_eq!(resolve("./App", Some("src/index.tsx"), &store), first);
        }
        assert_eq!(first.path(), "src/App.tsx");
    }

    #[test]
    fn test_loader_for_path() {
        assert_eq!(Loader::for_path("src/App.tsx"), Loader::Tsx);
        assert_eq!(Loader::for_path("src/util.ts"), Loader::Ts);
        assert_eq!(Loader::for_path("a.jsx"), Loader::Jsx);
        assert_eq!(Loader::for_path("a.js"), Loader::Js);
        assert_eq!(Loader::for_path("a.mjs"), Loader::Js);
        assert_eq!(Loader::for_path("data.json"), Loader::Json);
        assert_eq!(Loader::for_path("styles/app.css"), Loader::Css);
        assert_eq!(Loader::for_path("notes.txt"), Loader::Text);
    }

    #[test]
    fn test_loader_extensionless_defaults_to_tsx() {
        assert_eq!(Loader::for_path("main"), Loader::Tsx);
        // A dot in a directory name does not count.
        assert_eq!(Loader::for_path("v1.2/main"), Loader::Tsx);
    }

    #[test]
    fn test_resolution_serialization() {
        let json = serde_json::to_value(Resolution::External {
            path: "react".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "external", "path": "react"}));
    }
}
