//! End-to-end builds through the resolve/load hooks with the scanning compiler.

use esmpack_core::testing::ScanningCompiler;
use esmpack_core::{BuildError, BuildOrchestrator, VirtualFile};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn orchestrator() -> (BuildOrchestrator, Arc<ScanningCompiler>) {
    init_tracing();
    let compiler = Arc::new(ScanningCompiler::new());
    (BuildOrchestrator::new(compiler.clone()), compiler)
}

#[tokio::test]
async fn test_react_app_builds() {
    let (orchestrator, _) = orchestrator();
    let files = vec![
        VirtualFile::new(
            "src/index.tsx",
            "import { createRoot } from 'react-dom/client';\nimport App from './App.tsx';\ncreateRoot(document.getElementById('root')).render(<App />);",
        ),
        VirtualFile::new("src/App.tsx", "export default () => <h1>Hi</h1>;"),
    ];

    let bundle = orchestrator.build(&files, "src/index.tsx").await.unwrap();
    bundle.ensure_code().unwrap();
    assert!(bundle.code.contains("<h1>Hi</h1>"));
    assert!(bundle.css_chunks.is_empty());
    assert!(bundle.warnings.is_empty());
}

#[tokio::test]
async fn test_empty_file_list_never_reaches_compiler() {
    let (orchestrator, compiler) = orchestrator();
    let err = orchestrator.build(&[], "src/index.tsx").await.unwrap_err();
    assert!(matches!(err, BuildError::EntryNotFound(_)));
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_missing_relative_import_fails_with_diagnostic() {
    let (orchestrator, compiler) = orchestrator();
    let files = vec![VirtualFile::new(
        "src/index.tsx",
        "import Missing from './missing.ts';\nMissing();",
    )];

    let err = orchestrator.build(&files, "src/index.tsx").await.unwrap_err();
    let BuildError::Compile(compile) = &err else {
        panic!("expected compile failure, got {err:?}");
    };
    assert_eq!(compile.diagnostics().len(), 1);
    assert!(err
        .to_string()
        .contains("src/index.tsx:1:0: error: Could not resolve \"./missing.ts\""));
    assert_eq!(compiler.calls(), 1);
}

#[tokio::test]
async fn test_stylesheets_are_split_out() {
    let (orchestrator, _) = orchestrator();
    let files = vec![
        VirtualFile::new("index.tsx", "import './theme';\nimport './components';"),
        VirtualFile::new("theme.css", "body { margin: 0; }"),
        VirtualFile::new("components/index.jsx", "export const Button = 1;"),
    ];

    let bundle = orchestrator.build(&files, "./index.tsx").await.unwrap();
    assert_eq!(bundle.css_chunks, vec!["body { margin: 0; }\n"]);
    assert!(bundle.code.contains("// components/index.jsx"));
    assert!(!bundle.code.contains("margin"));
}

#[tokio::test]
async fn test_bare_virtual_path_wins_over_package() {
    let (orchestrator, _) = orchestrator();
    let files = vec![
        VirtualFile::new("main", "import 'utils';\nimport 'lodash';"),
        VirtualFile::new("utils/index.ts", "export const local = true;"),
    ];

    let bundle = orchestrator.build(&files, "main").await.unwrap();
    assert!(bundle.code.contains("export const local = true;"));
    assert!(bundle.code.starts_with("// main\n"));
}

#[tokio::test]
async fn test_warnings_do_not_abort() {
    init_tracing();
    let compiler = Arc::new(ScanningCompiler::new().with_warning("Unused import \"x\""));
    let orchestrator = BuildOrchestrator::new(compiler);
    let files = vec![VirtualFile::new("a.ts", "export {};")];

    let bundle = orchestrator.build(&files, "a.ts").await.unwrap();
    assert_eq!(bundle.warnings, vec!["warning: Unused import \"x\""]);
}

#[tokio::test]
async fn test_empty_entry_is_empty_bundle() {
    let (orchestrator, _) = orchestrator();
    let files = vec![VirtualFile::new("styles.css", "p {}")];
    let bundle = orchestrator.build(&files, "styles.css").await.unwrap();
    assert!(matches!(bundle.ensure_code(), Err(BuildError::EmptyBundle)));
}
