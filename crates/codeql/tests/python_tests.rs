//! Interpreter queries for the Python extractor.

mod common;

use common::{Reply, ScriptedRunner};
use qlrun_codeql::{PYTHON_IMPORT_PATH_VAR, PYTHON_VERSION_VAR, PythonSetup, python_setup};
use qlrun_core::{Error, StdoutMode};
use std::path::Path;

#[tokio::test]
async fn test_python_setup_queries_interpreter() {
    let runner = ScriptedRunner::new([
        Reply::Stdout("/usr/lib/python3/dist-packages\n".to_string()),
        Reply::Stdout("3\n".to_string()),
    ]);
    let setup = python_setup(runner.as_ref(), Path::new("/usr/bin/python3"))
        .await
        .unwrap();

    assert_eq!(
        setup,
        PythonSetup {
            version: "3".to_string(),
            import_path: "/usr/lib/python3/dist-packages".to_string(),
        }
    );
    assert_eq!(
        setup.variables(),
        [
            (PYTHON_VERSION_VAR, "3"),
            (PYTHON_IMPORT_PATH_VAR, "/usr/lib/python3/dist-packages"),
        ]
    );

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.program, Path::new("/usr/bin/python3"));
        assert_eq!(call.args[0], "-c");
        assert_eq!(call.stdout, StdoutMode::Capture);
    }
    assert!(calls[0].args[1].contains("pip.__file__"));
    assert_eq!(calls[1].args[1], "import sys; print(sys.version_info[0])");
}

#[tokio::test]
async fn test_python_setup_without_pip() {
    let runner = ScriptedRunner::new([Reply::Exit(1)]);
    let err = python_setup(runner.as_ref(), Path::new("python"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExternalProcessFailed { code: Some(1), .. }));
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn test_python_setup_empty_output() {
    let runner = ScriptedRunner::new([Reply::Stdout("/site\n".to_string()), Reply::Stdout("  \n".to_string())]);
    let err = python_setup(runner.as_ref(), Path::new("python"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OutputParse { .. }));
}
