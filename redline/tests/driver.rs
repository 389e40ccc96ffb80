use std::fs;
use std::path::PathBuf;

use object::Value;
use redline::driver::{self, SourcePath};
use redline::{DriverOptions, Error, RuntimeConfig, TranscriptSink};

fn buffered() -> RuntimeConfig {
    RuntimeConfig {
        transcript: TranscriptSink::buffer(),
        ..RuntimeConfig::default()
    }
}

#[test]
fn files_run_in_order_from_the_search_path() {
    let lib = tempfile::tempdir().unwrap();
    let app = tempfile::tempdir().unwrap();
    fs::write(
        lib.path().join("greeter.st"),
        "Object subclass: Greeter [ greet: name [ ^'Hello, ' , name ] ]",
    )
    .unwrap();
    fs::write(
        app.path().join("main.st"),
        "Transcript show: (Greeter new greet: 'Redline'); cr.\nResult := 6 * 7",
    )
    .unwrap();

    let options = DriverOptions {
        files: vec![PathBuf::from("greeter.st"), PathBuf::from("main.st")],
        search_roots: vec![lib.path().to_path_buf(), app.path().to_path_buf()],
        ..DriverOptions::default()
    };
    let runtime = driver::run_with_config(&options, buffered()).unwrap().unwrap();
    assert_eq!(runtime.transcript_output().unwrap(), "Hello, Redline\n");
    assert_eq!(runtime.global("Result"), Some(Value::Integer(42)));
}

#[test]
fn earlier_roots_win() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("pick.st"), "1").unwrap();
    fs::write(second.path().join("pick.st"), "2").unwrap();

    let path = SourcePath::new(vec![first.path().to_path_buf(), second.path().to_path_buf()]);
    let resolved = path.resolve(&PathBuf::from("pick.st")).unwrap();
    assert_eq!(resolved, first.path().join("pick.st"));
}

#[test]
fn absolute_paths_skip_the_search() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("abs.st");
    fs::write(&file, "Transcript show: 'abs'").unwrap();

    let options = DriverOptions {
        files: vec![file],
        ..DriverOptions::default()
    };
    let runtime = driver::run_with_config(&options, buffered()).unwrap().unwrap();
    assert_eq!(runtime.transcript_output().unwrap(), "abs");
}

#[test]
fn missing_files_are_reported_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("present.st"), "Transcript show: 'ran'").unwrap();

    let options = DriverOptions {
        files: vec![PathBuf::from("present.st"), PathBuf::from("absent.st")],
        search_roots: vec![dir.path().to_path_buf()],
        ..DriverOptions::default()
    };
    let err = driver::run_with_config(&options, buffered()).unwrap_err();
    assert!(matches!(err, Error::SourceNotFound { ref file } if file == &PathBuf::from("absent.st")));
}

#[test]
fn runtime_errors_carry_the_line() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.st"), "| x |\nx := 1.\nx fly").unwrap();

    let options = DriverOptions {
        files: vec![PathBuf::from("bad.st")],
        search_roots: vec![dir.path().to_path_buf()],
        ..DriverOptions::default()
    };
    let err = driver::run(&options).unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert_eq!(err.to_string(), "line 3: 1 does not understand #fly");
}

#[test]
fn no_files_means_no_runtime() {
    let options = DriverOptions::default();
    assert!(driver::run(&options).unwrap().is_none());
}
