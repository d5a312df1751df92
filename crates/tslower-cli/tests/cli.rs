//! Integration tests for the `tslower` binary.

use std::path::Path;
use std::process::{Command, Output};

fn tslower(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tslower"))
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run tslower")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_transform_prints_javascript() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ts"), "let x: number = f<string>(1);\n").unwrap();

    let output = tslower(dir.path(), &["a.ts"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout(&output), "let x = f(1);\n");
}

#[test]
fn test_config_file_and_flag_override() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ts"), "let x = 1;\nlet y = 2;\n").unwrap();
    std::fs::write(dir.path().join("tslower.json"), r#"{"codegen": {"minify": true}}"#).unwrap();

    let output = tslower(dir.path(), &["a.ts"]);
    assert_eq!(stdout(&output), "let x=1;let y=2");

    // --config replaces the default file; --minify still applies on top
    std::fs::write(dir.path().join("other.json"), r#"{"codegen": {"indent": "\t"}}"#).unwrap();
    let output = tslower(dir.path(), &["--config", "other.json", "--minify", "a.ts"]);
    assert_eq!(stdout(&output), "let x=1;let y=2");
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ts"), "1;").unwrap();
    let output = tslower(dir.path(), &["--config", "nope.json", "a.ts"]);
    assert!(!output.status.success());
}

#[test]
fn test_errors_exit_nonzero_with_location() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.ts"), "let foo;\nnamespace foo { 0 }\n").unwrap();

    let output = tslower(dir.path(), &["bad.ts"]);
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.ts:2:") && stderr.contains("error: The symbol \"foo\" has already been declared"), "{stderr}");
    assert!(stderr.contains("note:"), "{stderr}");
}

#[test]
fn test_json_report() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.ts"), "enum E { A }").unwrap();
    std::fs::write(dir.path().join("data.json"), r#"{"a": 1, "a": 2}"#).unwrap();

    let output = tslower(dir.path(), &["--json", "a.ts", "data.json"]);
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("stdout should be valid JSON");
    let files = report.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0]["code"].as_str().unwrap().contains("var E;"));
    assert!(files[1].get("code").is_none());
    let diagnostics = files[1]["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["severity"], "warning");
}

#[test]
fn test_out_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mod.ts"), "export const x: number = 1;").unwrap();

    let output = tslower(dir.path(), &["--out-dir", "dist", "mod.ts"]);
    assert!(output.status.success(), "{output:?}");
    assert!(stdout(&output).is_empty());
    let written = std::fs::read_to_string(dir.path().join("dist/mod.js")).unwrap();
    assert_eq!(written, "export const x = 1;\n");
}

#[test]
fn test_source_map_warnings_do_not_fail() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("app.js.map"),
        r#"{"version": 3, "sources": ["a.ts"], "mappings": "AA!A"}"#,
    )
    .unwrap();

    let output = tslower(dir.path(), &["app.js.map"]);
    assert!(output.status.success(), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Bad \"mappings\" data"), "{stderr}");
}
