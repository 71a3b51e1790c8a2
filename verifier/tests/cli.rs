//! CLI tests for the `verifier` binary.
//!
//! Spawns the binary and checks stdout JSON and exit codes.

use std::fs;
use std::process::Command;

use serde_json::Value;
use verifier::exit_codes;

fn verifier_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_verifier"));
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn classify_reports_memory_error_from_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log = temp.path().join("out.log");
    fs::write(&log, "tests running...\n").expect("write log");

    let output = verifier_cmd(temp.path())
        .args(["classify", "--classifier", "memory", "--exit-code", "137"])
        .arg(&log)
        .output()
        .expect("verifier classify");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let verdicts: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(verdicts[0]["classifier"], "memory");
    assert_eq!(verdicts[0]["verdict"]["kind"], "memory");
    assert_eq!(verdicts[0]["verdict"]["error_type"], "SYSTEM_OOM");
}

#[test]
fn lint_separates_critical_and_deferred_rules() {
    let temp = tempfile::tempdir().expect("tempdir");
    let report = temp.path().join("lint.json");
    fs::write(
        &report,
        r#"{"errorCount":3,"warningCount":0,"byRule":{"no-unused-vars":1,"@typescript-eslint/no-explicit-any":2},"topFiles":[]}"#,
    )
    .expect("write report");

    let output = verifier_cmd(temp.path())
        .arg("lint")
        .arg(&report)
        .output()
        .expect("verifier lint");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let status: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(status["has_errors"], true);
    assert_eq!(status["acceptable"], false);
    assert_eq!(status["critical"][0], "no-unused-vars: 1 error(s)");
    assert_eq!(
        status["deferred"][0],
        "@typescript-eslint/no-explicit-any: 2 error(s)"
    );
}

#[test]
fn lint_strips_working_directory_without_cwd_flag() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().canonicalize().expect("canonical temp");
    let report = root.join("lint.json");
    let file_path = root.join("src").join("a.ts");
    let payload = serde_json::json!({
        "errorCount": 1,
        "fullResults": [{
            "filePath": file_path.display().to_string(),
            "messages": [{"ruleId": "eqeqeq", "severity": 2, "message": "m", "line": 1, "column": 2}]
        }]
    });
    fs::write(&report, payload.to_string()).expect("write report");

    let output = verifier_cmd(&root)
        .arg("lint")
        .arg(&report)
        .output()
        .expect("verifier lint");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let status: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(status["critical"][0], "eqeqeq: src/a.ts:1:2 - m");
}

#[test]
fn refused_suite_gate_spawns_nothing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let upstream = temp.path().join("upstream.json");
    fs::write(&upstream, r#"{"success": true, "hasMemoryError": true}"#).expect("write upstream");
    // A runner that would leave a marker file if it were ever invoked.
    fs::write(
        temp.path().join("verifier.toml"),
        "script_runner = \"touch\"\ntest_script = \"spawned\"\n",
    )
    .expect("write config");

    let output = verifier_cmd(temp.path())
        .args(["suite", "--upstream"])
        .arg(&upstream)
        .output()
        .expect("verifier suite");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let outcome: Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(outcome["completed"], false);
    assert!(
        outcome["message"]
            .as_str()
            .is_some_and(|m| m.contains("hasMemoryError=true"))
    );
    assert!(!temp.path().join("run").exists());
    assert!(!temp.path().join("spawned").exists());
}

#[test]
fn invalid_config_exits_with_invalid_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("verifier.toml"), "kill_grace_ms = 0\n").expect("write config");

    let output = verifier_cmd(temp.path())
        .arg("typecheck")
        .output()
        .expect("verifier typecheck");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kill_grace_ms"));
}
