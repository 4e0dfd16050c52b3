use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

// Fast sim config with the store inside the temp dir
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let store = dir.path().join("store.toml");
    let toml = format!(
        r#"
[node]
cadence_ms = 2

[storage]
path = {store:?}

[sim]
base_load = 5.0
noise = 0.0

{extra}
"#
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn loadnode(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("loadnode").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--cycles", "3"], 0, ",5.0000>", "stdout")]
#[case(&["two-point", "--zero", "0", "--loaded", "200", "--known", "100", "--current-factor", "1"], 0, "send:   s2\n", "stdout")]
#[case(&["two-point", "--zero", "-1.5", "--loaded", "-1.5", "--known", "1", "--current-factor", "1"], 1, "degenerate", "stderr")]
#[case(&["fit"], 2, "required", "stderr")]
#[case(&["run", "--link", "serial"], 2, "invalid value", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let mut cmd = loadnode(&cfg);
    cmd.args(args).write_stdin("");

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn run_emits_one_frame_per_cycle() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = loadnode(&cfg)
        .args(["run", "--cycles", "20"])
        .write_stdin("")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let frames: Vec<&str> = stdout.lines().collect();
    assert_eq!(frames.len(), 20);
    assert!(frames.iter().all(|l| l.starts_with("<1,") && l.ends_with('>')));
    assert!(frames[0].starts_with("<1,0.0"), "{}", frames[0]);
    assert!(frames[0].ends_with(",5.0000>"), "{}", frames[0]);
}

#[test]
fn query_and_set_scale_over_stdin() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = loadnode(&cfg)
        .args(["run", "--cycles", "60"])
        .write_stdin("g\ns2.5\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("<2,1.00000>"), "{stdout}");

    // persisted, and picked up again on the next start
    let store = fs::read_to_string(dir.path().join("store.toml")).unwrap();
    assert!(store.contains("[HX711]"), "{store}");
    assert!(store.contains("conversionFactor = 2.5"), "{store}");

    let out = loadnode(&cfg)
        .args(["run", "--cycles", "30"])
        .write_stdin("g\n")
        .output()
        .unwrap();
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("<2,2.50000>"), "{stdout}");
}

#[test]
fn sensor_stall_exits_with_timeout_code() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let text = fs::read_to_string(&cfg).unwrap().replace("noise = 0.0", "noise = 0.0\nstall_after_reads = 2");
    fs::write(&cfg, text).unwrap();

    loadnode(&cfg)
        .args(["run", "--cycles", "10"])
        .write_stdin("")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("<1,").count(2))
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn sensor_stall_reports_json_when_requested() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let text = fs::read_to_string(&cfg).unwrap().replace("noise = 0.0", "noise = 0.0\nstall_after_reads = 0");
    fs::write(&cfg, text).unwrap();

    let out = loadnode(&cfg)
        .args(["--json", "run", "--cycles", "5"])
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "SensorTimeout");
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[filter]\nalpha = 0.0\n");
    loadnode(&cfg)
        .args(["run", "--cycles", "1"])
        .write_stdin("")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("filter.alpha"));
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("loadnode")
        .unwrap()
        .current_dir(dir.path())
        .args(["--config", "nope.toml", "two-point"])
        .args(["--zero", "0", "--loaded", "10", "--known", "5", "--current-factor", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("factor: 6\n"));
}

#[test]
fn corrupt_store_is_reported_as_storage_fault() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    fs::write(dir.path().join("store.toml"), "[HX711\nconversionFactor = ").unwrap();

    let out = loadnode(&cfg)
        .args(["--json", "run", "--cycles", "3"])
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8(out.stderr).unwrap();
    let v: serde_json::Value = serde_json::from_str(stderr.lines().last().unwrap()).unwrap();
    assert_eq!(v["reason"], "StorageFault");
}
