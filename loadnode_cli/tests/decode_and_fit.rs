use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn loadnode() -> Command {
    let dir = std::env::temp_dir();
    let mut cmd = Command::cargo_bin("loadnode").unwrap();
    cmd.arg("--config")
        .arg(dir.join("loadnode-tests-no-such-config.toml"))
        .arg("--log-level")
        .arg("warn");
    cmd
}

#[test]
fn decode_prints_frames_and_skips_garbage() {
    loadnode()
        .arg("decode")
        .write_stdin("<1,0.012,5.0000>\r\nnot a frame\n<2,2.50000>\n<3,1>\n")
        .assert()
        .success()
        .stdout("telemetry t=0.012s force=5.0000\nscale factor=2.50000\n")
        .stderr(predicate::str::contains("skipping malformed frame"));
}

#[test]
fn decode_survives_line_noise_before_frames() {
    let mut input = b"\xff\xfe\x00 noise\n".to_vec();
    input.extend_from_slice(b"<1,0.012,5.0000>\n");
    loadnode()
        .arg("decode")
        .write_stdin(input)
        .assert()
        .success()
        .stdout("telemetry t=0.012s force=5.0000\n")
        .stderr(predicate::str::contains("not UTF-8"));
}

#[test]
fn decode_json_lines_follow_schema() {
    let out = loadnode()
        .args(["--json", "decode"])
        .write_stdin("<1,0.024,-1.2500>\n<2,0.50000>\n")
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["kind"], "telemetry");
    assert_eq!(rows[0]["force"], -1.25);
    assert_eq!(rows[1]["kind"], "scale");
    assert_eq!(rows[1]["factor"], 0.5);
}

#[test]
fn fit_prints_factor_and_command() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("ref.csv");
    // readings are half the true load under factor 4 -> new factor 2
    fs::write(&csv, "reading,load\n0.0,0.0\n25.0,50.0\n50.0,100.0\n").unwrap();
    loadnode()
        .args(["fit", "--csv"])
        .arg(&csv)
        .args(["--current-factor", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("factor: 2\n"))
        .stdout(predicate::str::contains("send:   s2\n"));
}

#[test]
fn fit_json_output() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("ref.csv");
    fs::write(&csv, "reading,load\n0.0,0.0\n10.0,10.0\n").unwrap();
    let out = loadnode()
        .args(["--json", "fit", "--csv"])
        .arg(&csv)
        .args(["--current-factor", "1.5"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["command"], "s1.5");
    assert_eq!(v["points"], 2);
}

#[test]
fn fit_rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("ref.csv");
    fs::write(&csv, "raw,grams\n1,2\n3,4\n").unwrap();
    loadnode()
        .args(["fit", "--csv"])
        .arg(&csv)
        .args(["--current-factor", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Expected 'reading,load'"));
}

#[test]
fn two_point_command_keeps_small_factors() {
    let out = loadnode()
        .args(["--json", "two-point", "--zero", "0", "--loaded", "0.0004"])
        .args(["--known", "100", "--current-factor", "1"])
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let cmd = v["command"].as_str().unwrap();
    let sent: f32 = cmd[1..].parse().unwrap();
    assert!(sent > 0.0, "{cmd}");
    assert_eq!(sent, v["factor"].as_f64().unwrap() as f32);
}
