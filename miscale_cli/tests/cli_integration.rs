use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// A config close to the defaults, with a fixed user height
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[decoder]
profile = "auto"
min_weight_kg = 5.0
max_weight_kg = 300.0

[stabilization]
horizon_ms = 3000
min_readings = 3
min_span_ms = 1500
tolerance_kg = 0.1
dedup_window_ms = 200

[session]
timeout_ms = 15000
fallback_on_timeout = true
poll_ms = 100

[user]
height_cm = 175.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["simulate"], 0, "Weighing complete.", "stdout")]
#[case(
    &["simulate", "--weight", "82.4", "--layout", "centigram", "--profile", "centigram"],
    0,
    "profile centigram",
    "stdout"
)]
#[case(&["simulate", "--no-impedance"], 0, "Composition: unavailable", "stdout")]
#[case(&["simulate", "--mirror-ms", "80", "--threaded"], 0, "Weighing complete.", "stdout")]
#[case(&["simulate", "--previous-kg", "75"], 0, "Trend: down", "stdout")]
#[case(&["simulate", "--no-settle"], 3, "Timed out", "stdout")]
#[case(&["simulate", "--height", "20"], 1, "Configuration rejected", "stderr")]
#[case(&["decode", "22b036"], 0, "mi2: 70.00 kg", "stdout")]
#[case(&["decode", "zz"], 1, "invalid hex payload", "stderr")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("miscale").unwrap();

    // Always include a valid config so the user's environment does not leak in
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_capture_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("capture.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "time,uuid,payload").unwrap();
    writeln!(f, "0,2a9c,02b036").unwrap();

    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--config").arg(&cfg).arg("replay").arg(&bad_csv);

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn cli_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[stabilization]\nmin_readings = 1\n").unwrap();

    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--config").arg(&path).arg("self-check");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("What happened"));
}

#[rstest]
fn cli_rejects_unknown_log_rotation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[logging]\nrotation = \"weekly\"\n").unwrap();

    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--config").arg(&path).arg("self-check");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("logging.rotation must be one of"));
}

#[rstest]
fn cli_rejects_unknown_profile_in_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[decoder]\nprofile = \"mi3\"\n").unwrap();

    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--config").arg(&path).arg("self-check");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("not valid TOML for this tool"));
}

#[rstest]
fn sample_capture_replays_with_sample_config() {
    let etc = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../etc");

    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--config")
        .arg(etc.join("miscale.toml"))
        .arg("--log-level")
        .arg("error")
        .arg("replay")
        .arg(etc.join("capture_sample.csv"))
        .arg("--threaded");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Weight: 72.36 kg"))
        .stdout(predicate::str::contains("Body fat:"));
}
