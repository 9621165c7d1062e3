use assert_cmd::prelude::*;
use rstest::rstest;
use std::process::Command;

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(key))
        .unwrap_or("")
        .to_string();
    assert!(
        !line.is_empty(),
        "no JSON line with {key} found; stdout was: {stdout}"
    );
    serde_json::from_str(&line).expect("valid JSON")
}

/// Validate the JSON schema for a stabilized weighing.
#[rstest]
fn json_stabilized_schema() {
    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("simulate")
        .arg("--height")
        .arg("175")
        .arg("--previous-kg")
        .arg("70");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");

    assert_eq!(v["outcome"], "stabilized");
    assert_eq!(v["profile"], "mi2");
    assert!(v.get("duration_ms").and_then(|x| x.as_u64()).is_some());
    assert!(v.get("frames").and_then(|x| x.as_u64()).is_some_and(|n| n > 0));

    let m = &v["measurement"];
    assert!(m["weight_kg"].as_f64().is_some_and(|w| (w - 70.0).abs() < 0.05));
    assert!(m["bmi"].as_f64().is_some());
    assert_eq!(m["bmi_category"], "normal");
    assert_eq!(m["quality"], "stabilized");
    assert_eq!(m["impedance_ohms"], 500);
    assert!(m["measured_at"].as_str().is_some());
    assert!(m["sample_count"].as_u64().is_some_and(|n| n >= 3));
    assert_eq!(m["trend"], "steady");

    let c = &m["composition"];
    for key in [
        "body_fat_pct",
        "muscle_mass_kg",
        "body_water_pct",
        "basal_metabolism_kcal",
    ] {
        assert!(c[key].as_f64().is_some(), "{key} should be a number");
    }
}

/// Composition is null, never fabricated, when the scale reports no impedance.
#[rstest]
fn json_composition_null_without_impedance() {
    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--json").arg("simulate").arg("--no-impedance");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");
    assert!(v["measurement"]["composition"].is_null());
    assert!(v["measurement"]["impedance_ohms"].is_null());
    assert!(v["measurement"]["trend"].is_null());
}

/// A session that never settles times out with a single-sample fallback.
#[rstest]
fn json_timed_out_schema() {
    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--json").arg("simulate").arg("--no-settle");

    let out = cmd.assert().code(3).get_output().stdout.clone();
    let v = json_line(&out, "\"outcome\"");
    assert_eq!(v["outcome"], "timed_out");
    assert_eq!(v["measurement"]["quality"], "single_sample");
    assert_eq!(v["measurement"]["sample_count"], 1);
}

/// Errors are one JSON object on stdout in --json mode.
#[rstest]
fn json_error_schema() {
    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--json").arg("simulate").arg("--height").arg("400");

    let out = cmd.assert().code(1).get_output().stdout.clone();
    let v = json_line(&out, "\"reason\"");
    assert_eq!(v["outcome"], "error");
    assert_eq!(v["reason"], "InvalidConfig");
    assert!(v["message"].as_str().is_some_and(|m| m.contains("height_cm")));
}

#[rstest]
fn json_decode_schema() {
    let mut cmd = Command::cargo_bin("miscale").unwrap();
    cmd.arg("--json")
        .arg("decode")
        .arg("a2 b0 36 00 00 00 00 00 00 f4 01 00 00");

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"profiles\"");
    assert_eq!(v["len"], 13);
    assert_eq!(v["flags"]["stabilized"], true);
    assert_eq!(v["flags"]["weight_removed"], true);
    let mi2 = &v["profiles"][0];
    assert_eq!(mi2["profile"], "mi2");
    assert_eq!(mi2["candidate"]["impedance_ohms"], 500);
    assert_eq!(mi2["candidate"]["is_weight_removed"], true);
    assert_eq!(mi2["candidate"]["channel"], "standard");
}
