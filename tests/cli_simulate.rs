use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_breathsync"))
}

#[test]
fn simulate_prints_report_and_summary() {
    let output = cli()
        .args(["simulate", "--rounds", "2"])
        .output()
        .expect("failed to run breathsync simulate");
    assert!(
        output.status.success(),
        "CLI exited with {:?}: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("simulation JSON payload");
    assert_eq!(json["summary"]["rounds_completed"], 2);
    assert_eq!(json["summary"]["total_breaths"], 2);
    assert_eq!(json["summary"]["stopped_early"], false);
    assert!(json["report"]["profile"]["silence"]["envelope"].as_f64().unwrap_or_default() > 0.0);
    assert!(json["report"]["hint"].is_string());
}

#[test]
fn simulate_rejects_invalid_config() {
    let path = std::env::temp_dir().join("breathsync_invalid_config.json");
    std::fs::write(
        &path,
        r#"{"weights": {"envelope": 0.9, "envelope_slope": 0.9,
            "spectral_centroid": 0.0, "zero_crossing_rate": 0.0}}"#,
    )
    .unwrap();

    let output = cli()
        .args(["simulate", "--config", path.to_str().unwrap()])
        .output()
        .expect("failed to run breathsync simulate");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("3001") || stderr.contains("weights"), "stderr: {stderr}");
}

#[test]
fn wav_source_requires_path() {
    let output = cli()
        .args(["calibrate", "--source", "wav", "--fast"])
        .output()
        .expect("failed to run breathsync calibrate");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("--wav"), "stderr: {stderr}");
}
