use std::path::Path;
use std::process::{Command, Output};

const ONE_BY_TWO: &str = r#"[["0,0", "0,1"]]"#;

fn kbplacer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kbplacer"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run kbplacer")
}

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write fixture");
    path.to_string_lossy().into_owned()
}

#[test]
fn exit_code_usage_is_1_for_missing_args() {
    assert_eq!(kbplacer(&[]).status.code(), Some(1));
}

#[test]
fn exit_code_usage_is_1_for_bad_descriptor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = write(dir.path(), "layout.json", ONE_BY_TWO);
    let out = kbplacer(&["--layout", &layout, "--diode", "D CUSTOM"]);
    assert_eq!(out.status.code(), Some(1));

    let out = kbplacer(&["--layout", &layout, "--key-distance", "19 x"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn exit_code_input_is_2_for_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.json");
    let out = kbplacer(&["--layout", missing.to_string_lossy().as_ref()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Could not read layout"));
}

#[test]
fn exit_code_input_is_2_for_invalid_yaml() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bad = write(dir.path(), "bad.yaml", "a: [1, 2,");
    assert_eq!(kbplacer(&["--layout", &bad]).status.code(), Some(2));
}

#[test]
fn exit_code_input_is_2_for_missing_matrix_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = write(dir.path(), "layout.json", r#"[["0,0", "A"]]"#);
    let out = kbplacer(&["--layout", &layout]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());

    let out = kbplacer(&["--layout", &layout, "--sequential"]);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn exit_code_processing_is_3_without_switches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = write(dir.path(), "layout.json", ONE_BY_TWO);
    let footprints = write(dir.path(), "footprints.yaml", "{}");
    let out = kbplacer(&["--layout", &layout, "--footprints", &footprints]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn exit_codes_for_unusable_numbers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nan = write(dir.path(), "nan.json", r#"[[{"x": "nan"}, "0,0", "0,1"]]"#);
    assert_eq!(kbplacer(&["--layout", &nan]).status.code(), Some(2));

    let far = write(dir.path(), "far.json", r#"[["0,0", {"x": 1e13}, "0,1"]]"#);
    let out = kbplacer(&["--layout", &far, "--route"]);
    assert_eq!(out.status.code(), Some(3), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("SW2"));
}

#[test]
fn exit_code_success_is_0_and_report_is_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = write(dir.path(), "layout.json", ONE_BY_TWO);
    let out = kbplacer(&["--layout", &layout, "--route"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["placements"].as_array().map(Vec::len), Some(6));
    assert_eq!(report["connections"].as_array().map(Vec::len), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("run finished"));
}

#[test]
fn config_file_and_output_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = write(dir.path(), "layout.json", ONE_BY_TWO);
    let config = write(
        dir.path(),
        "config.yaml",
        "key_distance: [18, 17]\nadditional_elements: []\n",
    );
    let output = dir.path().join("report.json");
    let out = kbplacer(&[
        "--layout",
        &layout,
        "--config",
        &config,
        "--output",
        output.to_string_lossy().as_ref(),
    ]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());

    let text = std::fs::read_to_string(&output).expect("report written");
    let report: serde_json::Value = serde_json::from_str(&text).expect("json report");
    let placements = report["placements"].as_array().expect("placements");
    assert_eq!(placements.len(), 4);
    assert_eq!(placements[0]["position"]["x"], 9_000_000);
    assert_eq!(placements[0]["position"]["y"], 8_500_000);
}
