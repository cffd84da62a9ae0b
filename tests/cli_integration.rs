// CLI integration tests for build, recognize, name and torus flows.
use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_layerlens");
    Command::new(exe)
}

fn parse_json(value: &[u8]) -> Value {
    serde_json::from_str(std::str::from_utf8(value).expect("utf8")).expect("valid json")
}

#[test]
fn build_then_recognize_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("l72.json");

    let build = cmd()
        .args(["build", "7", "2", "--out", path.to_str().unwrap()])
        .output()
        .expect("build");
    assert!(build.status.success());
    let report = parse_json(&build.stdout);
    assert_eq!(report["lens_space"]["p"], 7);
    assert_eq!(report["lens_space"]["q"], 2);
    assert_eq!(report["skeleton"]["vertices"], 1);
    assert!(report.get("triangulation").is_none());
    assert!(report["out"].as_str().unwrap().ends_with("l72.json"));
    assert!(path.exists());

    let recognize = cmd()
        .args(["recognize", path.to_str().unwrap()])
        .output()
        .expect("recognize");
    assert!(recognize.status.success());
    let found = parse_json(&recognize.stdout);
    let lens_spaces = found["lens_spaces"].as_array().expect("lens spaces");
    assert_eq!(lens_spaces.len(), 1);
    assert_eq!(lens_spaces[0]["p"], 7);
    assert_eq!(lens_spaces[0]["q"], 2);
    assert_ne!(lens_spaces[0]["snapped"], lens_spaces[0]["twisted"]);
    assert_eq!(found["skeleton"]["closed"], true);
}

#[test]
fn build_normalizes_q_and_inlines_triangulation() {
    let build = cmd().args(["build", "5", "3"]).output().expect("build");
    assert!(build.status.success());
    let report = parse_json(&build.stdout);
    assert_eq!(report["lens_space"]["q"], 2);
    assert_eq!(report["lens_space"]["name"], "L(5,2)");
    assert_eq!(report["triangulation"]["tetrahedra"].as_array().unwrap().len(), 1);
}

#[test]
fn recognize_reads_stdin() {
    let build = cmd()
        .args(["build", "11", "3", "--out", "-"])
        .output()
        .expect("build");
    assert!(build.status.success());

    let mut child = cmd()
        .arg("recognize")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(&build.stdout)
        .expect("write");
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let found = parse_json(&output.stdout);
    assert_eq!(found["lens_spaces"][0]["p"], 11);
    assert_eq!(found["lens_spaces"][0]["q"], 3);
}

#[test]
fn name_reports_canonical_form() {
    let name = cmd().args(["name", "12", "7"]).output().expect("name");
    assert!(name.status.success());
    let value = parse_json(&name.stdout);
    assert_eq!(value["lens_space"]["q"], 5);
    assert_eq!(value["lens_space"]["name"], "L(12,5)");
    assert_eq!(value["lens_space"]["homology_h1"], "Z_12");

    let s3 = cmd().args(["name", "1", "0"]).output().expect("name");
    assert_eq!(parse_json(&s3.stdout)["lens_space"]["tex_name"], "S^3");
}

#[test]
fn torus_reports_cuts() {
    let torus = cmd().args(["torus", "3", "5"]).output().expect("torus");
    assert!(torus.status.success());
    let value = parse_json(&torus.stdout);
    assert_eq!(value["torus"]["cuts"], serde_json::json!([3, 5, 8]));
    assert_eq!(
        value["torus"]["size"],
        value["triangulation"]["tetrahedra"].as_array().unwrap().len()
    );
}

#[test]
fn usage_exit_code() {
    let build = cmd().args(["build", "6", "4"]).output().expect("build");
    assert_eq!(build.status.code().unwrap(), 2);
    let err = parse_json(&build.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
    assert!(err["error"]["hint"].is_string());

    let bad = cmd().args(["build", "seven"]).output().expect("build");
    assert_eq!(bad.status.code().unwrap(), 2);
}

#[test]
fn not_found_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("open.json");
    std::fs::write(
        &path,
        r#"{"tetrahedra":[[{"tet":0,"perm":[1,2,3,0]},{"tet":0,"perm":[3,0,1,2]},null,null]]}"#,
    )
    .expect("write");
    let recognize = cmd()
        .args(["recognize", path.to_str().unwrap()])
        .output()
        .expect("recognize");
    assert_eq!(recognize.status.code().unwrap(), 3);

    let missing = cmd()
        .args(["recognize", temp.path().join("missing.json").to_str().unwrap()])
        .output()
        .expect("recognize");
    assert_eq!(missing.status.code().unwrap(), 3);
    assert_eq!(parse_json(&missing.stderr)["error"]["kind"], "NotFound");
}

#[test]
fn corrupt_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"tetrahedra":[[{"tet":0,"perm":[1,2,3,0]},null,null,null]]}"#,
    )
    .expect("write");
    let recognize = cmd()
        .args(["recognize", path.to_str().unwrap()])
        .output()
        .expect("recognize");
    assert_eq!(recognize.status.code().unwrap(), 6);
    let err = parse_json(&recognize.stderr);
    assert_eq!(err["error"]["kind"], "Corrupt");
    assert!(err["error"]["path"].as_str().unwrap().ends_with("bad.json"));
}

#[test]
fn allocation_failed_exit_code() {
    let build = cmd()
        .args(["--max-structures", "1", "build", "5", "2"])
        .output()
        .expect("build");
    assert_eq!(build.status.code().unwrap(), 5);
    assert_eq!(parse_json(&build.stderr)["error"]["kind"], "AllocationFailed");
}

#[test]
fn oversized_build_is_an_allocation_failure() {
    let build = cmd()
        .args(["build", "1000000000000", "1"])
        .output()
        .expect("build");
    assert_eq!(build.status.code().unwrap(), 5);
    let err = parse_json(&build.stderr);
    assert_eq!(err["error"]["kind"], "AllocationFailed");
    assert!(err["error"]["hint"].as_str().unwrap().contains("--max-tetrahedra"));

    let torus = cmd()
        .args(["--max-tetrahedra", "2", "torus", "3", "5"])
        .output()
        .expect("torus");
    assert_eq!(torus.status.code().unwrap(), 5);

    let fits = cmd()
        .args(["--max-tetrahedra", "3", "torus", "3", "5"])
        .output()
        .expect("torus");
    assert!(fits.status.success());
}

#[test]
fn version_reports_json_when_piped() {
    let version = cmd().arg("version").output().expect("version");
    assert!(version.status.success());
    let value = parse_json(&version.stdout);
    assert_eq!(value["name"], "layerlens");
}
