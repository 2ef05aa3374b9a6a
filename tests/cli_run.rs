mod common;

use assert_cmd::Command;
use common::{REQUIRED_ENV, png_header, read_json, write_file, write_json};
use predicates::prelude::*;
use serde_json::json;
use std::path::Path;

fn run_cmd(root: &Path, with_env: bool) -> Command {
    let mut cmd = Command::cargo_bin("geodetect").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--no-color")
        .arg("--config")
        .arg(root.join("absent.toml"))
        .arg("run")
        .arg("--root")
        .arg(root);
    for key in REQUIRED_ENV {
        if with_env {
            cmd.env(key, "test-value");
        } else {
            cmd.env_remove(key);
        }
    }
    cmd
}

#[test]
fn missing_env_exits_with_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    run_cmd(dir.path(), false)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("ROBOFLOW_API_KEY"));

    let out = dir.path().join("data/latest");
    assert_eq!(
        read_json(&out.join("detections.geojson")),
        json!({"type": "FeatureCollection", "features": []})
    );
    assert_eq!(read_json(&out.join("meta.json"))["status"], json!("missing_env"));
}

#[test]
fn missing_image_reports_no_input_image() {
    let dir = tempfile::tempdir().unwrap();
    run_cmd(dir.path(), true)
        .assert()
        .success()
        .stderr(predicate::str::contains("status: no_input_image"));
}

#[test]
fn fallback_run_writes_summary_marker() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "inputs/test.png", png_header(640, 640));
    write_json(
        dir.path(),
        "data/latest/inference_result.json",
        &json!([{"model_predictions": {"predictions": []}, "Cattle_Group": 12}]),
    );
    write_json(
        dir.path(),
        "data/latest/ingest_meta.json",
        &json!({
            "status": "ok",
            "bbox_wgs84": [30.0, 6.0, 31.0, 7.0],
            "image_px": {"width": 640, "height": 640}
        }),
    );

    run_cmd(dir.path(), true)
        .assert()
        .success()
        .stderr(predicate::str::contains("status: ok"));

    let out = dir.path().join("data/latest");
    let fc = read_json(&out.join("detections.geojson"));
    assert_eq!(fc["features"][0]["geometry"]["coordinates"], json!([30.5, 6.5]));
    assert_eq!(fc["features"][0]["properties"]["Cattle_Group"], json!(12));

    let meta = read_json(&out.join("meta.json"));
    assert_eq!(meta["status"], json!("ok"));
    assert_eq!(meta["fallback"], json!(true));
    assert_eq!(meta["input_image"], json!("inputs/test.png"));
}

#[test]
fn missing_inference_result_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "inputs/test.jpg", png_header(8, 8));
    run_cmd(dir.path(), true)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("inference_result.json"));

    let meta = read_json(&dir.path().join("data/latest/meta.json"));
    assert_eq!(meta["status"], json!("error"));
}

#[test]
fn config_file_changes_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "geodetect.toml",
        r#"
[paths]
input_dir = "imgs"
output_dir = "out"
image_names = ["scene.png"]
tile_meta = "out/tile.json"
inference_result = "out/result.json"

[inference]
required_env = []
"#,
    );
    write_file(dir.path(), "imgs/scene.png", png_header(100, 100));
    write_json(dir.path(), "out/result.json", &json!({"predictions": [{"x": 50, "y": 50}]}));
    write_json(
        dir.path(),
        "out/tile.json",
        &json!({"bbox_wgs84": {"west": 0, "south": 0, "east": 1, "north": 1}}),
    );

    let mut cmd = Command::cargo_bin("geodetect").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .args(["run", "--root"])
        .arg(dir.path())
        .assert()
        .success();

    let fc = read_json(&dir.path().join("out/detections.geojson"));
    assert_eq!(fc["features"][0]["geometry"]["coordinates"], json!([0.5, 0.5]));
}
