mod common;

use assert_cmd::Command;
use common::{parse_json, png_header, read_json, write_file, write_json};
use insta::assert_json_snapshot;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::Path;

fn geocode(root: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("geodetect").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(root.join("absent.toml"))
        .arg("geocode")
        .arg("--result")
        .arg(root.join("result.json"))
        .args(extra);
    cmd.assert()
}

fn tile_meta(root: &Path) -> String {
    write_json(
        root,
        "ingest_meta.json",
        &json!({"bbox_wgs84": {"west": 30, "south": 6, "east": 31, "north": 7}}),
    )
    .display()
    .to_string()
}

fn stdout_json(assert: assert_cmd::assert::Assert) -> Value {
    parse_json(&assert.success().get_output().stdout)
}

#[test]
fn scenario_single_cow() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "result.json",
        &json!({"predictions": [{"x": 100, "y": 50, "confidence": 0.9, "class": "cow"}]}),
    );
    let tile = tile_meta(dir.path());

    let json = stdout_json(geocode(
        dir.path(),
        &["--tile-meta", &tile, "--width", "640", "--height", "640"],
    ));
    assert_json_snapshot!(json, @r#"
    {
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": {
            "conf": 0.9,
            "class": "cow",
            "source": "detection",
            "rule": "explicit_xy"
          },
          "geometry": {
            "type": "Point",
            "coordinates": [
              30.15625,
              6.921875
            ]
          }
        }
      ]
    }
    "#);
}

#[test]
fn scenario_empty_predictions_with_group_count() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "result.json",
        &json!([{"predictions": [], "Cattle_Group": 12}]),
    );
    let tile = tile_meta(dir.path());

    let json = stdout_json(geocode(
        dir.path(),
        &["--tile-meta", &tile, "--width", "640", "--height", "640"],
    ));
    let features = json["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0]["geometry"]["coordinates"], json!([30.5, 6.5]));
    assert_eq!(features[0]["properties"]["Cattle_Group"], json!(12));
    assert_eq!(features[0]["properties"]["fallback"], json!(true));
}

#[test]
fn scenario_without_tile_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        dir.path(),
        "result.json",
        &json!({"predictions": [{"x": 100, "y": 50}]}),
    );

    let json = stdout_json(geocode(dir.path(), &["--width", "640", "--height", "640"]));
    assert_eq!(json, json!({"type": "FeatureCollection", "features": []}));

    let meta = stdout_json(geocode(
        dir.path(),
        &["--width", "640", "--height", "640", "--meta"],
    ));
    assert_eq!(meta["status"], json!("needs_georeference"));
    assert_eq!(meta["features_written"], json!(0));
}

#[test]
fn malformed_tile_metadata_degrades() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "result.json", &json!({"predictions": [{"x": 1, "y": 1}]}));
    let bad = write_file(dir.path(), "bad_meta.json", "{not json");

    let meta = stdout_json(geocode(
        dir.path(),
        &[
            "--tile-meta",
            bad.to_str().unwrap(),
            "--width",
            "10",
            "--height",
            "10",
            "--meta",
        ],
    ));
    assert_eq!(meta["status"], json!("needs_georeference"));
}

#[test]
fn dimensions_come_from_image_header() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "result.json", &json!({"detections": [{"x": 64, "y": 0}]}));
    let tile = tile_meta(dir.path());
    let image = write_file(dir.path(), "test.png", png_header(128, 64));

    let json = stdout_json(geocode(
        dir.path(),
        &["--tile-meta", &tile, "--image", image.to_str().unwrap()],
    ));
    assert_eq!(
        json["features"][0]["geometry"]["coordinates"],
        json!([30.5, 7.0])
    );
}

#[test]
fn zero_dimensions_fall_back_to_image_header() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "result.json", &json!({"detections": [{"x": 64, "y": 0}]}));
    let tile = tile_meta(dir.path());
    let image = write_file(dir.path(), "test.png", png_header(128, 64));

    let json = stdout_json(geocode(
        dir.path(),
        &[
            "--tile-meta",
            &tile,
            "--width",
            "0",
            "--height",
            "640",
            "--image",
            image.to_str().unwrap(),
        ],
    ));
    assert_eq!(
        json["features"][0]["geometry"]["coordinates"],
        json!([30.5, 7.0])
    );
}

#[test]
fn writes_to_out_file() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "result.json", &json!({"objects": []}));
    let tile = tile_meta(dir.path());
    let out = dir.path().join("detections.geojson");

    geocode(
        dir.path(),
        &[
            "--tile-meta",
            &tile,
            "--width",
            "640",
            "--height",
            "640",
            "--no-color",
            "--out",
            out.to_str().unwrap(),
        ],
    )
    .success()
    .stderr(predicate::str::contains("status: ok"));

    assert_eq!(
        read_json(&out),
        json!({"type": "FeatureCollection", "features": []})
    );
}

#[test]
fn unreadable_result_fails() {
    let dir = tempfile::tempdir().unwrap();
    geocode(dir.path(), &[])
        .failure()
        .code(1)
        .stderr(predicate::str::contains("result.json"));
}

#[test]
fn width_requires_height() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "result.json", &json!({}));
    geocode(dir.path(), &["--width", "640"]).failure();
}

#[test]
fn schema_command_prints_json_schema() {
    let mut cmd = Command::cargo_bin("geodetect").unwrap();
    let output = cmd.arg("schema").assert().success().get_output().stdout.clone();
    let schema = parse_json(&output);
    assert_eq!(schema["title"], json!("FeatureCollection"));
}
