//! Batch insights tests.
//!
//! Grades a small batch, then feeds the reports back through `insights`.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use produce_qa_test_support::ProduceImageBuilder;
use serde_json::Value;

fn produce_qa(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("produce-qa").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

/// Grades three photos and returns the raw stdout.
fn graded_batch(home: &Path, format: &str) -> Vec<u8> {
    let photos = home.join("photos");
    std::fs::create_dir_all(&photos).unwrap();
    ProduceImageBuilder::save(&ProduceImageBuilder::red_apple(200), &photos, "a.png").unwrap();
    ProduceImageBuilder::save(&ProduceImageBuilder::bruised_apple(200, 3), &photos, "b.png")
        .unwrap();
    ProduceImageBuilder::save(&ProduceImageBuilder::bruised_apple(200, 7), &photos, "c.png")
        .unwrap();

    let output = produce_qa(home)
        .args(["--no-detector", "--format", format])
        .arg(&photos)
        .output()
        .unwrap();
    assert!(output.status.success());
    output.stdout
}

#[test]
fn test_insights_from_stdin() {
    let home = tempfile::tempdir().unwrap();
    let reports = graded_batch(home.path(), "jsonl");

    let output = produce_qa(home.path())
        .arg("insights")
        .write_stdin(reports)
        .output()
        .unwrap();
    assert!(output.status.success());

    let insights: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(insights["summary"]["total_images"], 3);
    let distribution = &insights["grade_distribution"];
    let total: u64 = ["A", "B", "C", "D"]
        .iter()
        .map(|g| distribution[*g].as_u64().unwrap())
        .sum();
    assert_eq!(total, 3);
    let defects = insights["common_defects"].as_array().unwrap();
    let spots = defects.iter().find(|d| d["type"] == "dark_spots").unwrap();
    assert!(spots["count"].as_u64().unwrap() >= 2);
}

#[test]
fn test_insights_from_json_array_file() {
    let home = tempfile::tempdir().unwrap();
    let reports = graded_batch(home.path(), "json");
    let file = home.path().join("reports.json");
    std::fs::write(&file, reports).unwrap();

    produce_qa(home.path())
        .args(["insights", "--pretty"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_images\": 3"));
}

#[test]
fn test_insights_on_empty_input_fails() {
    let home = tempfile::tempdir().unwrap();

    produce_qa(home.path())
        .arg("insights")
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No reports to summarize"));
}

#[test]
fn test_insights_rejects_malformed_line() {
    let home = tempfile::tempdir().unwrap();

    produce_qa(home.path())
        .arg("insights")
        .write_stdin("{\"product_id\": 1}\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid report on line 1"));
}

#[test]
fn test_insights_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();

    produce_qa(home.path())
        .arg("insights")
        .arg(home.path().join("missing.jsonl"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read"));
}
