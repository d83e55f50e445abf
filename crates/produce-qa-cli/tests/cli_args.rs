//! CLI argument validation tests.
//!
//! Tests command-line argument parsing, validation, and error handling.

#![allow(clippy::unwrap_used)]
#![allow(deprecated)] // cargo_bin deprecation

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use produce_qa_test_support::ProduceImageBuilder;

/// Command isolated from the user's config and model directories.
fn produce_qa(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("produce-qa").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"));
    cmd
}

fn apple(dir: &Path) -> PathBuf {
    ProduceImageBuilder::save(&ProduceImageBuilder::red_apple(160), dir, "apple.png").unwrap()
}

// === Missing/Invalid Path Tests ===

#[test]
fn test_missing_path_shows_error() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No paths specified"));
}

#[test]
fn test_nonexistent_path_warns_but_continues() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("/nonexistent/path/to/image.jpg")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_empty_directory() {
    let home = tempfile::tempdir().unwrap();
    let photos = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg(photos.path())
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty());
}

// === Format Validation Tests ===

#[test]
fn test_invalid_format_rejected() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--format")
        .arg("xml")
        .arg(apple(home.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("json").or(predicate::str::contains("jsonl")));
}

#[test]
fn test_valid_formats_accepted() {
    let home = tempfile::tempdir().unwrap();
    let image = apple(home.path());
    for format in ["json", "jsonl"] {
        produce_qa(home.path())
            .arg("--format")
            .arg(format)
            .arg(&image)
            .assert()
            .code(0);
    }
}

// === Threshold Validation Tests ===

#[test]
fn test_grade_threshold_out_of_range() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--grade-a")
        .arg("150")
        .arg(apple(home.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("150 is not in 0..=100"));
}

#[test]
fn test_confidence_threshold_out_of_range() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--confidence-threshold")
        .arg("1.5")
        .arg(apple(home.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("1.5 is not in 0.0..=1.0"));
}

#[test]
fn test_inconsistent_thresholds_rejected() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--grade-a")
        .arg("40")
        .arg(apple(home.path()))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid scoring policy"));
}

#[test]
fn test_invalid_min_grade_rejected() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--min-grade")
        .arg("E")
        .arg(apple(home.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a grade"));
}

#[test]
fn test_non_numeric_threshold_rejected() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--grade-b")
        .arg("good")
        .arg(apple(home.path()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("'good' is not a valid number"));
}

// === Subcommands ===

#[test]
fn test_help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("grade")
                .and(predicate::str::contains("insights"))
                .and(predicate::str::contains("standards"))
                .and(predicate::str::contains("models")),
        );
}

#[test]
fn test_explicit_grade_subcommand() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("grade")
        .arg(apple(home.path()))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("\"product_id\":\"apple\""));
}

#[test]
fn test_models_path_honours_override() {
    let home = tempfile::tempdir().unwrap();
    let models = home.path().join("weights");
    produce_qa(home.path())
        .arg("models")
        .arg("path")
        .arg("--models-dir")
        .arg(&models)
        .assert()
        .success()
        .stdout(predicate::str::contains(models.to_string_lossy().as_ref()));
}

#[test]
fn test_models_list_reports_missing() {
    let home = tempfile::tempdir().unwrap();
    produce_qa(home.path())
        .arg("models")
        .arg("list")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("produce-ssd")
                .and(predicate::str::contains("0/1 models installed")),
        );
}

#[test]
fn test_standards_lists_builtins() {
    let home = tempfile::tempdir().unwrap();
    let mut assert = produce_qa(home.path()).arg("standards").assert().success();
    for name in ["apple", "tomato", "banana", "orange", "cabbage", "potato"] {
        assert = assert.stdout(predicate::str::contains(name));
    }
}

#[test]
fn test_standards_json() {
    let home = tempfile::tempdir().unwrap();
    let output = produce_qa(home.path())
        .arg("standards")
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed.len(), 6);
    assert!(parsed.iter().any(|s| s["name"] == "banana"));
}
