//! CLI binary smoke tests using assert_cmd.
//!
//! These tests run the compiled `boxer` binary end to end on small example
//! files written to a temporary directory.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const TRAIN: &str = "\
# name\tlabels\tfeatures
doc1\ttopic:sports\tball goal team
doc2\ttopic:sports\tball:2 team
doc3\ttopic:politics\tvote law
doc4\ttopic:politics\tcourt law vote
";

const TEST: &str = "\
t1\ttopic:sports\tball goal
t2\ttopic:politics\tvote court
";

fn cmd() -> Command {
    Command::cargo_bin("boxer").unwrap()
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

// ---------------------------------------------------------------------------
// Top-level
// ---------------------------------------------------------------------------

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("sweep"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boxer"));
}

#[test]
fn config_prints_default_json() {
    cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"learner\""))
        .stdout(predicate::str::contains("\"learning_rates\""))
        .stdout(predicate::str::contains("\"TruncatedGradient\""));
}

// ---------------------------------------------------------------------------
// train / score
// ---------------------------------------------------------------------------

#[test]
fn train_without_data_errors() {
    cmd().args(["train", "-m", "model.json"]).assert().failure();
}

#[test]
fn train_nonexistent_data_errors() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args(["train", "-d", "/nonexistent/train.tsv", "-m"])
        .arg(dir.path().join("model.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File does not exist"));
}

#[test]
fn train_then_score() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let test = write(dir.path(), "test.tsv", TEST);
    let model = dir.path().join("model.json");
    let predictions = dir.path().join("predictions.tsv");

    cmd()
        .args(["train", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(&model)
        .assert()
        .success();
    assert!(model.exists());

    cmd()
        .args(["score", "-m"])
        .arg(&model)
        .arg("-t")
        .arg(&test)
        .arg("-o")
        .arg(&predictions)
        .assert()
        .success()
        .stdout(predicate::str::contains("topic:sports Recall"))
        .stdout(predicate::str::contains("topic weighted recall"))
        .stdout(predicate::str::contains("over 2 point(s)"));

    let table = std::fs::read_to_string(&predictions).unwrap();
    assert!(table.starts_with("name\tdiscrimination\tchosen\tprobability\ttruth"));
    assert_eq!(table.lines().count(), 3);
    assert!(table.contains("t1\ttopic\t"));
}

#[test]
fn normalized_model_normalizes_at_score_time() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let test = write(dir.path(), "test.tsv", TEST);
    let normalized = dir.path().join("normalized.json");
    let raw = dir.path().join("raw.json");

    cmd()
        .args(["train", "--normalize", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(&normalized)
        .assert()
        .success();
    cmd()
        .args(["score", "-m"])
        .arg(&normalized)
        .arg("-t")
        .arg(&test)
        .assert()
        .success()
        .stdout(predicate::str::contains("over 2 point(s)"));
    cmd()
        .args(["score", "--normalize", "-m"])
        .arg(&normalized)
        .arg("-t")
        .arg(&test)
        .assert()
        .success();

    cmd()
        .args(["train", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(&raw)
        .assert()
        .success();
    cmd()
        .args(["score", "--normalize", "-m"])
        .arg(&raw)
        .arg("-t")
        .arg(&test)
        .assert()
        .failure()
        .stderr(predicate::str::contains("trained without normalization"));
}

#[test]
fn score_rejects_unseen_class() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let test = write(dir.path(), "test.tsv", "t1\ttopic:weather\train\n");
    let model = dir.path().join("model.json");

    cmd()
        .args(["train", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(&model)
        .assert()
        .success();

    cmd()
        .args(["score", "-m"])
        .arg(&model)
        .arg("-t")
        .arg(&test)
        .assert()
        .failure();
}

#[test]
fn train_with_config_and_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let config = write(
        dir.path(),
        "config.json",
        r#"{ "window": { "kind": "cyclic", "size": 2, "repeat": 2 } }"#,
    );
    let model = dir.path().join("model.json");

    cmd()
        .args(["train", "-c"])
        .arg(&config)
        .args(["--learner", "eg", "--learning-rate", "0.5", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(&model)
        .assert()
        .success()
        .stderr(predicate::str::contains("8 presentation(s)"));

    let saved = std::fs::read_to_string(&model).unwrap();
    assert!(saved.contains("ExponentiatedGradient"));
}

#[test]
fn gravity_override_needs_tg() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    cmd()
        .args(["train", "--learner", "trivial", "--gravity", "0.1", "-d"])
        .arg(&train)
        .arg("-m")
        .arg(dir.path().join("model.json"))
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// learn / sweep
// ---------------------------------------------------------------------------

#[test]
fn learn_prints_report() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let test = write(dir.path(), "test.tsv", TEST);

    cmd()
        .args(["learn", "-d"])
        .arg(&train)
        .arg("-t")
        .arg(&test)
        .assert()
        .success()
        .stdout(predicate::str::contains("topic:politics Recall"))
        .stdout(predicate::str::contains("log-likelihood"));
}

#[test]
fn sweep_writes_one_row_per_cell() {
    let dir = tempfile::tempdir().unwrap();
    let train = write(dir.path(), "train.tsv", TRAIN);
    let test = write(dir.path(), "test.tsv", TEST);
    let config = write(
        dir.path(),
        "config.json",
        r#"{ "sweep": { "learning_rates": [0.1, 0.5], "gravities": [0.0, 0.01] } }"#,
    );

    let output = cmd()
        .args(["sweep", "-c"])
        .arg(&config)
        .arg("-d")
        .arg(&train)
        .arg("-t")
        .arg(&test)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("learning_rate\tgravity\tdiscrimination"));
    assert!(lines[1].starts_with("0.1\t0\ttopic\t"));
}
