//! Integration tests for the file adapters.

use std::fs;

use boxer_classifiers::config::{LearnerConfig, SuiteConfig};
use boxer_classifiers::io::label_store::{write_labels, LabelStore};
use boxer_classifiers::io::model_file::{load_model, load_session, save_model};
use boxer_classifiers::io::predictions::PredictionWriter;
use boxer_classifiers::io::sparse_tsv::{read_examples, read_points};
use boxer_classifiers::session::Session;

const TRAIN: &str = "\
# name\tlabels\tfeatures
d1\ttopic:sports\tball:2 goal:1
d2\ttopic:politics\tvote law:2
d3\ttopic:sports\tteam ball
\ttopic:politics\tcourt law
";

// ---------------------------------------------------------------------------
// Sparse TSV
// ---------------------------------------------------------------------------

#[test]
fn read_points_builds_dictionary_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train.tsv");
    fs::write(&path, TRAIN).unwrap();

    let mut session = Session::new(SuiteConfig::default(), LearnerConfig::default()).unwrap();
    let points = read_points(&mut session, &path, true).unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points[3].name(), "p0");
    // Dummy plus ball, goal, vote, law, team, court.
    assert_eq!(session.suite().dictionary().dimension(), 7);
    let topic = session.suite().get_discrimination("topic").unwrap();
    assert_eq!(topic.class_count(), 2);
    assert_eq!(points[1].class_for(topic.id()), Some(1));
}

#[test]
fn missing_file_reports_path() {
    let mut session = Session::new(SuiteConfig::default(), LearnerConfig::default()).unwrap();
    let err = read_points(&mut session, "/nonexistent/train.tsv", true).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/train.tsv"));
}

#[test]
fn bad_value_is_reported_with_line() {
    let err = read_examples("d1\ttopic:a\tx:oops\n".as_bytes()).unwrap_err();
    assert!(format!("{:#}", err).contains("line 1"));
}

// ---------------------------------------------------------------------------
// Label store
// ---------------------------------------------------------------------------

#[test]
fn label_file_round_trip() {
    let mut session = Session::new(SuiteConfig::default(), LearnerConfig::default()).unwrap();
    let points = read_points(&mut session, tempfile_with(TRAIN).path(), true).unwrap();

    let mut buf = Vec::new();
    write_labels(&mut buf, &points, session.suite()).unwrap();
    let store = LabelStore::read(buf.as_slice()).unwrap();
    assert_eq!(store.len(), 4);

    let mut unlabelled = points[0].clone();
    unlabelled.clear_classes();
    let applied = store
        .apply(&mut unlabelled, session.suite_mut(), false)
        .unwrap();
    assert_eq!(applied, 1);
    assert_eq!(unlabelled.classes(), points[0].classes());
}

fn tempfile_with(contents: &str) -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().unwrap();
    fs::write(file.path(), contents).unwrap();
    file
}

// ---------------------------------------------------------------------------
// Model files and predictions
// ---------------------------------------------------------------------------

#[test]
fn saved_model_scores_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");

    let mut session = Session::new(SuiteConfig::default(), LearnerConfig::default()).unwrap();
    let points = read_points(&mut session, tempfile_with(TRAIN).path(), true).unwrap();
    for p in &points {
        session.train(p).unwrap();
    }
    session.commit_schema().unwrap();
    save_model(&model_path, &session.export()).unwrap();

    let doc = load_model(&model_path).unwrap();
    assert_eq!(doc, session.export());

    let mut restored = load_session(&model_path).unwrap();
    let mut writer = PredictionWriter::new(Vec::new()).unwrap();
    for p in &points {
        let log_probs = restored.score(p).unwrap();
        writer.write_point(p, restored.suite(), &log_probs).unwrap();
    }
    let table = String::from_utf8(writer.finish().unwrap()).unwrap();
    assert_eq!(table.lines().count(), 5);
    assert!(table.lines().nth(1).unwrap().starts_with("d1\ttopic\t"));
    assert_eq!(restored.scores().scored_count(0), 4);
}
