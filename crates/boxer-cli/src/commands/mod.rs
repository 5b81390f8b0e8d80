//! Subcommand drivers and the data plumbing they share.
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use boxer_classifiers::config::WindowConfig;
use boxer_classifiers::data_point::DataPoint;
use boxer_classifiers::io::label_store::LabelStore;
use boxer_classifiers::io::predictions::PredictionWriter;
use boxer_classifiers::io::sparse_tsv::{read_examples_from_path, to_points, RawExample};
use boxer_classifiers::preprocessing::normalize_l2;
use boxer_classifiers::session::Session;
use boxer_classifiers::training_window::build_window;

use crate::util::{open_output, validate_tsv_file};

pub mod learn;
pub mod score;
pub mod sweep;
pub mod train;

pub fn load_label_store(path: Option<&Path>) -> Result<Option<LabelStore>> {
    match path {
        Some(path) => {
            validate_tsv_file(path)?;
            let store = LabelStore::read_from_path(path)?;
            log::info!("Read labels for {} point(s) from {}", store.len(), path.display());
            Ok(Some(store))
        }
        None => Ok(None),
    }
}

/// Parse every file in `paths`, in order.
pub fn read_all_examples(paths: &[PathBuf]) -> Result<Vec<RawExample>> {
    let mut examples = Vec::new();
    for path in paths {
        validate_tsv_file(path)?;
        examples.extend(read_examples_from_path(path)?);
    }
    Ok(examples)
}

/// Build points for `session` and attach stored labels. Points are scaled to
/// unit norm when the session's suite config asks for it; the bias feature
/// keeps its value.
pub fn prepare_points(
    session: &mut Session,
    examples: &[RawExample],
    labels: Option<&LabelStore>,
    definitional: bool,
) -> Result<Vec<DataPoint>> {
    let mut points = to_points(session, examples, definitional)?;
    if let Some(store) = labels {
        let mut attached = 0;
        for point in points.iter_mut() {
            attached += store.apply(point, session.suite_mut(), definitional)?;
        }
        log::debug!("Attached {} stored label(s)", attached);
    }
    if session.suite_config().normalize {
        let bias = session.suite().dictionary().dummy_id();
        points.iter_mut().for_each(|p| normalize_l2(p, bias));
    }
    Ok(points)
}

pub fn load_points(
    session: &mut Session,
    paths: &[PathBuf],
    labels: Option<&LabelStore>,
    definitional: bool,
) -> Result<Vec<DataPoint>> {
    let examples = read_all_examples(paths)?;
    prepare_points(session, &examples, labels, definitional)
}

/// Run `points` through a window built from `window`; returns the number of
/// presentations.
pub fn train_points(session: &mut Session, window: &WindowConfig, points: Vec<DataPoint>) -> Result<u64> {
    let mut window = build_window::<DataPoint>(window)?;
    let presented = session.train_windowed(window.as_mut(), &mut points.into_iter(), true)?;
    log::info!(
        "Presented {} example(s), learner has absorbed {}",
        presented,
        session.learner().examples_absorbed()
    );
    Ok(presented)
}

/// Score `points` into the session's accumulator, writing one prediction
/// table to `predictions` when given.
pub fn score_points(session: &mut Session, points: &[DataPoint], predictions: Option<&Path>) -> Result<()> {
    let mut writer = match predictions {
        Some(path) => Some(PredictionWriter::new(open_output(Some(path))?)?),
        None => None,
    };
    for point in points {
        let log_probs = session
            .score(point)
            .with_context(|| format!("Failed to score point '{}'", point.name()))?;
        if let Some(writer) = writer.as_mut() {
            writer.write_point(point, session.suite(), &log_probs)?;
        }
    }
    if let (Some(writer), Some(path)) = (writer, predictions) {
        writer.finish()?.flush()?;
        log::info!("Wrote predictions to {}", path.display());
    }
    Ok(())
}

/// Recall/precision, weighted recall and likelihood reports, in that order.
pub fn full_report(session: &Session) -> String {
    let suite = session.suite();
    let scores = session.scores();
    let mut out = scores.scoring_report(suite);
    out.push_str(&scores.w_avg_recall_report(suite));
    out.push_str(&scores.lik_report(suite));
    out
}
