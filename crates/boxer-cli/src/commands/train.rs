use std::path::{Path, PathBuf};

use anyhow::Result;

use boxer_classifiers::io::label_store::LabelStore;
use boxer_classifiers::io::model_file::save_model;
use boxer_classifiers::session::Session;

use super::{load_label_store, load_points, train_points};
use crate::run_config::RunConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub points: usize,
    pub presented: u64,
    pub features: usize,
    pub discriminations: usize,
}

/// Train a fresh session on `train` and write the model to `model_out`.
pub fn run_train(
    config: &RunConfig,
    train: &[PathBuf],
    labels: Option<&Path>,
    model_out: &Path,
) -> Result<TrainSummary> {
    let store = load_label_store(labels)?;
    let (session, summary) = train_session(config, train, store.as_ref())?;
    save_model(model_out, &session.export())?;
    Ok(summary)
}

/// Build a session from `config` and train it on every file in `train`.
///
/// The label schema is committed once all training data has been read, so
/// later test data is held to the configured class policy.
pub fn train_session(
    config: &RunConfig,
    train: &[PathBuf],
    labels: Option<&LabelStore>,
) -> Result<(Session, TrainSummary)> {
    let mut session = Session::new(config.session_suite_config(), config.learner.clone())?;
    let points = load_points(&mut session, train, labels, true)?;
    let committed = session.commit_schema()?;
    log::debug!("Committed {} discrimination(s)", committed);

    let n_points = points.len();
    let presented = train_points(&mut session, &config.window, points)?;
    let summary = TrainSummary {
        points: n_points,
        presented,
        features: session.suite().dictionary().dimension(),
        discriminations: session.suite().discrimination_count(),
    };
    log::info!(
        "Trained on {} point(s): {} feature(s), {} discrimination(s)",
        summary.points,
        summary.features,
        summary.discriminations
    );
    Ok((session, summary))
}
