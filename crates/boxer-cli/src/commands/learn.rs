use std::path::{Path, PathBuf};

use anyhow::Result;

use boxer_classifiers::session::Session;

use super::train::train_session;
use super::{load_label_store, load_points, score_points};
use crate::run_config::RunConfig;

/// Train on `train` and score `test` in the same session, without writing
/// a model file.
pub fn run_learn(
    config: &RunConfig,
    train: &[PathBuf],
    test: &[PathBuf],
    labels: Option<&Path>,
    predictions: Option<&Path>,
) -> Result<Session> {
    let store = load_label_store(labels)?;
    let (mut session, _) = train_session(config, train, store.as_ref())?;
    let points = load_points(&mut session, test, store.as_ref(), false)?;
    score_points(&mut session, &points, predictions)?;
    log::info!("Scored {} point(s)", points.len());
    Ok(session)
}
