use std::path::{Path, PathBuf};

use anyhow::Result;

use boxer_classifiers::io::model_file::load_session;
use boxer_classifiers::session::Session;

use super::{load_label_store, load_points, score_points};

/// Score `test` with a saved model. The returned session holds the
/// accumulated scores.
///
/// Normalization follows what the model was trained with; asking for it on
/// a model trained without it is an error.
pub fn run_score(
    model: &Path,
    test: &[PathBuf],
    labels: Option<&Path>,
    predictions: Option<&Path>,
    normalize: bool,
) -> Result<Session> {
    let mut session = load_session(model)?;
    if normalize && !session.suite_config().normalize {
        anyhow::bail!(
            "--normalize was given but model {} was trained without normalization",
            model.display()
        );
    }
    if session.suite_config().normalize {
        log::info!("Model was trained with normalization, normalizing test points");
    }
    let store = load_label_store(labels)?;
    let points = load_points(&mut session, test, store.as_ref(), false)?;
    score_points(&mut session, &points, predictions)?;
    log::info!("Scored {} point(s)", points.len());
    Ok(session)
}
