//! Hyper-parameter sweep: one independent session per grid cell, run in
//! parallel with rayon.
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use boxer_classifiers::config::{LearnerConfig, LearnerType};
use boxer_classifiers::io::label_store::LabelStore;
use boxer_classifiers::io::sparse_tsv::RawExample;
use boxer_classifiers::session::Session;

use super::{load_label_store, prepare_points, read_all_examples, score_points, train_points};
use crate::run_config::RunConfig;

/// Test-set results for one discrimination.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminationResult {
    pub discrimination: String,
    pub w_avg_recall: Option<f64>,
    pub mean_log_likelihood: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepCell {
    pub learning_rate: f64,
    /// `None` for learners without a gravity parameter.
    pub gravity: Option<f64>,
    pub results: Vec<DiscriminationResult>,
}

/// Learner configurations for every cell of the grid, learning rate major.
///
/// Gravities only vary for the truncated gradient learner; other learners
/// get one cell per learning rate.
pub fn grid_configs(config: &RunConfig) -> Vec<LearnerConfig> {
    let mut cells = Vec::new();
    for &rate in &config.sweep.learning_rates {
        match &config.learner.learner_type {
            LearnerType::TruncatedGradient {
                gravity,
                theta,
                truncation_period,
            } => {
                let gravities = if config.sweep.gravities.is_empty() {
                    vec![*gravity]
                } else {
                    config.sweep.gravities.clone()
                };
                for g in gravities {
                    cells.push(LearnerConfig::new(
                        rate,
                        LearnerType::TruncatedGradient {
                            gravity: g,
                            theta: *theta,
                            truncation_period: *truncation_period,
                        },
                    ));
                }
            }
            other => cells.push(LearnerConfig::new(rate, other.clone())),
        }
    }
    cells
}

fn run_cell(
    config: &RunConfig,
    learner: LearnerConfig,
    train: &[RawExample],
    test: &[RawExample],
    labels: Option<&LabelStore>,
) -> Result<SweepCell> {
    let learning_rate = learner.learning_rate;
    let gravity = match learner.learner_type {
        LearnerType::TruncatedGradient { gravity, .. } => Some(gravity),
        _ => None,
    };

    let mut session = Session::new(config.session_suite_config(), learner)?;
    let training = prepare_points(&mut session, train, labels, true)?;
    session.commit_schema()?;
    train_points(&mut session, &config.window, training)?;
    let testing = prepare_points(&mut session, test, labels, false)?;
    score_points(&mut session, &testing, None)?;

    let scores = session.scores();
    let results = session
        .suite()
        .discriminations()
        .iter()
        .enumerate()
        .filter(|(i, _)| scores.scored_count(*i) > 0)
        .map(|(i, discr)| DiscriminationResult {
            discrimination: discr.name().to_string(),
            w_avg_recall: scores.w_avg_recall(i),
            mean_log_likelihood: scores.mean_likelihood(i).map(|(log_lik, _)| log_lik),
        })
        .collect();
    log::debug!("Finished sweep cell rate={} gravity={:?}", learning_rate, gravity);
    Ok(SweepCell {
        learning_rate,
        gravity,
        results,
    })
}

/// Train on `train` and evaluate on `test` for every cell of the configured
/// grid. Cells come back in grid order.
pub fn run_sweep(
    config: &RunConfig,
    train: &[PathBuf],
    test: &[PathBuf],
    labels: Option<&Path>,
) -> Result<Vec<SweepCell>> {
    let train_examples = read_all_examples(train)?;
    let test_examples = read_all_examples(test)?;
    let store = load_label_store(labels)?;
    let cells = grid_configs(config);
    log::info!(
        "Sweeping {} cell(s) over {} training and {} test example(s)",
        cells.len(),
        train_examples.len(),
        test_examples.len()
    );

    cells
        .into_par_iter()
        .map(|learner| {
            let rate = learner.learning_rate;
            run_cell(config, learner, &train_examples, &test_examples, store.as_ref())
                .with_context(|| format!("Sweep cell with learning rate {} failed", rate))
        })
        .collect()
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// Tab-separated table, one row per cell and discrimination.
pub fn write_sweep_table<W: Write>(output: W, cells: &[SweepCell]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(output);
    writer.write_record([
        "learning_rate",
        "gravity",
        "discrimination",
        "w_avg_recall",
        "mean_log_likelihood",
    ])?;
    for cell in cells {
        let rate = cell.learning_rate.to_string();
        let gravity = cell.gravity.map(|g| g.to_string()).unwrap_or_default();
        for result in &cell.results {
            writer.write_record([
                rate.as_str(),
                gravity.as_str(),
                result.discrimination.as_str(),
                optional(result.w_avg_recall).as_str(),
                optional(result.mean_log_likelihood).as_str(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}
