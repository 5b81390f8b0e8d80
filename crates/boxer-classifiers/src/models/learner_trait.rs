use serde::{Deserialize, Serialize};

use crate::config::LearnerConfig;
use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::math::log_normalize;
use crate::models::beta::{BetaBlock, BlockState};
use crate::suite::{DiscrId, Discrimination, Suite};

/// Contract shared by the online learners.
///
/// A learner keeps one coefficient block per discrimination and is always
/// used together with the `Suite` whose schema its blocks follow.
pub trait Learner {
    /// Update the model from one labelled example.
    ///
    /// Every discrimination for which the point has an explicit label, or a
    /// default class, is trained. Blocks are allocated and grown as needed.
    fn absorb_example(&mut self, suite: &Suite, point: &DataPoint) -> Result<()>;

    /// Log-probability of every class of every discrimination, in suite
    /// order. Pure: unallocated blocks behave as all-zero coefficients.
    fn apply_model_log(&self, suite: &Suite, point: &DataPoint) -> Vec<Vec<f64>>;

    /// Probabilities, i.e. `exp` of [`Learner::apply_model_log`].
    fn apply_model(&self, suite: &Suite, point: &DataPoint) -> Vec<Vec<f64>> {
        self.apply_model_log(suite, point)
            .into_iter()
            .map(|row| row.into_iter().map(f64::exp).collect())
            .collect()
    }

    /// One-line summary of the algorithm and its parameters.
    fn describe(&self) -> String;

    fn find_block_for_dis(&self, discr: DiscrId) -> Result<&BetaBlock>;

    fn block_state(&self, discr: DiscrId) -> BlockState;

    /// Forget everything learned for `discr`.
    fn delete_discrimination(&mut self, discr: DiscrId);

    fn examples_absorbed(&self) -> u64;

    fn config(&self) -> &LearnerConfig;

    /// Snapshot for export.
    fn to_state(&self) -> LearnerState;

    fn name(&self) -> &str {
        self.config().learner_type.name()
    }
}

/// Serialized learner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LearnerState {
    TruncatedGradient {
        config: LearnerConfig,
        examples: u64,
        blocks: Vec<BetaBlock>,
    },
    ExponentiatedGradient {
        config: LearnerConfig,
        examples: u64,
        plus: Vec<BetaBlock>,
        minus: Vec<BetaBlock>,
    },
    Trivial {
        config: LearnerConfig,
        examples: u64,
        counts: Vec<BetaBlock>,
    },
}

impl LearnerState {
    pub fn config(&self) -> &LearnerConfig {
        match self {
            LearnerState::TruncatedGradient { config, .. }
            | LearnerState::ExponentiatedGradient { config, .. }
            | LearnerState::Trivial { config, .. } => config,
        }
    }
}

/// Discriminations to train on for `point`, with the true class position.
pub(crate) fn training_targets<'a>(
    suite: &'a Suite,
    point: &DataPoint,
) -> Result<Vec<(&'a Discrimination, usize)>> {
    let mut targets = Vec::new();
    for discr in suite.discriminations() {
        let Some(pos) = point.true_class(discr) else {
            continue;
        };
        if pos >= discr.class_count() {
            return Err(ClassifierError::DimensionMismatch {
                what: "class position",
                index: pos,
                bound: discr.class_count(),
            });
        }
        targets.push((discr, pos));
    }
    Ok(targets)
}

/// Rows a block must have to cover the dictionary and `point`.
pub(crate) fn required_rows(suite: &Suite, point: &DataPoint) -> usize {
    let from_point = point.max_feature_id().map_or(0, |id| id + 1);
    suite.dictionary().dimension().max(from_point)
}

/// Log-probabilities from raw linear scores.
pub(crate) fn log_softmax(mut scores: Vec<f64>) -> Vec<f64> {
    if !scores.is_empty() {
        log_normalize(&mut scores);
    }
    scores
}
