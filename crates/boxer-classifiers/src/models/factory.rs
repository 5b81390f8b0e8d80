use crate::config::{LearnerConfig, LearnerType};
use crate::error::Result;
use crate::models::exponentiated_gradient::ExponentiatedGradientLearner;
use crate::models::learner_trait::{Learner, LearnerState};
use crate::models::trivial::TrivialLearner;
use crate::models::truncated_gradient::TruncatedGradientLearner;

/// Build a fresh boxed learner from a `LearnerConfig`.
pub fn build_learner(params: LearnerConfig) -> Result<Box<dyn Learner>> {
    log::debug!("Building {} learner", params.learner_type.name());
    match params.learner_type {
        LearnerType::TruncatedGradient { .. } => Ok(Box::new(TruncatedGradientLearner::new(params)?)),
        LearnerType::ExponentiatedGradient { .. } => {
            Ok(Box::new(ExponentiatedGradientLearner::new(params)?))
        }
        LearnerType::Trivial {} => Ok(Box::new(TrivialLearner::new(params)?)),
    }
}

/// Rebuild a learner from an exported snapshot.
pub fn learner_from_state(state: LearnerState) -> Result<Box<dyn Learner>> {
    match state {
        LearnerState::TruncatedGradient {
            config,
            examples,
            blocks,
        } => Ok(Box::new(TruncatedGradientLearner::from_state(config, examples, blocks)?)),
        LearnerState::ExponentiatedGradient {
            config,
            examples,
            plus,
            minus,
        } => Ok(Box::new(ExponentiatedGradientLearner::from_state(
            config, examples, plus, minus,
        )?)),
        LearnerState::Trivial {
            config,
            examples,
            counts,
        } => Ok(Box::new(TrivialLearner::from_state(config, examples, counts)?)),
    }
}
