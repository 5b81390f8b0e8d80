use crate::config::{LearnerConfig, LearnerType};
use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::models::beta::{BetaBlock, BetaSet, BlockState};
use crate::models::learner_trait::{training_targets, Learner, LearnerState};
use crate::suite::{DiscrId, Suite};

/// Baseline that ignores features and predicts the smoothed class
/// frequencies `(n_c + 1) / (N + k)` seen during training.
///
/// Counts live in a single-row block per discrimination.
pub struct TrivialLearner {
    config: LearnerConfig,
    counts: BetaSet,
    examples: u64,
}

impl TrivialLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        if !matches!(config.learner_type, LearnerType::Trivial {}) {
            return Err(ClassifierError::config(format!(
                "expected Trivial parameters, got {:?}",
                config.learner_type
            )));
        }
        Ok(TrivialLearner {
            config,
            counts: BetaSet::new(),
            examples: 0,
        })
    }

    pub(crate) fn from_state(config: LearnerConfig, examples: u64, counts: Vec<BetaBlock>) -> Result<Self> {
        let mut learner = Self::new(config)?;
        learner.examples = examples;
        learner.counts = BetaSet::from_blocks(counts)?;
        Ok(learner)
    }
}

impl Learner for TrivialLearner {
    fn absorb_example(&mut self, suite: &Suite, point: &DataPoint) -> Result<()> {
        for (discr, y) in training_targets(suite, point)? {
            let block = self.counts.block_always(discr.id(), 1, discr.class_count(), 0.0);
            block.matrix_mut()[(0, y)] += 1.0;
            block.mark_updated();
        }
        self.examples += 1;
        Ok(())
    }

    fn apply_model_log(&self, suite: &Suite, _point: &DataPoint) -> Vec<Vec<f64>> {
        suite
            .discriminations()
            .iter()
            .map(|discr| {
                let k = discr.class_count();
                let counts: Vec<f64> = (0..k)
                    .map(|c| {
                        self.counts
                            .find(discr.id())
                            .and_then(|b| b.matrix().get(0, c).copied())
                            .unwrap_or(0.0)
                    })
                    .collect();
                let total: f64 = counts.iter().sum();
                let denom = (total + k as f64).ln();
                counts.into_iter().map(|n| (n + 1.0).ln() - denom).collect()
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!(
            "Trivial(class frequencies): {} block(s), {} example(s)",
            self.counts.blocks().len(),
            self.examples
        )
    }

    fn find_block_for_dis(&self, discr: DiscrId) -> Result<&BetaBlock> {
        self.counts.find_block_for_dis(discr)
    }

    fn block_state(&self, discr: DiscrId) -> BlockState {
        self.counts.state(discr)
    }

    fn delete_discrimination(&mut self, discr: DiscrId) {
        self.counts.remove(discr);
    }

    fn examples_absorbed(&self) -> u64 {
        self.examples
    }

    fn config(&self) -> &LearnerConfig {
        &self.config
    }

    fn to_state(&self) -> LearnerState {
        LearnerState::Trivial {
            config: self.config.clone(),
            examples: self.examples,
            counts: self.counts.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::CreationContext;

    #[test]
    fn smoothed_frequencies() {
        let mut suite = Suite::new("s");
        suite.add_discrimination("topic").unwrap();
        let a = suite.add_class("topic", "A", true, CreationContext::Api).unwrap().unwrap();
        suite.add_class("topic", "B", true, CreationContext::Api).unwrap();
        let mut p = DataPoint::new("p", vec![(0, 1.0)]).unwrap();
        p.set_classes(&[a], &suite).unwrap();

        let mut learner = TrivialLearner::new(LearnerConfig::new(1.0, LearnerType::Trivial {})).unwrap();
        let uniform = learner.apply_model(&suite, &p);
        assert!((uniform[0][0] - 0.5).abs() < 1e-12);

        learner.absorb_example(&suite, &p).unwrap();
        learner.absorb_example(&suite, &p).unwrap();
        let probs = learner.apply_model(&suite, &p);
        assert!((probs[0][0] - 0.75).abs() < 1e-12);
        assert!((probs[0][1] - 0.25).abs() < 1e-12);
    }
}
