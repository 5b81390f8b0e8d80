use std::collections::HashMap;

use crate::config::{LearnerConfig, LearnerType};
use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::models::beta::{BetaBlock, BetaSet, BlockState};
use crate::models::learner_trait::{log_softmax, required_rows, training_targets, Learner, LearnerState};
use crate::suite::{DiscrId, Suite};

/// Multinomial logistic regression trained by truncated gradient
/// (Langford, Li and Zhang, 2009).
///
/// Each example takes a stochastic gradient step on the log-likelihood of
/// its true class; every `truncation_period` examples, coefficients with
/// `|b| <= theta` are pulled towards zero by `eta * gravity * period`,
/// stopping at zero. Truncation is applied lazily: a row only catches up
/// on missed truncation rounds when a later example touches its feature,
/// or when the model is read or exported.
pub struct TruncatedGradientLearner {
    config: LearnerConfig,
    gravity: f64,
    theta: Option<f64>,
    period: u64,
    blocks: BetaSet,
    /// Truncation rounds already applied, per block row.
    marks: HashMap<DiscrId, Vec<u64>>,
    examples: u64,
}

fn truncate(b: f64, shrink: f64, theta: Option<f64>) -> f64 {
    if shrink <= 0.0 || b == 0.0 || theta.map_or(false, |t| b.abs() > t) {
        return b;
    }
    if b > 0.0 {
        (b - shrink).max(0.0)
    } else {
        (b + shrink).min(0.0)
    }
}

impl TruncatedGradientLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        let LearnerType::TruncatedGradient {
            gravity,
            theta,
            truncation_period,
        } = config.learner_type
        else {
            return Err(ClassifierError::config(format!(
                "expected TruncatedGradient parameters, got {:?}",
                config.learner_type
            )));
        };
        Ok(TruncatedGradientLearner {
            gravity,
            theta,
            period: truncation_period as u64,
            config,
            blocks: BetaSet::new(),
            marks: HashMap::new(),
            examples: 0,
        })
    }

    pub(crate) fn from_state(config: LearnerConfig, examples: u64, blocks: Vec<BetaBlock>) -> Result<Self> {
        let mut learner = Self::new(config)?;
        learner.examples = examples;
        learner.blocks = BetaSet::from_blocks(blocks)?;
        let rounds = learner.rounds();
        for block in learner.blocks.blocks() {
            learner
                .marks
                .insert(block.discr(), vec![rounds; block.matrix().nrows()]);
        }
        Ok(learner)
    }

    fn rounds(&self) -> u64 {
        self.examples / self.period
    }

    fn shrink_per_round(&self) -> f64 {
        self.config.learning_rate * self.gravity * self.period as f64
    }

    fn pending(&self, discr: DiscrId, row: usize) -> u64 {
        let applied = self
            .marks
            .get(&discr)
            .and_then(|m| m.get(row))
            .copied()
            .unwrap_or_else(|| self.rounds());
        self.rounds().saturating_sub(applied)
    }

    /// Apply every pending truncation round to every row.
    pub fn flush_truncation(&mut self) {
        let rounds = self.rounds();
        let shrink = self.shrink_per_round();
        let theta = self.theta;
        for block in self.blocks.blocks_mut() {
            let marks = self.marks.entry(block.discr()).or_default();
            let nrows = block.matrix().nrows();
            marks.resize(nrows, rounds);
            for (row, mark) in marks.iter_mut().enumerate() {
                let pending = rounds.saturating_sub(*mark);
                if pending > 0 {
                    for b in block.matrix_mut().row_slice_mut(row) {
                        *b = truncate(*b, shrink * pending as f64, theta);
                    }
                }
                *mark = rounds;
            }
        }
    }
}

impl Learner for TruncatedGradientLearner {
    fn absorb_example(&mut self, suite: &Suite, point: &DataPoint) -> Result<()> {
        let targets = training_targets(suite, point)?;
        let rows = required_rows(suite, point);
        let eta = self.config.learning_rate;
        let shrink = self.shrink_per_round();
        let theta = self.theta;
        let rounds_before = self.rounds();
        let rounds_after = (self.examples + 1) / self.period;

        for &(discr, y) in &targets {
            let k = discr.class_count();
            let block = self.blocks.block_always(discr.id(), rows, k, 0.0);
            let marks = self.marks.entry(discr.id()).or_default();
            marks.resize(block.matrix().nrows(), rounds_before);

            for &(j, _) in point.features() {
                let pending = rounds_before.saturating_sub(marks[j]);
                if pending > 0 {
                    for b in block.matrix_mut().row_slice_mut(j) {
                        *b = truncate(*b, shrink * pending as f64, theta);
                    }
                    marks[j] = rounds_before;
                }
            }

            let probs: Vec<f64> = log_softmax(block.linear_scores(point, k))
                .into_iter()
                .map(f64::exp)
                .collect();

            for &(j, x) in point.features() {
                let row = block.matrix_mut().row_slice_mut(j);
                for (c, p) in probs.iter().enumerate() {
                    let indicator = if c == y { 1.0 } else { 0.0 };
                    row[c] += eta * (indicator - p) * x;
                }
            }

            if rounds_after > rounds_before {
                for &(j, _) in point.features() {
                    let pending = rounds_after - marks[j];
                    for b in block.matrix_mut().row_slice_mut(j) {
                        *b = truncate(*b, shrink * pending as f64, theta);
                    }
                    marks[j] = rounds_after;
                }
            }
            block.mark_updated();
        }

        self.examples += 1;
        log::trace!(
            "Absorbed '{}' into {} discrimination(s), example {}",
            point.name(),
            targets.len(),
            self.examples
        );
        Ok(())
    }

    fn apply_model_log(&self, suite: &Suite, point: &DataPoint) -> Vec<Vec<f64>> {
        let shrink = self.shrink_per_round();
        suite
            .discriminations()
            .iter()
            .map(|discr| {
                let k = discr.class_count();
                let Some(block) = self.blocks.find(discr.id()) else {
                    return log_softmax(vec![0.0; k]);
                };
                let cols = block.matrix().ncols().min(k);
                let mut scores = vec![0.0; k];
                for &(j, x) in point.features() {
                    if j >= block.matrix().nrows() {
                        continue;
                    }
                    let pending = self.pending(discr.id(), j) as f64;
                    let row = block.matrix().row_slice(j);
                    for c in 0..cols {
                        scores[c] += truncate(row[c], shrink * pending, self.theta) * x;
                    }
                }
                log_softmax(scores)
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!(
            "TruncatedGradient(eta={}, gravity={}, theta={}, K={}): {} block(s), {} example(s)",
            self.config.learning_rate,
            self.gravity,
            self.theta.map_or_else(|| "inf".to_string(), |t| t.to_string()),
            self.period,
            self.blocks.blocks().len(),
            self.examples
        )
    }

    fn find_block_for_dis(&self, discr: DiscrId) -> Result<&BetaBlock> {
        self.blocks.find_block_for_dis(discr)
    }

    fn block_state(&self, discr: DiscrId) -> BlockState {
        self.blocks.state(discr)
    }

    fn delete_discrimination(&mut self, discr: DiscrId) {
        self.blocks.remove(discr);
        self.marks.remove(&discr);
    }

    fn examples_absorbed(&self) -> u64 {
        self.examples
    }

    fn config(&self) -> &LearnerConfig {
        &self.config
    }

    fn to_state(&self) -> LearnerState {
        let rounds = self.rounds();
        let shrink = self.shrink_per_round();
        let blocks = self
            .blocks
            .blocks()
            .iter()
            .map(|block| {
                let mut flushed = block.clone();
                for row in 0..flushed.matrix().nrows() {
                    let pending = rounds.saturating_sub(
                        self.marks
                            .get(&block.discr())
                            .and_then(|m| m.get(row))
                            .copied()
                            .unwrap_or(rounds),
                    );
                    if pending > 0 {
                        for b in flushed.matrix_mut().row_slice_mut(row) {
                            *b = truncate(*b, shrink * pending as f64, self.theta);
                        }
                    }
                }
                flushed
            })
            .collect();
        LearnerState::TruncatedGradient {
            config: self.config.clone(),
            examples: self.examples,
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::{ClassRef, CreationContext};

    fn config(eta: f64, gravity: f64, theta: Option<f64>, period: usize) -> LearnerConfig {
        LearnerConfig::new(
            eta,
            LearnerType::TruncatedGradient {
                gravity,
                theta,
                truncation_period: period,
            },
        )
    }

    fn suite_with(classes: &[&str]) -> Suite {
        let mut suite = Suite::new("s");
        suite.add_discrimination("topic").unwrap();
        for c in classes {
            suite.add_class("topic", c, true, CreationContext::Api).unwrap();
        }
        suite
    }

    fn point(suite: &mut Suite, words: &[&str], class: &str) -> DataPoint {
        let features = words
            .iter()
            .map(|w| (suite.dictionary_mut().get_id_always(w), 1.0))
            .collect();
        let mut p = DataPoint::new("p", features).unwrap();
        let cref: ClassRef = suite
            .add_class("topic", class, true, CreationContext::Api)
            .unwrap()
            .unwrap();
        p.set_classes(&[cref], suite).unwrap();
        p
    }

    #[test]
    fn learns_a_separable_problem() {
        let mut suite = suite_with(&["A", "B"]);
        let a = point(&mut suite, &["ball", "goal"], "A");
        let b = point(&mut suite, &["vote", "law"], "B");
        let mut learner = TruncatedGradientLearner::new(config(0.5, 0.0, None, 1)).unwrap();
        for _ in 0..20 {
            learner.absorb_example(&suite, &a).unwrap();
            learner.absorb_example(&suite, &b).unwrap();
        }
        let pa = learner.apply_model(&suite, &a);
        let pb = learner.apply_model(&suite, &b);
        assert!(pa[0][0] > 0.9);
        assert!(pb[0][1] > 0.9);
        assert!(((pa[0][0] + pa[0][1]) - 1.0).abs() < 1e-9);
        assert_eq!(learner.block_state(suite.discriminations()[0].id()), BlockState::Updated);
    }

    #[test]
    fn gravity_truncates_to_zero_without_crossing() {
        let mut suite = suite_with(&["A", "B"]);
        let a = point(&mut suite, &["rare"], "A");
        let b = point(&mut suite, &["common"], "B");
        let mut learner = TruncatedGradientLearner::new(config(0.1, 1.0, None, 1)).unwrap();
        learner.absorb_example(&suite, &a).unwrap();
        for _ in 0..10 {
            learner.absorb_example(&suite, &b).unwrap();
        }
        learner.flush_truncation();
        let id = suite.discriminations()[0].id();
        let block = learner.find_block_for_dis(id).unwrap();
        let rare = suite.dictionary().get_id("rare").unwrap();
        assert_eq!(block.coefficient(rare, 0).unwrap(), 0.0);
        assert_eq!(block.coefficient(rare, 1).unwrap(), 0.0);
    }

    #[test]
    fn theta_protects_large_coefficients() {
        assert_eq!(truncate(0.5, 0.1, Some(0.3)), 0.5);
        assert!((truncate(0.2, 0.1, Some(0.3)) - 0.1).abs() < 1e-15);
        assert_eq!(truncate(-0.05, 0.1, None), 0.0);
        assert_eq!(truncate(0.05, 0.0, None), 0.05);
    }

    #[test]
    fn lazy_truncation_matches_export() {
        let mut suite = suite_with(&["A", "B"]);
        let a = point(&mut suite, &["x", "y"], "A");
        let b = point(&mut suite, &["y"], "B");
        let mut learner = TruncatedGradientLearner::new(config(0.2, 0.05, Some(10.0), 2)).unwrap();
        learner.absorb_example(&suite, &a).unwrap();
        for _ in 0..5 {
            learner.absorb_example(&suite, &b).unwrap();
        }
        let lazy = learner.apply_model_log(&suite, &a);
        let LearnerState::TruncatedGradient { config, examples, blocks } = learner.to_state() else {
            panic!("wrong state variant");
        };
        let reloaded = TruncatedGradientLearner::from_state(config, examples, blocks).unwrap();
        let eager = reloaded.apply_model_log(&suite, &a);
        for (l, e) in lazy[0].iter().zip(eager[0].iter()) {
            assert!((l - e).abs() < 1e-12);
        }
    }

    #[test]
    fn block_grows_with_new_classes_and_features() {
        let mut suite = suite_with(&["A"]);
        let a = point(&mut suite, &["x"], "A");
        let mut learner = TruncatedGradientLearner::new(config(0.1, 0.0, None, 1)).unwrap();
        learner.absorb_example(&suite, &a).unwrap();
        let id = suite.discriminations()[0].id();
        assert_eq!(learner.find_block_for_dis(id).unwrap().matrix().shape(), (1, 1));

        let c = point(&mut suite, &["x", "z"], "C");
        learner.absorb_example(&suite, &c).unwrap();
        assert_eq!(learner.find_block_for_dis(id).unwrap().matrix().shape(), (2, 2));
        let probs = learner.apply_model_log(&suite, &c);
        assert_eq!(probs[0].len(), 2);
    }

    #[test]
    fn unlabelled_discrimination_is_not_allocated() {
        let mut suite = suite_with(&["A", "B"]);
        suite.add_discrimination("region").unwrap();
        suite.add_class("region", "east", true, CreationContext::Api).unwrap();
        let a = point(&mut suite, &["x"], "A");
        let mut learner = TruncatedGradientLearner::new(config(0.1, 0.0, None, 1)).unwrap();
        learner.absorb_example(&suite, &a).unwrap();
        let region = suite.get_discrimination("region").unwrap().id();
        assert_eq!(learner.block_state(region), BlockState::Unallocated);
        let out = learner.apply_model_log(&suite, &a);
        assert_eq!(out[1], vec![0.0]);
    }

    #[test]
    fn wrong_parameters_are_a_configuration_error() {
        let cfg = LearnerConfig::new(0.1, LearnerType::Trivial {});
        assert!(matches!(
            TruncatedGradientLearner::new(cfg),
            Err(ClassifierError::Configuration(_))
        ));
    }
}
