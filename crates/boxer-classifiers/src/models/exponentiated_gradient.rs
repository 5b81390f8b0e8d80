use crate::config::{LearnerConfig, LearnerType};
use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::models::beta::{BetaBlock, BetaSet, BlockState};
use crate::models::learner_trait::{log_softmax, required_rows, training_targets, Learner, LearnerState};
use crate::suite::{DiscrId, Suite};

/// EG+- (Kivinen and Warmuth): every coefficient is the difference of two
/// positive weights, `b = w+ - w-`, updated multiplicatively.
///
/// Weights start at `total_weight / 2`, so every coefficient starts at zero,
/// including rows and columns added later.
pub struct ExponentiatedGradientLearner {
    config: LearnerConfig,
    initial: f64,
    plus: BetaSet,
    minus: BetaSet,
    effective: BetaSet,
    examples: u64,
}

impl ExponentiatedGradientLearner {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        let LearnerType::ExponentiatedGradient { total_weight } = config.learner_type else {
            return Err(ClassifierError::config(format!(
                "expected ExponentiatedGradient parameters, got {:?}",
                config.learner_type
            )));
        };
        Ok(ExponentiatedGradientLearner {
            initial: total_weight / 2.0,
            config,
            plus: BetaSet::new(),
            minus: BetaSet::new(),
            effective: BetaSet::new(),
            examples: 0,
        })
    }

    pub(crate) fn from_state(
        config: LearnerConfig,
        examples: u64,
        plus: Vec<BetaBlock>,
        minus: Vec<BetaBlock>,
    ) -> Result<Self> {
        let mut learner = Self::new(config)?;
        learner.examples = examples;
        learner.plus = BetaSet::from_blocks(plus)?;
        learner.minus = BetaSet::from_blocks(minus)?;

        let mut effective = Vec::with_capacity(learner.plus.blocks().len());
        for p in learner.plus.blocks() {
            let m = learner.minus.find_block_for_dis(p.discr())?;
            if m.matrix().shape() != p.matrix().shape() {
                return Err(ClassifierError::schema(format!(
                    "positive and negative weights of {} differ in shape: {:?} vs {:?}",
                    p.discr(),
                    p.matrix().shape(),
                    m.matrix().shape()
                )));
            }
            let (rows, cols) = p.matrix().shape();
            let mut block = BetaBlock::new(p.discr(), rows, cols, 0.0);
            for ((b, wp), wm) in block
                .matrix_mut()
                .as_mut_slice()
                .iter_mut()
                .zip(p.matrix().as_slice())
                .zip(m.matrix().as_slice())
            {
                *b = wp - wm;
            }
            for _ in 0..p.updates() {
                block.mark_updated();
            }
            effective.push(block);
        }
        if learner.minus.blocks().len() != effective.len() {
            return Err(ClassifierError::schema(
                "negative weights reference a discrimination without positive weights",
            ));
        }
        learner.effective = BetaSet::from_blocks(effective)?;
        Ok(learner)
    }
}

impl Learner for ExponentiatedGradientLearner {
    fn absorb_example(&mut self, suite: &Suite, point: &DataPoint) -> Result<()> {
        let targets = training_targets(suite, point)?;
        let rows = required_rows(suite, point);
        let eta = self.config.learning_rate;

        for &(discr, y) in &targets {
            let k = discr.class_count();
            let id = discr.id();
            let coefficients = self.effective.block_always(id, rows, k, 0.0);
            let probs: Vec<f64> = log_softmax(coefficients.linear_scores(point, k))
                .into_iter()
                .map(f64::exp)
                .collect();

            let plus = self.plus.block_always(id, rows, k, self.initial);
            let minus = self.minus.block_always(id, rows, k, self.initial);
            let coefficients = self.effective.block_always(id, rows, k, 0.0);
            for &(j, x) in point.features() {
                let wp = plus.matrix_mut().row_slice_mut(j);
                let wm = minus.matrix_mut().row_slice_mut(j);
                let b = coefficients.matrix_mut().row_slice_mut(j);
                for (c, p) in probs.iter().enumerate() {
                    let indicator = if c == y { 1.0 } else { 0.0 };
                    let step = eta * (indicator - p) * x;
                    wp[c] *= step.exp();
                    wm[c] *= (-step).exp();
                    b[c] = wp[c] - wm[c];
                }
            }
            plus.mark_updated();
            minus.mark_updated();
            coefficients.mark_updated();
        }

        self.examples += 1;
        log::trace!(
            "EG absorbed '{}' into {} discrimination(s)",
            point.name(),
            targets.len()
        );
        Ok(())
    }

    fn apply_model_log(&self, suite: &Suite, point: &DataPoint) -> Vec<Vec<f64>> {
        suite
            .discriminations()
            .iter()
            .map(|discr| {
                let k = discr.class_count();
                let scores = match self.effective.find(discr.id()) {
                    Some(block) => block.linear_scores(point, k),
                    None => vec![0.0; k],
                };
                log_softmax(scores)
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!(
            "ExponentiatedGradient(eta={}, total_weight={}): {} block(s), {} example(s)",
            self.config.learning_rate,
            self.initial * 2.0,
            self.effective.blocks().len(),
            self.examples
        )
    }

    fn find_block_for_dis(&self, discr: DiscrId) -> Result<&BetaBlock> {
        self.effective.find_block_for_dis(discr)
    }

    fn block_state(&self, discr: DiscrId) -> BlockState {
        self.effective.state(discr)
    }

    fn delete_discrimination(&mut self, discr: DiscrId) {
        self.plus.remove(discr);
        self.minus.remove(discr);
        self.effective.remove(discr);
    }

    fn examples_absorbed(&self) -> u64 {
        self.examples
    }

    fn config(&self) -> &LearnerConfig {
        &self.config
    }

    fn to_state(&self) -> LearnerState {
        LearnerState::ExponentiatedGradient {
            config: self.config.clone(),
            examples: self.examples,
            plus: self.plus.to_vec(),
            minus: self.minus.to_vec(),
        }
    }
}
