//! A training/testing session: one suite, one learner and one score
//! accumulator kept in step with each other.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{LearnerConfig, SuiteConfig};
use crate::data_point::DataPoint;
use crate::dictionary::FeatureDictionary;
use crate::error::{ClassifierError, Result};
use crate::models::{build_learner, learner_from_state, Learner, LearnerState};
use crate::scores::Scores;
use crate::suite::{ClassRef, Suite};
use crate::training_window::TrainingWindow;

/// A label as read from data: an optional discrimination name and a class
/// name. Written `discr:class`, or just `class` for a suite with a single
/// explicit discrimination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLabel {
    pub discrimination: Option<String>,
    pub class: String,
}

impl RawLabel {
    pub fn new(discrimination: Option<&str>, class: &str) -> Self {
        RawLabel {
            discrimination: discrimination.map(str::to_string),
            class: class.to_string(),
        }
    }
}

impl FromStr for RawLabel {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (discr, class) = match s.split_once(':') {
            Some((d, c)) => (Some(d.trim()), c.trim()),
            None => (None, s),
        };
        if class.is_empty() {
            return Err(ClassifierError::schema(format!("empty class name in label '{}'", s)));
        }
        Ok(RawLabel::new(discr.filter(|d| !d.is_empty()), class))
    }
}

impl fmt::Display for RawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.discrimination {
            Some(d) => write!(f, "{}:{}", d, self.class),
            None => write!(f, "{}", self.class),
        }
    }
}

/// Everything needed to resume scoring with a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub suite_config: SuiteConfig,
    pub suite: Suite,
    pub learner: LearnerState,
}

pub struct Session {
    suite_config: SuiteConfig,
    suite: Suite,
    learner: Box<dyn Learner>,
    scores: Scores,
    next_point: u64,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("suite_config", &self.suite_config)
            .field("suite", &self.suite)
            .field("learner", &self.learner.describe())
            .field("scores", &self.scores)
            .field("next_point", &self.next_point)
            .finish()
    }
}

impl Session {
    pub fn new(suite_config: SuiteConfig, learner_config: LearnerConfig) -> Result<Self> {
        let dictionary = if suite_config.dummy_feature {
            FeatureDictionary::with_dummy()
        } else {
            FeatureDictionary::new()
        };
        let mut suite = Suite::with_dictionary(&suite_config.name, dictionary);
        suite.set_new_discr_policy(suite_config.new_discrimination_policy);
        if let Some((name, default_class)) = &suite_config.fallback {
            suite.add_fallback_discrimination(name, default_class)?;
        }
        let learner = build_learner(learner_config)?;
        log::info!("Started session '{}' with {}", suite.name(), learner.describe());
        Ok(Session {
            suite_config,
            suite,
            learner,
            scores: Scores::new(),
            next_point: 0,
        })
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn suite_mut(&mut self) -> &mut Suite {
        &mut self.suite
    }

    pub fn learner(&self) -> &dyn Learner {
        self.learner.as_ref()
    }

    pub fn scores(&self) -> &Scores {
        &self.scores
    }

    pub fn suite_config(&self) -> &SuiteConfig {
        &self.suite_config
    }

    /// Next auto-generated point name, `p0`, `p1`, ...
    pub fn next_name(&mut self) -> String {
        let name = format!("p{}", self.next_point);
        self.next_point += 1;
        name
    }

    /// Build a point from named features and raw labels.
    ///
    /// Feature names are added to the dictionary as needed, even when a label
    /// later fails to resolve. The dummy feature, when the dictionary has
    /// one, is appended with value 1. Labels the class policy says to skip
    /// are dropped.
    pub fn make_point<S: AsRef<str>>(
        &mut self,
        name: Option<&str>,
        features: &[(S, f64)],
        labels: &[RawLabel],
        definitional: bool,
    ) -> Result<DataPoint> {
        let name = match name.filter(|n| !n.is_empty()) {
            Some(n) => n.to_string(),
            None => self.next_name(),
        };

        let dict = self.suite.dictionary_mut();
        let mut ids = Vec::with_capacity(features.len() + 1);
        for (feature, value) in features {
            ids.push((dict.get_id_always(feature.as_ref()), *value));
        }
        if let Some(dummy) = dict.dummy_id() {
            if ids.iter().any(|&(id, _)| id == dummy) {
                return Err(ClassifierError::schema(format!(
                    "data point '{}' sets the reserved bias feature explicitly",
                    name
                )));
            }
            ids.push((dummy, 1.0));
        }
        let mut point = DataPoint::new(name, ids)?;

        let mut classes: Vec<ClassRef> = Vec::with_capacity(labels.len());
        for label in labels {
            if let Some(cref) =
                self.suite
                    .get_cla_always(label.discrimination.as_deref(), &label.class, definitional)?
            {
                classes.push(cref);
            }
        }
        point.set_classes(&classes, &self.suite)?;
        Ok(point)
    }

    /// Commit every uncommitted discrimination under the configured class
    /// policy. A no-op when everything is already committed.
    pub fn commit_schema(&mut self) -> Result<usize> {
        if self.suite.discriminations().iter().all(|d| d.is_committed()) {
            return Ok(0);
        }
        self.suite
            .commit_all_discriminations(self.suite_config.class_policy)
    }

    pub fn train(&mut self, point: &DataPoint) -> Result<()> {
        self.learner.absorb_example(&self.suite, point)
    }

    /// Feed points from `source` through `window` until it stops; returns
    /// the number of presentations.
    pub fn train_windowed(
        &mut self,
        window: &mut dyn TrainingWindow<DataPoint>,
        source: &mut dyn Iterator<Item = DataPoint>,
        can_finalize: bool,
    ) -> Result<u64> {
        let suite = &self.suite;
        let learner = &mut self.learner;
        let mut sink = |p: &DataPoint| learner.absorb_example(suite, p);
        let start = window.presented();
        while window.absorb_next_example(source, &mut sink, can_finalize)? {}
        Ok(window.presented() - start)
    }

    /// Apply the model and accumulate the result into the session scores.
    pub fn score(&mut self, point: &DataPoint) -> Result<Vec<Vec<f64>>> {
        let log_probs = self.learner.apply_model_log(&self.suite, point);
        self.scores.eval_scores(point, &self.suite, &log_probs)?;
        Ok(log_probs)
    }

    /// Remove a discrimination from the suite, the learner and the scores.
    pub fn delete_discrimination(&mut self, name: &str) -> Result<()> {
        let index = self
            .suite
            .position_of_name(name)
            .ok_or_else(|| ClassifierError::not_found("discrimination", name))?;
        let id = self.suite.discrimination_at(index)?.id();
        if index < self.scores.len() {
            self.scores.delete_discr(index)?;
        }
        self.suite.delete_discrimination(index)?;
        self.learner.delete_discrimination(id);
        Ok(())
    }

    pub fn reset_scores(&mut self) {
        self.scores.reset();
    }

    pub fn export(&self) -> ModelDocument {
        ModelDocument {
            suite_config: self.suite_config.clone(),
            suite: self.suite.clone(),
            learner: self.learner.to_state(),
        }
    }

    pub fn import(doc: ModelDocument) -> Result<Self> {
        let learner = learner_from_state(doc.learner)?;
        log::info!(
            "Loaded model for suite '{}': {}",
            doc.suite.name(),
            learner.describe()
        );
        Ok(Session {
            suite_config: doc.suite_config,
            suite: doc.suite,
            learner,
            scores: Scores::new(),
            next_point: 0,
        })
    }
}
