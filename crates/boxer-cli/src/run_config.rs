//! Run configuration shared by every subcommand.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use boxer_classifiers::config::{LearnerConfig, LearnerType, SuiteConfig, WindowConfig};

/// Hyper-parameter grid explored by `boxer sweep`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub learning_rates: Vec<f64>,
    /// Only used with the truncated gradient learner.
    pub gravities: Vec<f64>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            learning_rates: vec![0.01, 0.1, 0.5],
            gravities: vec![0.0, 0.001, 0.01],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub learner: LearnerConfig,
    pub window: WindowConfig,
    pub suite: SuiteConfig,
    pub sweep: SweepGrid,
    /// Scale every point to unit L2 norm before training and scoring.
    pub normalize: bool,
}

impl RunConfig {
    /// Check the learner and window settings before any data is read.
    pub fn validate(&self) -> Result<()> {
        self.learner.validate().context("Invalid learner configuration")?;
        self.window.validate().context("Invalid window configuration")?;
        if self.sweep.learning_rates.is_empty() {
            anyhow::bail!("sweep.learning_rates must not be empty");
        }
        Ok(())
    }

    /// Suite settings for a new session. The top-level `normalize` is
    /// folded in so the saved model records it.
    pub fn session_suite_config(&self) -> SuiteConfig {
        let mut suite = self.suite.clone();
        suite.normalize |= self.normalize;
        suite
    }

    /// Load the config file if one was given, then apply command-line
    /// overrides.
    pub fn from_arguments(config_path: Option<&Path>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_run_config(path)?,
            None => RunConfig::default(),
        };

        if let Some(learner) = arg_value::<String>(matches, "learner") {
            let learner_type: LearnerType = learner.parse().map_err(anyhow::Error::msg)?;
            if learner_type.name() != config.learner.learner_type.name() {
                config.learner.learner_type = learner_type;
            }
        }
        if let Some(rate) = arg_value::<f64>(matches, "learning_rate") {
            config.learner.learning_rate = rate;
        }
        if let Some(gravity) = arg_value::<f64>(matches, "gravity") {
            match &mut config.learner.learner_type {
                LearnerType::TruncatedGradient { gravity: g, .. } => *g = gravity,
                other => anyhow::bail!(
                    "--gravity only applies to the tg learner, configured learner is {}",
                    other.name()
                ),
            }
        }
        if arg_value::<bool>(matches, "normalize") == Some(true) {
            config.normalize = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Value of an optional argument; `None` when the subcommand does not define
/// it or it was not given.
fn arg_value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    matches.try_get_one::<T>(id).ok().flatten().cloned()
}

/// Load a run configuration from a JSON file. Missing fields take their
/// default values.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: RunConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
