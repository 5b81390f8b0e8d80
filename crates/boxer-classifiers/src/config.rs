use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ClassifierError, Result};
use crate::suite::{ClassPolicy, NewDiscrPolicy};

/// Central configuration for learners in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LearnerConfig {
    pub learning_rate: f64,

    #[serde(flatten)]
    pub learner_type: LearnerType,
}

/// Supported online learners and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub enum LearnerType {
    /// Truncated gradient with gravity `gravity`, applied every
    /// `truncation_period` examples to coefficients with `|b| <= theta`
    /// (every coefficient when `theta` is unset).
    TruncatedGradient {
        gravity: f64,
        theta: Option<f64>,
        truncation_period: usize,
    },
    /// EG+- with `total_weight` split evenly between the positive and
    /// negative halves of every coefficient.
    ExponentiatedGradient { total_weight: f64 },
    /// Class-frequency prior, ignores features.
    Trivial {},
}

impl Default for LearnerType {
    fn default() -> Self {
        LearnerType::TruncatedGradient {
            gravity: 0.0,
            theta: None,
            truncation_period: 1,
        }
    }
}

impl LearnerType {
    pub fn name(&self) -> &'static str {
        match self {
            LearnerType::TruncatedGradient { .. } => "tg",
            LearnerType::ExponentiatedGradient { .. } => "eg",
            LearnerType::Trivial {} => "trivial",
        }
    }
}

impl FromStr for LearnerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tg" | "truncated_gradient" => Ok(LearnerType::default()),
            "eg" | "exponentiated_gradient" => {
                Ok(LearnerType::ExponentiatedGradient { total_weight: 1.0 })
            }
            "trivial" => Ok(LearnerType::Trivial {}),
            _ => Err(format!(
                "Unknown learner type: {}. Expected one of: tg, eg, trivial",
                s
            )),
        }
    }
}

impl LearnerConfig {
    pub fn new(learning_rate: f64, learner_type: LearnerType) -> Self {
        Self {
            learning_rate,
            learner_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ClassifierError::config(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        match &self.learner_type {
            LearnerType::TruncatedGradient {
                gravity,
                theta,
                truncation_period,
            } => {
                if !(*gravity >= 0.0) || gravity.is_infinite() {
                    return Err(ClassifierError::config(format!(
                        "gravity must be a non-negative number, got {}",
                        gravity
                    )));
                }
                if let Some(theta) = theta {
                    if !(*theta >= 0.0) {
                        return Err(ClassifierError::config(format!(
                            "theta must be non-negative, got {}",
                            theta
                        )));
                    }
                }
                if *truncation_period == 0 {
                    return Err(ClassifierError::config("truncation_period must be at least 1"));
                }
            }
            LearnerType::ExponentiatedGradient { total_weight } => {
                if !(total_weight.is_finite() && *total_weight > 0.0) {
                    return Err(ClassifierError::config(format!(
                        "total_weight must be positive, got {}",
                        total_weight
                    )));
                }
            }
            LearnerType::Trivial {} => {}
        }
        Ok(())
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            learner_type: LearnerType::default(),
        }
    }
}

/// How examples are presented to the learner.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum WindowConfig {
    /// Every example exactly once, in source order.
    #[default]
    None,
    Cyclic {
        size: usize,
        repeat: usize,
    },
    Randomized {
        size: usize,
        repeat: usize,
        seed: u64,
    },
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        match *self {
            WindowConfig::None => Ok(()),
            WindowConfig::Cyclic { size, repeat } => {
                if size == 0 || repeat == 0 {
                    return Err(ClassifierError::config(
                        "cyclic window size and repeat must both be positive",
                    ));
                }
                if size % repeat != 0 {
                    return Err(ClassifierError::config(format!(
                        "cyclic window size {} is not divisible by repeat {}",
                        size, repeat
                    )));
                }
                Ok(())
            }
            WindowConfig::Randomized { size, repeat, .. } => {
                if size == 0 || repeat == 0 {
                    return Err(ClassifierError::config(
                        "randomized window size and repeat must both be positive",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Label-schema settings applied when a session starts.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SuiteConfig {
    pub name: String,
    pub new_discrimination_policy: NewDiscrPolicy,
    /// Policy applied by `commit_all_discriminations` after training data.
    pub class_policy: ClassPolicy,
    /// Reserve a bias feature at id 0.
    pub dummy_feature: bool,
    /// `(discrimination, default class)` of the fallback discrimination.
    pub fallback: Option<(String, String)>,
    /// Points are scaled to unit L2 norm, bias excluded, before training and
    /// scoring.
    pub normalize: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            name: "suite".to_string(),
            new_discrimination_policy: NewDiscrPolicy::TrainOnly,
            class_policy: ClassPolicy::TrainOnly,
            dummy_feature: true,
            fallback: None,
            normalize: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learner_type_from_str() {
        assert_eq!("TG".parse::<LearnerType>().unwrap().name(), "tg");
        assert_eq!("eg".parse::<LearnerType>().unwrap().name(), "eg");
        assert!("svm".parse::<LearnerType>().is_err());
    }

    #[test]
    fn default_config_validates() {
        LearnerConfig::default().validate().unwrap();
        let bad = LearnerConfig::new(0.0, LearnerType::Trivial {});
        assert!(bad.validate().is_err());
        let bad = LearnerConfig::new(
            0.1,
            LearnerType::TruncatedGradient {
                gravity: 0.1,
                theta: Some(1.0),
                truncation_period: 0,
            },
        );
        assert!(bad.validate().is_err());
    }

    #[test]
    fn cyclic_window_requires_divisibility() {
        assert!(WindowConfig::Cyclic { size: 6, repeat: 3 }.validate().is_ok());
        assert!(matches!(
            WindowConfig::Cyclic { size: 7, repeat: 3 }.validate(),
            Err(ClassifierError::Configuration(_))
        ));
    }

    #[test]
    fn config_json_round_trip() {
        let cfg = LearnerConfig::new(
            0.05,
            LearnerType::TruncatedGradient {
                gravity: 0.01,
                theta: Some(2.0),
                truncation_period: 10,
            },
        );
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("TruncatedGradient"));
        let back: LearnerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);

        let window: WindowConfig =
            serde_json::from_str(r#"{"kind":"randomized","size":10,"repeat":5,"seed":7}"#).unwrap();
        assert_eq!(
            window,
            WindowConfig::Randomized {
                size: 10,
                repeat: 5,
                seed: 7
            }
        );
    }
}
