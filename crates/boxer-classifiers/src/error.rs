use std::error::Error;
use std::fmt;

use crate::suite::CreationContext;

/// Errors raised by the classification core.
///
/// Schema and configuration problems are reported at the point of violation;
/// nothing in the core drops or repairs inconsistent input on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Duplicate names, labels on a fallback discrimination, ambiguous labels.
    SchemaViolation(String),
    /// A class or discrimination may not be created in this context.
    PolicyViolation {
        discrimination: String,
        class: String,
        context: CreationContext,
    },
    /// Invalid construction parameters (window sizes, learner options, ...).
    Configuration(String),
    /// Feature id or class position beyond the current coefficient block.
    DimensionMismatch {
        what: &'static str,
        index: usize,
        bound: usize,
    },
    /// Lookup of an unregistered feature, discrimination or class.
    NotFound { kind: &'static str, key: String },
}

impl ClassifierError {
    pub fn not_found(kind: &'static str, key: impl fmt::Display) -> Self {
        ClassifierError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        ClassifierError::SchemaViolation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ClassifierError::Configuration(msg.into())
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ClassifierError::SchemaViolation(msg) => write!(f, "Schema violation: {}", msg),
            ClassifierError::PolicyViolation {
                discrimination,
                class,
                context,
            } => write!(
                f,
                "Policy violation: class '{}' may not be created in discrimination '{}' ({} context)",
                class, discrimination, context
            ),
            ClassifierError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ClassifierError::DimensionMismatch { what, index, bound } => write!(
                f,
                "Dimension mismatch: {} {} is out of range (bound {})",
                what, index, bound
            ),
            ClassifierError::NotFound { kind, key } => write!(f, "No {} found for '{}'", kind, key),
        }
    }
}

impl Error for ClassifierError {}

pub type Result<T> = std::result::Result<T, ClassifierError>;
