//! Error taxonomy shared by the engine, configuration loader, and I/O layers.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::units::{Dimension, Unit};

/// Convenience alias used throughout the crate.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

/// A single invalid configuration field with a constraint description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"storage[0].capacity"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates a new error for `field`.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Fatal errors raised by the simulation core and its outer layers.
#[derive(Debug, Error)]
pub enum SimError {
    /// Out-of-range or malformed parameters. Raised before any step runs.
    #[error("invalid configuration: {}", join_config_errors(.0))]
    Configuration(Vec<ConfigError>),

    /// A quantity carries the wrong physical dimension for its role.
    #[error("unit mismatch in {context}: expected {expected}, found {found}")]
    UnitMismatch {
        context: String,
        expected: Dimension,
        found: Unit,
    },

    /// Malformed input series (irregular step, empty intersection, bad values).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A conservation or reservoir-bounds check failed after a step.
    #[error("invariant violated at step {step}: {message}")]
    InvariantViolation { step: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Shorthand for a single-field configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration(vec![ConfigError::new(field, message)])
    }

    /// Returns the offending configuration fields, if this is a configuration error.
    pub fn config_errors(&self) -> &[ConfigError] {
        match self {
            Self::Configuration(errors) => errors,
            _ => &[],
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(vec![error])
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Non-fatal signal that aligning two input series dropped some steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentWarning {
    /// Steps present in the longer series but missing from the intersection.
    pub dropped_steps: usize,
    /// Length of the longer input series.
    pub total_steps: usize,
    /// `dropped_steps / total_steps`.
    pub dropped_fraction: f64,
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "series alignment dropped {} of {} steps ({:.2}%)",
            self.dropped_steps,
            self.total_steps,
            100.0 * self.dropped_fraction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_lists_every_field() {
        let err = SimError::Configuration(vec![
            ConfigError::new("storage[0].capacity", "must be >= 0"),
            ConfigError::new("dac.max_power", "must be finite"),
        ]);
        let text = err.to_string();
        assert!(text.contains("storage[0].capacity: must be >= 0"));
        assert!(text.contains("dac.max_power: must be finite"));
        assert_eq!(err.config_errors().len(), 2);
    }

    #[test]
    fn unit_mismatch_message_names_both_sides() {
        let err = SimError::UnitMismatch {
            context: "demand series".into(),
            expected: Dimension::Power,
            found: Unit::GigawattHour,
        };
        assert_eq!(
            err.to_string(),
            "unit mismatch in demand series: expected power, found GWh"
        );
    }

    #[test]
    fn alignment_warning_display() {
        let w = AlignmentWarning {
            dropped_steps: 1,
            total_steps: 4,
            dropped_fraction: 0.25,
        };
        assert_eq!(w.to_string(), "series alignment dropped 1 of 4 steps (25.00%)");
    }
}
