//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the forestry formulas' preconditions.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("invalid input: {field} = {value} ({reason})")]
    InvalidInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("division by zero: {0}")]
    DivideByZero(&'static str),

    #[error("unknown sampling level: {0:?}")]
    UnknownLevel(String),

    #[error("missing value: {0}")]
    MissingValue(&'static str),
}

impl DomainError {
    /// Non-positive or non-finite measurement.
    pub fn non_positive(field: &'static str, value: f64) -> Self {
        Self::InvalidInput {
            field,
            value,
            reason: "must be a positive number",
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
