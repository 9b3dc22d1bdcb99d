//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("missing required column(s): {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("invalid table: {message}")]
    Table { message: String },

    #[error("no valid records in input ({rejected} rejected)")]
    NoRecords { rejected: usize },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<csv::Error> for ApplicationError {
    fn from(e: csv::Error) -> Self {
        match e.position() {
            Some(pos) => ApplicationError::Table {
                message: format!("line {}: {}", pos.line(), e),
            },
            None => ApplicationError::Table {
                message: e.to_string(),
            },
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
