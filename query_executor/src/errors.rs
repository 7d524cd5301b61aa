use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),

    #[error("Unsupported by {backend} backend: {message}")]
    Unsupported {
        backend: &'static str,
        message: String,
    },

    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Expected {expected} output, got {actual}")]
    UnexpectedOutput {
        expected: &'static str,
        actual: &'static str,
    },
}

impl ExecutorError {
    pub(crate) fn unsupported(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Unsupported {
            backend,
            message: message.into(),
        }
    }
}
