//! Error types for the ModelHaus crate
//!
//! This module contains all error types that can be returned by model and
//! coordinator operations.

use query_executor::ExecutorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    /// A required construction option is missing or empty
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A join specification has an unrecognized shape
    #[error("Unrecognized join format: {0}")]
    Format(String),

    #[error("Error during {operation}: missing \"{attribute}\" field")]
    MissingIdentifier {
        operation: &'static str,
        attribute: String,
    },

    /// A row written a moment ago could not be read back
    #[error("No row in {table} with id {id}")]
    NotFound { table: String, id: String },

    #[error("Hook failed: {0}")]
    Hook(String),

    #[error("Custom filter failed: {0}")]
    Filter(String),

    #[error("Query execution error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Model already registered: {0}")]
    ModelAlreadyRegistered(String),

    #[error("Model not found: {0}")]
    ModelNotRegistered(String),
}
