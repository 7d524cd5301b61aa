//! Convenience re-exports for common query-executor usage

// Capability and builder
pub use crate::connection::{Connection, QueryExecutor, TableQuery};
pub use crate::handle::QueryHandle;

// Backends
pub use crate::memory::MemoryExecutor;
pub use crate::postgres::PgExecutor;

// Data
pub use crate::record::{is_truthy, record_from, Record};
pub use crate::statement::{Condition, Join, QueryOutput, SelectQuery, Statement};

// Error types
pub use crate::errors::ExecutorError;
pub use crate::validation::{ValidatedIdentifier, ValidationError};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use serde_json::{json, Value};
pub use sqlx::PgPool;
