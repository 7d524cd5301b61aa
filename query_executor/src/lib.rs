//! Query Executor - the query execution capability behind ModelHaus models
//!
//! This crate defines the backend-neutral statement types, the
//! [`QueryExecutor`] trait models run them through, a fluent per-table
//! builder, and two backends: PostgreSQL over `sqlx` and an in-memory one.

pub mod connection;
pub mod errors;
pub mod handle;
pub mod memory;
pub mod postgres;
pub mod prelude;
pub mod record;
pub mod statement;
pub mod validation;

pub use connection::{Connection, QueryExecutor, TableQuery};
pub use errors::ExecutorError;
pub use handle::QueryHandle;
pub use memory::MemoryExecutor;
pub use postgres::PgExecutor;
pub use record::{is_truthy, record_from, Record};
pub use statement::{Condition, Join, QueryOutput, SelectQuery, Statement};
pub use validation::{ValidatedIdentifier, ValidationError};
