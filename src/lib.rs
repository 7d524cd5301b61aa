//! # ModelHaus
//!
//! Active-record style models over a pluggable query executor. A [`Model`]
//! binds one table and offers `find`, `find_by_id`, `insert`, `update`,
//! `upsert`, `remove` and `count` on untyped records, with custom filters,
//! declared joins and before/after write hooks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use modelhaus::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::new(
//!         "localhost".to_string(), 5432, "blog".to_string(),
//!         "postgres".to_string(), "password".to_string(),
//!         1, 5, 30, 600, 3600,
//!     );
//!
//!     let haus = ModelHaus::new(config).await?;
//!
//!     let users = haus
//!         .model("user")
//!         .join(JoinSpec::equality("post", "post.id", "user.post_id"))
//!         .columns(["user.name", "post.title AS post_title"])
//!         .build()?;
//!
//!     let created = users.insert(record_from([("name", json!("Ada"))])).await?;
//!     println!("Created user: {}", created["name"]);
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only log when the `debug-logging` feature is enabled; otherwise
/// the arguments are still type-checked but never formatted
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        if false {
            let _ = format_args!($($arg)*);
        }
    };
}

pub mod core;
pub mod errors;
pub mod model;
pub mod prelude;

// Re-export the main public types for convenience
pub use core::ModelHaus;
pub use errors::ModelError;
pub use model::{Hook, Hooks, JoinSpec, Model, ModelBuilder};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, JoinSetting, ModelSettings};

// Re-export the executor crate models run through
pub use query_executor;

// Re-export external dependencies used in public API
pub use sqlx;
pub use async_trait;
