//! Convenience re-exports for common ModelHaus usage
//!
//! # Example
//!
//! ```rust
//! use modelhaus::prelude::*;
//!
//! let filter = record_from([("title", json!("Hello"))]);
//! assert_eq!(filter.len(), 1);
//! ```

// Core ModelHaus components
pub use crate::core::ModelHaus;
pub use crate::errors::ModelError;
pub use crate::model::{
    custom_filter, hook, sync_filter, CustomFilter, Hook, Hooks, JoinSpec, Model, ModelBuilder,
};

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, JoinSetting, ModelSettings};

// Query capability, backends and record helpers
pub use query_executor::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
