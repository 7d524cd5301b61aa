//! Core ModelHaus functionality
//!
//! [`ModelHaus`] owns the shared [`Connection`], hands out model builders
//! bound to it, and keeps a name-keyed registry of built models.

use query_executor::{Connection, PgExecutor};
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;

use crate::debug_log;
use crate::errors::ModelError;
use crate::model::{Model, ModelBuilder};
use config::{AppConfig, DatabaseConfig, ModelSettings};

/// Main ModelHaus coordinator that manages the connection and registered models
pub struct ModelHaus {
    connection: Connection,
    pool: Option<PgPool>,
    models: HashMap<String, Model>,
}

impl ModelHaus {
    /// Create new ModelHaus with a PostgreSQL pool
    pub async fn new(config: DatabaseConfig) -> Result<Self, ModelError> {
        let connection_string = config.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds));

        if config.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(config.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        debug_log!(
            "Connected to {}:{}/{} (pool {}..{})",
            config.host,
            config.port,
            config.database,
            config.min_connections,
            config.max_connections
        );

        Ok(Self {
            connection: Connection::new(PgExecutor::new(pool.clone())),
            pool: Some(pool),
            models: HashMap::new(),
        })
    }

    /// Connect and register every model declared under `[models]`
    pub async fn from_config(config: &AppConfig) -> Result<Self, ModelError> {
        let mut haus = Self::new(config.database.clone()).await?;
        haus.register_declared(config)?;
        Ok(haus)
    }

    /// Run over any backend, such as [`query_executor::MemoryExecutor`]
    pub fn with_connection(connection: Connection) -> Self {
        Self {
            connection,
            pool: None,
            models: HashMap::new(),
        }
    }

    /// Register every model declared under `[models]`, keyed by its entry name
    pub fn register_declared(&mut self, config: &AppConfig) -> Result<(), ModelError> {
        let mut names: Vec<&String> = config.models.keys().collect();
        names.sort();
        for name in names {
            let model = self.model_from_settings(&config.models[name])?.build()?;
            self.register_model(name.clone(), model)?;
        }
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Get database pool reference; `None` when built over another backend
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Builder for `table`, already bound to this connection
    pub fn model(&self, table_name: impl Into<String>) -> ModelBuilder {
        Model::builder()
            .connection(self.connection.clone())
            .table_name(table_name)
    }

    /// Builder seeded from a config entry, already bound to this connection
    pub fn model_from_settings(&self, settings: &ModelSettings) -> Result<ModelBuilder, ModelError> {
        Ok(ModelBuilder::from_settings(settings)?.connection(self.connection.clone()))
    }

    /// Register a model with a given name
    pub fn register_model(&mut self, name: String, model: Model) -> Result<(), ModelError> {
        if self.models.contains_key(&name) {
            return Err(ModelError::ModelAlreadyRegistered(name));
        }

        debug_log!("Registered model '{}' for table '{}'", name, model.table_name());
        self.models.insert(name, model);
        Ok(())
    }

    /// Get a registered model by name
    pub fn get_model(&self, name: &str) -> Result<&Model, ModelError> {
        self.models
            .get(name)
            .ok_or_else(|| ModelError::ModelNotRegistered(name.to_string()))
    }

    /// List all registered model names
    pub fn list_models(&self) -> Vec<&String> {
        self.models.keys().collect()
    }

    /// Remove a model by name
    pub fn unregister_model(&mut self, name: &str) -> Result<Model, ModelError> {
        self.models
            .remove(name)
            .ok_or_else(|| ModelError::ModelNotRegistered(name.to_string()))
    }

    /// Check database connection health; always passes without a pool
    pub async fn health_check(&self) -> Result<(), ModelError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}
