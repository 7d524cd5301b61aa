//! Model construction

use super::filters::{custom_filter, sync_filter, CustomFilter};
use super::hooks::{hook, Hooks};
use super::join::JoinSpec;
use super::{Model, ModelInner};
use crate::debug_log;
use crate::errors::ModelError;
use config::ModelSettings;
use query_executor::{QueryHandle, Record};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

const DEFAULT_ID_ATTRIBUTE: &str = "id";

/// Collects model options; [`ModelBuilder::build`] validates them
#[derive(Default)]
pub struct ModelBuilder {
    connection: Option<query_executor::Connection>,
    table_name: Option<String>,
    columns: Vec<String>,
    joins: Vec<JoinSpec>,
    id_attribute: Option<String>,
    custom_filters: HashMap<String, CustomFilter>,
    hooks: Hooks,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed table, columns, joins and id attribute from a config entry
    pub fn from_settings(settings: &ModelSettings) -> Result<Self, ModelError> {
        let joins = settings
            .joins
            .iter()
            .cloned()
            .map(JoinSpec::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Self::new()
            .table_name(settings.table_name.as_str())
            .columns(settings.columns.iter().cloned())
            .joins(joins);
        if let Some(id_attribute) = &settings.id_attribute {
            builder = builder.id_attribute(id_attribute.as_str());
        }
        Ok(builder)
    }

    pub fn connection(mut self, connection: query_executor::Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Column expressions to select, in order; none selects `table.*`
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn joins<I, J>(mut self, joins: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: Into<JoinSpec>,
    {
        self.joins.extend(joins.into_iter().map(Into::into));
        self
    }

    pub fn join(mut self, join: impl Into<JoinSpec>) -> Self {
        self.joins.push(join.into());
        self
    }

    pub fn id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = Some(id_attribute.into());
        self
    }

    /// Replace default equality filtering for `key` with an async closure
    pub fn custom_filter<F, Fut>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, QueryHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ModelError>> + Send + 'static,
    {
        self.custom_filters.insert(key.into(), custom_filter(f));
        self
    }

    /// Same as [`ModelBuilder::custom_filter`] for filters that never await
    pub fn sync_filter<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &QueryHandle) + Send + Sync + 'static,
    {
        self.custom_filters.insert(key.into(), sync_filter(f));
        self
    }

    /// Register an already boxed filter
    pub fn boxed_filter(mut self, key: impl Into<String>, filter: CustomFilter) -> Self {
        self.custom_filters.insert(key.into(), filter);
        self
    }

    pub fn before_insert<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Record, ModelError>> + Send + 'static,
    {
        self.hooks.before_insert = Some(hook(f));
        self
    }

    pub fn after_insert<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Record, ModelError>> + Send + 'static,
    {
        self.hooks.after_insert = Some(hook(f));
        self
    }

    pub fn before_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Record, ModelError>> + Send + 'static,
    {
        self.hooks.before_update = Some(hook(f));
        self
    }

    pub fn after_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Record, ModelError>> + Send + 'static,
    {
        self.hooks.after_update = Some(hook(f));
        self
    }

    /// Set all four hook slots at once
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<Model, ModelError> {
        let connection = self.connection.ok_or_else(|| {
            ModelError::Configuration("a connection is required".to_string())
        })?;

        let table_name = self
            .table_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ModelError::Configuration("a non-empty table_name is required".to_string())
            })?;

        for join in &self.joins {
            join.validate()?;
        }

        let id_attribute = self
            .id_attribute
            .filter(|attr| !attr.is_empty())
            .unwrap_or_else(|| DEFAULT_ID_ATTRIBUTE.to_string());

        debug_log!(
            "Built model for table '{}' ({} columns, {} joins, {} custom filters, backend {})",
            table_name,
            self.columns.len(),
            self.joins.len(),
            self.custom_filters.len(),
            connection.backend_name()
        );

        Ok(Model {
            inner: Arc::new(ModelInner {
                connection,
                table_name,
                columns: self.columns,
                joins: self.joins,
                id_attribute,
                custom_filters: self.custom_filters,
                hooks: self.hooks,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_executor::{Connection, MemoryExecutor};

    fn connection() -> Connection {
        Connection::new(MemoryExecutor::new().with_table("user"))
    }

    #[test]
    fn test_requires_connection() {
        let err = ModelBuilder::new().table_name("user").build().unwrap_err();
        assert!(matches!(err, ModelError::Configuration(msg) if msg.contains("connection")));
    }

    #[test]
    fn test_requires_table_name() {
        let err = ModelBuilder::new().connection(connection()).build().unwrap_err();
        assert!(matches!(err, ModelError::Configuration(msg) if msg.contains("table_name")));

        let err = ModelBuilder::new()
            .connection(connection())
            .table_name("")
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_defaults() {
        let model = ModelBuilder::new()
            .connection(connection())
            .table_name("user")
            .build()
            .unwrap();
        assert_eq!(model.table_name(), "user");
        assert_eq!(model.id_attribute(), "id");
        assert!(model.columns().is_empty());
        assert!(model.joins().is_empty());
        assert!(!model.has_custom_filter("postId"));
    }

    #[test]
    fn test_malformed_structured_join_rejected_at_build() {
        let err = ModelBuilder::new()
            .connection(connection())
            .table_name("user")
            .join(JoinSpec::equality("post", "", "user.post_id"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = ModelSettings::new("user");
        settings.columns = vec!["user.name".to_string()];
        settings.joins = vec![config::JoinSetting::Raw(
            "JOIN post ON post.id = user.post_id".to_string(),
        )];
        settings.id_attribute = Some("user_id".to_string());

        let model = ModelBuilder::from_settings(&settings)
            .unwrap()
            .connection(connection())
            .build()
            .unwrap();
        assert_eq!(model.columns(), ["user.name".to_string()]);
        assert_eq!(model.joins(), [JoinSpec::raw("JOIN post ON post.id = user.post_id")]);
        assert_eq!(model.id_attribute(), "user_id");
    }
}
