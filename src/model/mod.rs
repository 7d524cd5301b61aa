//! Table-bound record access
//!
//! A [`Model`] binds one table to a [`Connection`] and offers generic CRUD
//! over untyped [`Record`]s. Concrete models wrap a `Model` and add their
//! own methods on top of [`Model::find`] or [`Model::connection`].
//!
//! ```rust,no_run
//! use modelhaus::prelude::*;
//!
//! struct PostModel {
//!     model: Model,
//! }
//!
//! impl PostModel {
//!     async fn find_by_title(&self, title: &str) -> Result<Vec<Record>, ModelError> {
//!         self.model.find(record_from([("title", json!(title))])).await
//!     }
//! }
//! ```

pub mod builder;
pub mod filters;
pub mod hooks;
pub mod join;

pub use builder::ModelBuilder;
pub use filters::{custom_filter, sync_filter, CustomFilter};
pub use hooks::{hook, Hook, Hooks};
pub use join::JoinSpec;

use crate::errors::ModelError;
use crate::{debug_log, trace_log};
use futures::future::try_join_all;
use hooks::run_hook;
use query_executor::{is_truthy, Connection, QueryHandle, Record, SelectQuery};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Generic record access for one table. Cheap to clone.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

struct ModelInner {
    connection: Connection,
    table_name: String,
    columns: Vec<String>,
    joins: Vec<JoinSpec>,
    id_attribute: String,
    custom_filters: HashMap<String, CustomFilter>,
    hooks: Hooks,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<&String> = self.inner.custom_filters.keys().collect();
        filters.sort();
        f.debug_struct("Model")
            .field("table_name", &self.inner.table_name)
            .field("columns", &self.inner.columns)
            .field("joins", &self.inner.joins)
            .field("id_attribute", &self.inner.id_attribute)
            .field("custom_filters", &filters)
            .field("hooks", &self.inner.hooks)
            .field("connection", &self.inner.connection)
            .finish()
    }
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    /// The query capability, for methods layered on top of the model
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    pub fn id_attribute(&self) -> &str {
        &self.inner.id_attribute
    }

    pub fn columns(&self) -> &[String] {
        &self.inner.columns
    }

    pub fn joins(&self) -> &[JoinSpec] {
        &self.inner.joins
    }

    pub fn has_custom_filter(&self, key: &str) -> bool {
        self.inner.custom_filters.contains_key(key)
    }

    /// `COUNT(column)` over the whole table
    pub async fn count(&self, column: &str) -> Result<i64, ModelError> {
        let total = self
            .connection()
            .table(self.table_name())
            .count(column)
            .await?;
        debug_log!("[count] {}: {} -> {}", self.table_name(), column, total);
        Ok(total)
    }

    /// `COUNT(*)` over the whole table
    pub async fn count_all(&self) -> Result<i64, ModelError> {
        self.count("*").await
    }

    /// Rows matching every entry of `filter`.
    ///
    /// Keys with a custom filter are handed to it; every other key becomes
    /// `table.key = value`. Custom filters run concurrently and all finish
    /// before the query executes.
    pub async fn find(&self, filter: Record) -> Result<Vec<Record>, ModelError> {
        let select = self.compose_select(filter).await?;
        trace_log!("[find] {:?}", select);
        let rows = self.connection().fetch_all(select).await?;
        debug_log!("[find] {}: {} rows", self.table_name(), rows.len());
        Ok(rows)
    }

    async fn compose_select(&self, filter: Record) -> Result<SelectQuery, ModelError> {
        let table = self.table_name();
        let mut select = SelectQuery::new(table);

        if self.inner.columns.is_empty() {
            select.columns.push(format!("{}.*", table));
        } else {
            select.columns.extend(self.inner.columns.iter().cloned());
        }

        for join in &self.inner.joins {
            join.validate()?;
            select.joins.push(join.to_join());
        }

        let handle = QueryHandle::new(select);
        let mut pending = Vec::new();

        for (key, value) in filter {
            match self.inner.custom_filters.get(&key) {
                Some(custom) => pending.push(custom(value, handle.clone())),
                None => {
                    handle.where_eq(format!("{}.{}", table, key), value);
                }
            }
        }

        try_join_all(pending).await?;
        Ok(handle.into_select())
    }

    /// First row whose id attribute equals `id`
    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>, ModelError> {
        let mut filter = Record::new();
        filter.insert(self.id_attribute().to_string(), id.into());
        Ok(self.find(filter).await?.into_iter().next())
    }

    /// Insert `record` and return the row as stored, after the hooks ran.
    ///
    /// `before_insert` shapes what is written; `after_insert` only shapes
    /// the returned value.
    pub async fn insert(&self, record: Record) -> Result<Record, ModelError> {
        let record = run_hook(&self.inner.hooks.before_insert, record).await?;

        let generated = self
            .connection()
            .table(self.table_name())
            .insert(record, self.id_attribute())
            .await?;
        let id = generated
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::NotFound {
                table: self.table_name().to_string(),
                id: Value::Null.to_string(),
            })?;
        debug_log!("[insert] {}: generated {} = {}", self.table_name(), self.id_attribute(), id);

        let saved = self.refetch(id).await?;
        run_hook(&self.inner.hooks.after_insert, saved).await
    }

    /// Write every field of `record` to the row it identifies and return
    /// the row as stored, after the hooks ran.
    pub async fn update(&self, record: Record) -> Result<Record, ModelError> {
        let id = self.identifier_of(&record, "update")?;

        let record = run_hook(&self.inner.hooks.before_update, record).await?;

        let affected = self
            .connection()
            .table(self.table_name())
            .where_eq(self.id_attribute(), id.clone())
            .update(record)
            .await?;
        debug_log!("[update] {}: {} = {} ({} rows)", self.table_name(), self.id_attribute(), id, affected);

        let updated = self.refetch(id).await?;
        run_hook(&self.inner.hooks.after_update, updated).await
    }

    /// `update` when the record carries an identifier, `insert` otherwise
    pub async fn upsert(&self, record: Record) -> Result<Record, ModelError> {
        let has_id = record
            .get(self.id_attribute())
            .map(is_truthy)
            .unwrap_or(false);

        if has_id {
            self.update(record).await
        } else {
            self.insert(record).await
        }
    }

    /// Delete every row whose id attribute equals `id`.
    ///
    /// Returns `true` once the delete ran, whether or not a row matched.
    pub async fn remove(&self, id: impl Into<Value>) -> Result<bool, ModelError> {
        let id = id.into();
        if !is_truthy(&id) {
            return Err(self.missing_identifier("remove"));
        }

        let affected = self
            .connection()
            .table(self.table_name())
            .where_eq(self.id_attribute(), id.clone())
            .delete()
            .await?;
        debug_log!("[remove] {}: {} = {} ({} rows)", self.table_name(), self.id_attribute(), id, affected);

        Ok(true)
    }

    fn identifier_of(&self, record: &Record, operation: &'static str) -> Result<Value, ModelError> {
        record
            .get(self.id_attribute())
            .filter(|id| is_truthy(id))
            .cloned()
            .ok_or_else(|| self.missing_identifier(operation))
    }

    fn missing_identifier(&self, operation: &'static str) -> ModelError {
        ModelError::MissingIdentifier {
            operation,
            attribute: self.id_attribute().to_string(),
        }
    }

    async fn refetch(&self, id: Value) -> Result<Record, ModelError> {
        match self.find_by_id(id.clone()).await? {
            Some(record) => Ok(record),
            None => Err(ModelError::NotFound {
                table: self.table_name().to_string(),
                id: id.to_string(),
            }),
        }
    }
}
