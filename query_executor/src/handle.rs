//! Shared in-progress select
//!
//! Custom filters run concurrently and each gets a clone of the same
//! [`QueryHandle`]. Every method takes the lock for the duration of one
//! synchronous edit, so no lock is ever held across an await.

use crate::statement::{Condition, Join, SelectQuery};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct QueryHandle {
    inner: Arc<Mutex<SelectQuery>>,
}

impl QueryHandle {
    pub fn new(select: SelectQuery) -> Self {
        Self {
            inner: Arc::new(Mutex::new(select)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SelectQuery> {
        // Every edit is a single push, so a poisoned select is still whole
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn table_name(&self) -> String {
        self.lock().table.clone()
    }

    /// Add `column = value`
    pub fn where_eq(&self, column: impl Into<String>, value: Value) -> &Self {
        self.lock().conditions.push(Condition::eq(column, value));
        self
    }

    /// Add a raw predicate; `?` marks each binding
    pub fn where_raw(&self, sql: impl Into<String>, bindings: Vec<Value>) -> &Self {
        self.lock().conditions.push(Condition::raw(sql, bindings));
        self
    }

    /// Add `JOIN table ON first = second`
    pub fn join(
        &self,
        table: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> &Self {
        self.lock().joins.push(Join::on(table, first, second));
        self
    }

    /// Add a join clause verbatim
    pub fn join_raw(&self, clause: impl Into<String>) -> &Self {
        self.lock().joins.push(Join::Raw(clause.into()));
        self
    }

    /// Add a column expression to the projection
    pub fn select(&self, column: impl Into<String>) -> &Self {
        self.lock().columns.push(column.into());
        self
    }

    /// Copy of the select as it stands
    pub fn snapshot(&self) -> SelectQuery {
        self.lock().clone()
    }

    /// Take the finished select out of the handle
    pub fn into_select(self) -> SelectQuery {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            // A filter kept a clone alive; fall back to copying
            Err(shared) => shared
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone(),
        }
    }
}
