//! The query execution capability
//!
//! [`QueryExecutor`] is the seam between models and storage. [`Connection`]
//! wraps an executor in a cheap, cloneable handle and offers a fluent
//! per-table builder in the usual `select / where / join` shape.

use crate::errors::ExecutorError;
use crate::record::Record;
use crate::statement::{Condition, Join, QueryOutput, SelectQuery, Statement};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A backend able to run [`Statement`]s
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute one statement
    async fn execute(&self, statement: Statement) -> Result<QueryOutput, ExecutorError>;

    /// Short backend name used in logs and errors
    fn backend_name(&self) -> &'static str;
}

/// Shared handle to a [`QueryExecutor`]
#[derive(Clone)]
pub struct Connection {
    executor: Arc<dyn QueryExecutor>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.executor.backend_name())
            .finish()
    }
}

impl Connection {
    pub fn new<E: QueryExecutor + 'static>(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
        }
    }

    pub fn from_arc(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    pub fn backend_name(&self) -> &'static str {
        self.executor.backend_name()
    }

    /// Start a query against `table`
    pub fn table(&self, table: impl Into<String>) -> TableQuery {
        TableQuery {
            connection: self.clone(),
            select: SelectQuery::new(table),
        }
    }

    /// Run a prepared statement
    pub async fn execute(&self, statement: Statement) -> Result<QueryOutput, ExecutorError> {
        self.executor.execute(statement).await
    }

    /// Run a select and return its rows
    pub async fn fetch_all(&self, select: SelectQuery) -> Result<Vec<Record>, ExecutorError> {
        match self.execute(Statement::Select(select)).await? {
            QueryOutput::Rows(rows) => Ok(rows),
            other => Err(unexpected("rows", &other)),
        }
    }
}

fn unexpected(expected: &'static str, actual: &QueryOutput) -> ExecutorError {
    ExecutorError::UnexpectedOutput {
        expected,
        actual: actual.kind(),
    }
}

/// Fluent builder for one table
///
/// ```rust,no_run
/// # use query_executor::{Connection, MemoryExecutor};
/// # use serde_json::json;
/// # async fn demo() -> Result<(), query_executor::ExecutorError> {
/// let connection = Connection::new(MemoryExecutor::new());
/// let rows = connection
///     .table("user")
///     .select(["user.name", "post.title as post_title"])
///     .join("post", "post.id", "user.post_id")
///     .where_eq("user.id", json!(1))
///     .fetch_all()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TableQuery {
    connection: Connection,
    select: SelectQuery,
}

impl TableQuery {
    pub fn table_name(&self) -> &str {
        &self.select.table
    }

    /// Add column expressions to the projection
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add `column = value`
    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.select.conditions.push(Condition::eq(column, value));
        self
    }

    /// Add a raw predicate; `?` marks each binding
    pub fn where_raw(mut self, sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        self.select.conditions.push(Condition::raw(sql, bindings));
        self
    }

    /// Add `JOIN table ON first = second`
    pub fn join(
        mut self,
        table: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        self.select.joins.push(Join::on(table, first, second));
        self
    }

    /// Add a join clause verbatim
    pub fn join_raw(mut self, clause: impl Into<String>) -> Self {
        self.select.joins.push(Join::Raw(clause.into()));
        self
    }

    /// The select as built so far
    pub fn into_select(self) -> SelectQuery {
        self.select
    }

    pub async fn fetch_all(self) -> Result<Vec<Record>, ExecutorError> {
        let Self { connection, select } = self;
        connection.fetch_all(select).await
    }

    pub async fn first(self) -> Result<Option<Record>, ExecutorError> {
        Ok(self.fetch_all().await?.into_iter().next())
    }

    /// `COUNT(expression)` over the whole table
    pub async fn count(self, expression: impl Into<String>) -> Result<i64, ExecutorError> {
        let statement = Statement::Count {
            table: self.select.table,
            expression: expression.into(),
        };
        match self.connection.execute(statement).await? {
            QueryOutput::Count(total) => Ok(total),
            other => Err(unexpected("count", &other)),
        }
    }

    /// Insert one row and return the generated values of `returning`
    pub async fn insert(
        self,
        record: Record,
        returning: impl Into<String>,
    ) -> Result<Vec<Value>, ExecutorError> {
        let statement = Statement::Insert {
            table: self.select.table,
            record,
            returning: returning.into(),
        };
        match self.connection.execute(statement).await? {
            QueryOutput::Inserted(ids) => Ok(ids),
            other => Err(unexpected("inserted", &other)),
        }
    }

    /// Set every field of `record` on the rows matching the where clauses
    pub async fn update(self, record: Record) -> Result<u64, ExecutorError> {
        let statement = Statement::Update {
            table: self.select.table,
            record,
            conditions: self.select.conditions,
        };
        match self.connection.execute(statement).await? {
            QueryOutput::Affected(rows) => Ok(rows),
            other => Err(unexpected("affected", &other)),
        }
    }

    /// Delete the rows matching the where clauses
    pub async fn delete(self) -> Result<u64, ExecutorError> {
        let statement = Statement::Delete {
            table: self.select.table,
            conditions: self.select.conditions,
        };
        match self.connection.execute(statement).await? {
            QueryOutput::Affected(rows) => Ok(rows),
            other => Err(unexpected("affected", &other)),
        }
    }
}
