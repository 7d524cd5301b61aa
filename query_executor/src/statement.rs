//! Statement types
//!
//! Backend-neutral descriptions of the queries a model issues. Backends
//! render or interpret these; nothing here touches a database.

use crate::record::Record;
use serde_json::Value;

/// Single condition in a WHERE clause. Conditions are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq { column: String, value: Value },
    /// Raw SQL fragment; `?` marks each binding in order
    Raw { sql: String, bindings: Vec<Value> },
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::Eq {
            column: column.into(),
            value,
        }
    }

    pub fn raw(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self::Raw {
            sql: sql.into(),
            bindings,
        }
    }
}

/// A JOIN applied to a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Join {
    /// Clause injected verbatim, e.g. `JOIN post ON post.id = user.post_id`
    Raw(String),
    /// `JOIN table ON first = second`
    On {
        table: String,
        first: String,
        second: String,
    },
}

impl Join {
    pub fn on(
        table: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::On {
            table: table.into(),
            first: first.into(),
            second: second.into(),
        }
    }
}

/// A SELECT against one table plus joins
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// Column expressions; empty selects every column
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub conditions: Vec<Condition>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
        }
    }
}

/// Split `expr AS alias` (case-insensitive) into its parts
pub(crate) fn split_alias(expression: &str) -> (&str, Option<&str>) {
    let lower = expression.to_ascii_lowercase();
    match lower.rfind(" as ") {
        Some(at) => (expression[..at].trim(), Some(expression[at + 4..].trim())),
        None => (expression.trim(), None),
    }
}

/// Everything a [`crate::QueryExecutor`] can be asked to run
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectQuery),
    Count {
        table: String,
        expression: String,
    },
    Insert {
        table: String,
        record: Record,
        /// Column whose generated value is reported back
        returning: String,
    },
    Update {
        table: String,
        record: Record,
        conditions: Vec<Condition>,
    },
    Delete {
        table: String,
        conditions: Vec<Condition>,
    },
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Statement::Select(select) => &select.table,
            Statement::Count { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. } => table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Count { .. } => "count",
            Statement::Insert { .. } => "insert",
            Statement::Update { .. } => "update",
            Statement::Delete { .. } => "delete",
        }
    }
}

/// Result of executing a [`Statement`]
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<Record>),
    Count(i64),
    /// Generated identifiers, in insertion order
    Inserted(Vec<Value>),
    /// Number of rows touched by an update or delete
    Affected(u64),
}

impl QueryOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryOutput::Rows(_) => "rows",
            QueryOutput::Count(_) => "count",
            QueryOutput::Inserted(_) => "inserted",
            QueryOutput::Affected(_) => "affected",
        }
    }
}
