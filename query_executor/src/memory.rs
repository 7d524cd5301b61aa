//! In-memory backend
//!
//! Interprets [`Statement`]s against tables held in process. It covers the
//! subset models need: equality and `[INNER|LEFT] JOIN t ON a = b` joins,
//! `t.*` / `col` / `t.col` / `expr AS alias` projections, equality filters,
//! `COUNT`, and auto-increment identifiers.

use crate::connection::QueryExecutor;
use crate::errors::ExecutorError;
use crate::record::Record;
use crate::statement::{split_alias, Condition, Join, QueryOutput, SelectQuery, Statement};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

const BACKEND: &str = "memory";

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Record>,
    next_id: i64,
}

impl MemoryTable {
    fn observe_id(&mut self, value: &Value) {
        if let Some(id) = value.as_i64() {
            self.next_id = self.next_id.max(id);
        }
    }
}

/// [`QueryExecutor`] backed by in-process tables
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

/// One joined row: table name to that table's row (`None` after an
/// unmatched LEFT JOIN)
type Scope = Vec<(String, Option<Record>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty table
    pub fn with_table(self, name: impl Into<String>) -> Self {
        self.with_rows(name, Vec::new())
    }

    /// Declare a table with initial rows; numeric `id`s seed the counter
    pub fn with_rows(mut self, name: impl Into<String>, rows: Vec<Record>) -> Self {
        let table = self.tables.get_mut().entry(name.into()).or_default();
        for row in rows {
            if let Some(id) = row.get("id") {
                table.observe_id(id);
            }
            table.rows.push(row);
        }
        self
    }

    /// Copy of every row currently stored in `table`
    pub async fn rows(&self, table: &str) -> Result<Vec<Record>, ExecutorError> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| ExecutorError::UnknownTable(table.to_string()))
    }

    fn select(
        tables: &HashMap<String, MemoryTable>,
        select: &SelectQuery,
    ) -> Result<Vec<Record>, ExecutorError> {
        let base = lookup(tables, &select.table)?;
        let mut scopes: Vec<Scope> = base
            .rows
            .iter()
            .map(|row| vec![(select.table.clone(), Some(row.clone()))])
            .collect();

        for join in &select.joins {
            let (kind, table, first, second) = parse_join(join)?;
            let joined = lookup(tables, &table)?;
            let mut next = Vec::with_capacity(scopes.len());

            for scope in scopes {
                let mut matched = false;
                for row in &joined.rows {
                    let mut candidate = scope.clone();
                    candidate.push((table.clone(), Some(row.clone())));
                    let left = resolve(&candidate, &first)?;
                    let right = resolve(&candidate, &second)?;
                    if !left.is_null() && values_equal(&left, &right) {
                        matched = true;
                        next.push(candidate);
                    }
                }
                if !matched && kind == JoinKind::Left {
                    let mut candidate = scope;
                    candidate.push((table.clone(), None));
                    next.push(candidate);
                }
            }
            scopes = next;
        }

        let mut records = Vec::new();
        for scope in scopes {
            if matches_all(&scope, &select.conditions)? {
                records.push(project(&scope, &select.columns)?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn execute(&self, statement: Statement) -> Result<QueryOutput, ExecutorError> {
        tracing::debug!("[{}] memory table: {}", statement.kind(), statement.table());

        match statement {
            Statement::Select(select) => {
                let tables = self.tables.read().await;
                Ok(QueryOutput::Rows(Self::select(&tables, &select)?))
            }
            Statement::Count { table, expression } => {
                let tables = self.tables.read().await;
                let rows = &lookup(&tables, &table)?.rows;
                let total = if expression == "*" {
                    rows.len()
                } else {
                    let mut total = 0;
                    for row in rows {
                        let scope = vec![(table.clone(), Some(row.clone()))];
                        if !resolve(&scope, &expression)?.is_null() {
                            total += 1;
                        }
                    }
                    total
                };
                Ok(QueryOutput::Count(total as i64))
            }
            Statement::Insert {
                table,
                record,
                returning,
            } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(&table)
                    .ok_or_else(|| ExecutorError::UnknownTable(table.clone()))?;

                let id = match record.get(&returning) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => {
                        target.next_id += 1;
                        Value::from(target.next_id)
                    }
                };
                target.observe_id(&id);

                let mut row = Record::with_capacity(record.len() + 1);
                row.insert(returning.clone(), id.clone());
                for (column, value) in record {
                    if column != returning {
                        row.insert(column, value);
                    }
                }
                target.rows.push(row);

                Ok(QueryOutput::Inserted(vec![id]))
            }
            Statement::Update {
                table,
                record,
                conditions,
            } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(&table)
                    .ok_or_else(|| ExecutorError::UnknownTable(table.clone()))?;

                let mut affected = 0;
                for row in target.rows.iter_mut() {
                    let scope = vec![(table.clone(), Some(row.clone()))];
                    if matches_all(&scope, &conditions)? {
                        for (column, value) in &record {
                            row.insert(column.clone(), value.clone());
                        }
                        affected += 1;
                    }
                }
                Ok(QueryOutput::Affected(affected))
            }
            Statement::Delete { table, conditions } => {
                let mut tables = self.tables.write().await;
                let target = tables
                    .get_mut(&table)
                    .ok_or_else(|| ExecutorError::UnknownTable(table.clone()))?;

                let mut doomed = Vec::with_capacity(target.rows.len());
                for row in &target.rows {
                    let scope = vec![(table.clone(), Some(row.clone()))];
                    doomed.push(matches_all(&scope, &conditions)?);
                }

                let affected = doomed.iter().filter(|d| **d).count() as u64;
                let mut flags = doomed.into_iter();
                target.rows.retain(|_| !flags.next().unwrap_or(false));
                Ok(QueryOutput::Affected(affected))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        BACKEND
    }
}

fn lookup<'a>(
    tables: &'a HashMap<String, MemoryTable>,
    name: &str,
) -> Result<&'a MemoryTable, ExecutorError> {
    tables
        .get(name)
        .ok_or_else(|| ExecutorError::UnknownTable(name.to_string()))
}

fn parse_join(join: &Join) -> Result<(JoinKind, String, String, String), ExecutorError> {
    match join {
        Join::On {
            table,
            first,
            second,
        } => Ok((JoinKind::Inner, table.clone(), first.clone(), second.clone())),
        Join::Raw(clause) => {
            let tokens: Vec<&str> = clause.split_whitespace().collect();
            let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
            let (kind, rest) = match upper.first().map(String::as_str) {
                Some("JOIN") => (JoinKind::Inner, 1),
                Some("INNER") if upper.get(1).map(String::as_str) == Some("JOIN") => {
                    (JoinKind::Inner, 2)
                }
                Some("LEFT") if upper.get(1).map(String::as_str) == Some("JOIN") => {
                    (JoinKind::Left, 2)
                }
                _ => return Err(unsupported_join(clause)),
            };

            // <table> ON <first> = <second>
            match (&tokens[rest..], &upper[rest..]) {
                ([table, _, first, "=", second], [_, on, ..]) if on == "ON" => Ok((
                    kind,
                    table.to_string(),
                    first.to_string(),
                    second.to_string(),
                )),
                _ => Err(unsupported_join(clause)),
            }
        }
    }
}

fn unsupported_join(clause: &str) -> ExecutorError {
    ExecutorError::unsupported(BACKEND, format!("join clause '{}'", clause))
}

/// Resolve `t.col` or bare `col` against a joined row
fn resolve(scope: &Scope, column: &str) -> Result<Value, ExecutorError> {
    match column.split_once('.') {
        Some((table, name)) => {
            let (_, row) = scope
                .iter()
                .find(|(t, _)| t == table)
                .ok_or_else(|| ExecutorError::UnknownColumn(column.to_string()))?;
            Ok(row
                .as_ref()
                .and_then(|r| r.get(name))
                .cloned()
                .unwrap_or(Value::Null))
        }
        None => Ok(scope
            .iter()
            .filter_map(|(_, row)| row.as_ref())
            .find_map(|row| row.get(column))
            .cloned()
            .unwrap_or(Value::Null)),
    }
}

fn matches_all(scope: &Scope, conditions: &[Condition]) -> Result<bool, ExecutorError> {
    for condition in conditions {
        match condition {
            Condition::Eq { column, value } => {
                let actual = resolve(scope, column)?;
                let matched = if value.is_null() {
                    actual.is_null()
                } else {
                    values_equal(&actual, value)
                };
                if !matched {
                    return Ok(false);
                }
            }
            Condition::Raw { sql, .. } => {
                return Err(ExecutorError::unsupported(
                    BACKEND,
                    format!("raw condition '{}'", sql),
                ));
            }
        }
    }
    Ok(true)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => left == right,
    }
}

fn project(scope: &Scope, columns: &[String]) -> Result<Record, ExecutorError> {
    let mut record = Record::new();

    if columns.is_empty() {
        if let Some((_, Some(row))) = scope.first() {
            record.extend(row.clone());
        }
        return Ok(record);
    }

    for expression in columns {
        let (source, alias) = split_alias(expression);

        if source == "*" {
            for row in scope.iter().filter_map(|(_, row)| row.as_ref()) {
                record.extend(row.clone());
            }
            continue;
        }

        if let Some(table) = source.strip_suffix(".*") {
            let (_, row) = scope
                .iter()
                .find(|(t, _)| t == table)
                .ok_or_else(|| ExecutorError::UnknownTable(table.to_string()))?;
            if let Some(row) = row {
                record.extend(row.clone());
            }
            continue;
        }

        let value = resolve(scope, source)?;
        let key = alias.unwrap_or_else(|| source.rsplit('.').next().unwrap_or(source));
        record.insert(key.to_string(), value);
    }

    Ok(record)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record_from;
    use serde_json::json;

    fn seeded() -> MemoryExecutor {
        MemoryExecutor::new()
            .with_rows(
                "post",
                vec![record_from([("id", json!(1)), ("title", json!("Some cool title"))])],
            )
            .with_rows(
                "user",
                vec![
                    record_from([("id", json!(1)), ("name", json!("John")), ("post_id", json!(1))]),
                    record_from([("id", json!(2)), ("name", json!("Ann")), ("post_id", json!(9))]),
                ],
            )
    }

    #[tokio::test]
    async fn test_select_with_equality_join_and_alias() {
        let executor = seeded();
        let mut select = SelectQuery::new("user");
        select.columns = vec!["user.name".into(), "post.title as post_title".into()];
        select.joins = vec![Join::on("post", "post.id", "user.post_id")];

        let rows = match executor.execute(Statement::Select(select)).await.unwrap() {
            QueryOutput::Rows(rows) => rows,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], record_from([("name", json!("John")), ("post_title", json!("Some cool title"))]));
    }

    #[tokio::test]
    async fn test_left_join_keeps_unmatched_rows() {
        let executor = seeded();
        let mut select = SelectQuery::new("user");
        select.columns = vec!["user.id".into(), "post.title".into()];
        select.joins = vec![Join::Raw("LEFT JOIN post ON post.id = user.post_id".into())];

        let rows = match executor.execute(Statement::Select(select)).await.unwrap() {
            QueryOutput::Rows(rows) => rows,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("title"), Some(&json!(null)));
    }

    #[tokio::test]
    async fn test_unparseable_raw_join() {
        let executor = seeded();
        let mut select = SelectQuery::new("user");
        select.joins = vec![Join::Raw("NATURAL JOIN post".into())];
        let err = executor.execute(Statement::Select(select)).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn test_insert_assigns_next_id_after_seeded_rows() {
        let executor = seeded();
        let output = executor
            .execute(Statement::Insert {
                table: "user".into(),
                record: record_from([("name", json!("James"))]),
                returning: "id".into(),
            })
            .await
            .unwrap();
        assert_eq!(output, QueryOutput::Inserted(vec![json!(3)]));
    }

    #[tokio::test]
    async fn test_update_delete_and_count() {
        let executor = seeded();

        let updated = executor
            .execute(Statement::Update {
                table: "user".into(),
                record: record_from([("name", json!("Josh"))]),
                conditions: vec![Condition::eq("id", json!(2))],
            })
            .await
            .unwrap();
        assert_eq!(updated, QueryOutput::Affected(1));
        assert_eq!(executor.rows("user").await.unwrap()[1].get("name"), Some(&json!("Josh")));

        let deleted = executor
            .execute(Statement::Delete {
                table: "user".into(),
                conditions: vec![Condition::eq("id", json!(42))],
            })
            .await
            .unwrap();
        assert_eq!(deleted, QueryOutput::Affected(0));

        let count = executor
            .execute(Statement::Count {
                table: "user".into(),
                expression: "*".into(),
            })
            .await
            .unwrap();
        assert_eq!(count, QueryOutput::Count(2));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let executor = MemoryExecutor::new();
        let err = executor
            .execute(Statement::Select(SelectQuery::new("missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::UnknownTable(name) if name == "missing"));
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("user.name as name"), ("user.name", Some("name")));
        assert_eq!(split_alias("post.title AS post_title"), ("post.title", Some("post_title")));
        assert_eq!(split_alias("user.*"), ("user.*", None));
    }
}
