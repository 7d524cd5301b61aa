//! PostgreSQL SQL generation
//!
//! Turns [`Statement`]s into SQL text with `$n` placeholders and the
//! values to bind, in placeholder order. Each value also records the
//! column it is written to or compared with, when there is one, so the
//! executor can bind it with that column's type.

use crate::errors::ExecutorError;
use crate::statement::{split_alias, Condition, Join, SelectQuery, Statement};
use crate::validation::ValidatedIdentifier;
use serde_json::Value;

const BACKEND: &str = "postgres";

/// Column a parameter is written to or compared with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamTarget {
    pub table: String,
    pub column: String,
}

/// SQL text plus its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
    /// Parallel to `params`; `None` for raw bindings
    pub targets: Vec<Option<ParamTarget>>,
}

/// Parameters collected while rendering
#[derive(Default)]
struct ParamList {
    values: Vec<Value>,
    targets: Vec<Option<ParamTarget>>,
}

impl ParamList {
    /// Append a value and return its placeholder
    fn push(&mut self, value: Value, target: Option<ParamTarget>) -> String {
        self.values.push(value);
        self.targets.push(target);
        format!("${}", self.values.len())
    }

    fn finish(self, sql: String) -> RenderedSql {
        RenderedSql {
            sql,
            params: self.values,
            targets: self.targets,
        }
    }
}

fn target(table: &str, column: &str) -> Option<ParamTarget> {
    Some(ParamTarget {
        table: table.to_string(),
        column: column.to_string(),
    })
}

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn render(statement: &Statement) -> Result<RenderedSql, ExecutorError> {
        match statement {
            Statement::Select(select) => Self::render_select(select),
            Statement::Count { table, expression } => Self::render_count(table, expression),
            Statement::Insert {
                table,
                record,
                returning,
            } => {
                let quoted_table = ValidatedIdentifier::bare(table)?.quoted();
                let returning = ValidatedIdentifier::bare(returning)?.quoted();
                let mut params = ParamList::default();

                if record.is_empty() {
                    return Ok(params.finish(format!(
                        "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                        quoted_table, returning
                    )));
                }

                let mut columns = Vec::with_capacity(record.len());
                let mut placeholders = Vec::with_capacity(record.len());
                for (column, value) in record {
                    columns.push(ValidatedIdentifier::bare(column)?.quoted());
                    placeholders.push(params.push(value.clone(), target(table, column)));
                }

                Ok(params.finish(format!(
                    "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                    quoted_table,
                    columns.join(", "),
                    placeholders.join(", "),
                    returning
                )))
            }
            Statement::Update {
                table,
                record,
                conditions,
            } => {
                if record.is_empty() {
                    return Err(ExecutorError::unsupported(
                        BACKEND,
                        "update without any column to set",
                    ));
                }

                let quoted_table = ValidatedIdentifier::bare(table)?.quoted();
                let mut params = ParamList::default();

                // SET placeholders come first, WHERE placeholders continue the numbering
                let mut assignments = Vec::with_capacity(record.len());
                for (column, value) in record {
                    let quoted = ValidatedIdentifier::bare(column)?.quoted();
                    let placeholder = params.push(value.clone(), target(table, column));
                    assignments.push(format!("{} = {}", quoted, placeholder));
                }

                let where_clause = Self::build_where_clause(table, conditions, &mut params)?;

                Ok(params.finish(format!(
                    "UPDATE {} SET {}{}",
                    quoted_table,
                    assignments.join(", "),
                    where_clause
                )))
            }
            Statement::Delete { table, conditions } => {
                let quoted_table = ValidatedIdentifier::bare(table)?.quoted();
                let mut params = ParamList::default();
                let where_clause = Self::build_where_clause(table, conditions, &mut params)?;

                Ok(params.finish(format!("DELETE FROM {}{}", quoted_table, where_clause)))
            }
        }
    }

    fn render_select(select: &SelectQuery) -> Result<RenderedSql, ExecutorError> {
        let table = ValidatedIdentifier::bare(&select.table)?.quoted();

        let projection = if select.columns.is_empty() {
            format!("{}.*", table)
        } else {
            select
                .columns
                .iter()
                .map(|column| Self::build_select_field(column))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = String::with_capacity(64 + projection.len());
        sql.push_str("SELECT ");
        sql.push_str(&projection);
        sql.push_str(" FROM ");
        sql.push_str(&table);

        for join in &select.joins {
            sql.push(' ');
            sql.push_str(&Self::build_join_clause(join)?);
        }

        let mut params = ParamList::default();
        sql.push_str(&Self::build_where_clause(
            &select.table,
            &select.conditions,
            &mut params,
        )?);

        Ok(params.finish(sql))
    }

    /// Quote `t.*`, `col`, `t.col` and their aliases; anything else, such
    /// as a function call, is passed through
    fn build_select_field(expression: &str) -> String {
        let (source, alias) = split_alias(expression);

        let source = if source == "*" {
            source.to_string()
        } else if let Some(table) = source.strip_suffix(".*") {
            match ValidatedIdentifier::bare(table) {
                Ok(table) => format!("{}.*", table.quoted()),
                Err(_) => source.to_string(),
            }
        } else {
            ValidatedIdentifier::new(source)
                .map(|column| column.quoted())
                .unwrap_or_else(|_| source.to_string())
        };

        match alias {
            Some(alias) => {
                let alias = ValidatedIdentifier::bare(alias)
                    .map(|alias| alias.quoted())
                    .unwrap_or_else(|_| alias.to_string());
                format!("{} AS {}", source, alias)
            }
            None => source,
        }
    }

    fn render_count(table: &str, expression: &str) -> Result<RenderedSql, ExecutorError> {
        let table = ValidatedIdentifier::bare(table)?.quoted();
        let expression = if expression == "*" {
            "*".to_string()
        } else {
            ValidatedIdentifier::new(expression)?.quoted()
        };

        Ok(ParamList::default().finish(format!(
            "SELECT COUNT({}) AS c FROM {}",
            expression, table
        )))
    }

    fn build_join_clause(join: &Join) -> Result<String, ExecutorError> {
        match join {
            Join::Raw(clause) => Ok(clause.clone()),
            Join::On {
                table,
                first,
                second,
            } => Ok(format!(
                "INNER JOIN {} ON {} = {}",
                ValidatedIdentifier::bare(table)?.quoted(),
                ValidatedIdentifier::new(first)?.quoted(),
                ValidatedIdentifier::new(second)?.quoted()
            )),
        }
    }

    /// Build ` WHERE ...` (leading space) or an empty string. Unqualified
    /// columns belong to `table`.
    fn build_where_clause(
        table: &str,
        conditions: &[Condition],
        params: &mut ParamList,
    ) -> Result<String, ExecutorError> {
        if conditions.is_empty() {
            return Ok(String::new());
        }

        let mut parts = Vec::with_capacity(conditions.len());
        for condition in conditions {
            parts.push(Self::build_condition_sql(table, condition, params)?);
        }

        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    fn build_condition_sql(
        table: &str,
        condition: &Condition,
        params: &mut ParamList,
    ) -> Result<String, ExecutorError> {
        match condition {
            Condition::Eq { column, value } => {
                let column = ValidatedIdentifier::new(column)?;
                if value.is_null() {
                    return Ok(format!("{} IS NULL", column.quoted()));
                }
                let owner = column.qualifier().unwrap_or(table);
                let placeholder = params.push(value.clone(), target(owner, column.name()));
                Ok(format!("{} = {}", column.quoted(), placeholder))
            }
            Condition::Raw { sql, bindings } => {
                let expected = sql.matches('?').count();
                if expected != bindings.len() {
                    return Err(ExecutorError::unsupported(
                        BACKEND,
                        format!(
                            "raw condition '{}' has {} placeholders but {} bindings",
                            sql,
                            expected,
                            bindings.len()
                        ),
                    ));
                }

                let mut bindings = bindings.iter();
                let mut rendered = String::with_capacity(sql.len() + 4 * expected);
                for c in sql.chars() {
                    if c == '?' {
                        if let Some(value) = bindings.next() {
                            rendered.push_str(&params.push(value.clone(), None));
                            continue;
                        }
                    }
                    rendered.push(c);
                }
                Ok(format!("({})", rendered))
            }
        }
    }
}
