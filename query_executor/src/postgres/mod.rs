//! PostgreSQL backend over a `sqlx` pool

pub mod binding;
pub mod sql_generation;

pub use sql_generation::{ParamTarget, RenderedSql, SqlGenerator};

use crate::connection::QueryExecutor;
use crate::errors::ExecutorError;
use crate::statement::{QueryOutput, Statement};
use async_trait::async_trait;
use binding::{bind_json_param, first_column, row_to_record};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Column name to `udt_name` for one table
type ColumnTypes = HashMap<String, String>;

const COLUMN_TYPES_SQL: &str = "SELECT column_name::text, udt_name::text \
     FROM information_schema.columns \
     WHERE table_name = $1 AND table_schema = ANY(current_schemas(false))";

/// [`QueryExecutor`] that runs statements on PostgreSQL
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
    column_types: Arc<RwLock<HashMap<String, Arc<ColumnTypes>>>>,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            column_types: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Connect a default pool to `url`
    pub async fn connect(url: &str) -> Result<Self, ExecutorError> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Forget cached column types, e.g. after altering a table
    pub async fn clear_column_types(&self) {
        self.column_types.write().await.clear();
    }

    /// Column types of `table`, loaded once per table. Unknown tables are
    /// not cached.
    async fn column_types(&self, table: &str) -> Result<Arc<ColumnTypes>, ExecutorError> {
        if let Some(types) = self.column_types.read().await.get(table) {
            return Ok(types.clone());
        }

        let rows = sqlx::query(COLUMN_TYPES_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut types = ColumnTypes::with_capacity(rows.len());
        for row in rows {
            types.insert(row.try_get(0)?, row.try_get(1)?);
        }
        tracing::debug!("Loaded {} column types for '{}'", types.len(), table);

        let types = Arc::new(types);
        if !types.is_empty() {
            self.column_types
                .write()
                .await
                .insert(table.to_string(), types.clone());
        }
        Ok(types)
    }

    /// The `udt_name` behind each parameter, where the parameter has a column
    async fn resolve_targets(
        &self,
        targets: &[Option<ParamTarget>],
    ) -> Result<Vec<Option<String>>, ExecutorError> {
        let mut tables: HashMap<&str, Arc<ColumnTypes>> = HashMap::new();
        let mut resolved = Vec::with_capacity(targets.len());

        for target in targets {
            let Some(target) = target else {
                resolved.push(None);
                continue;
            };
            let types = match tables.get(target.table.as_str()) {
                Some(types) => types.clone(),
                None => {
                    let types = self.column_types(&target.table).await?;
                    tables.insert(target.table.as_str(), types.clone());
                    types
                }
            };
            resolved.push(types.get(&target.column).cloned());
        }

        Ok(resolved)
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute(&self, statement: Statement) -> Result<QueryOutput, ExecutorError> {
        let RenderedSql {
            sql,
            params,
            targets,
        } = SqlGenerator::render(&statement)?;
        let column_types = self.resolve_targets(&targets).await?;

        tracing::debug!("[{}] Table: {}", statement.kind(), statement.table());
        tracing::debug!("[{}] SQL: {}", statement.kind(), sql);
        tracing::debug!("[{}] params count: {}", statement.kind(), params.len());

        let mut query = sqlx::query(&sql);
        for (param, column_type) in params.into_iter().zip(column_types) {
            query = bind_json_param(query, param, column_type.as_deref());
        }

        match statement {
            Statement::Select(_) => {
                let rows = query.fetch_all(&self.pool).await?;
                let records = rows
                    .iter()
                    .map(row_to_record)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryOutput::Rows(records))
            }
            Statement::Count { .. } => {
                let row = query.fetch_one(&self.pool).await?;
                let total: i64 = row.try_get("c")?;
                Ok(QueryOutput::Count(total))
            }
            Statement::Insert { .. } => {
                let rows = query.fetch_all(&self.pool).await?;
                let ids = rows
                    .iter()
                    .map(first_column)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryOutput::Inserted(ids))
            }
            Statement::Update { .. } | Statement::Delete { .. } => {
                let result = query.execute(&self.pool).await?;
                Ok(QueryOutput::Affected(result.rows_affected()))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
