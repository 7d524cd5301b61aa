//! Custom filters
//!
//! A custom filter replaces the default `table.key = value` predicate for
//! one filter key. It receives the value and a [`QueryHandle`] onto the
//! select being built and may add any predicate or join it likes.

use crate::errors::ModelError;
use futures::future::BoxFuture;
use query_executor::QueryHandle;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type FilterFuture = BoxFuture<'static, Result<(), ModelError>>;

/// Type-erased async filter
pub type CustomFilter = Arc<dyn Fn(Value, QueryHandle) -> FilterFuture + Send + Sync>;

/// Box an async closure into a [`CustomFilter`]
pub fn custom_filter<F, Fut>(f: F) -> CustomFilter
where
    F: Fn(Value, QueryHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ModelError>> + Send + 'static,
{
    Arc::new(move |value: Value, query: QueryHandle| -> FilterFuture {
        Box::pin(f(value, query))
    })
}

/// Box a synchronous closure into a [`CustomFilter`]
pub fn sync_filter<F>(f: F) -> CustomFilter
where
    F: Fn(Value, &QueryHandle) + Send + Sync + 'static,
{
    Arc::new(move |value: Value, query: QueryHandle| -> FilterFuture {
        f(value, &query);
        Box::pin(futures::future::ready(Ok(())))
    })
}
