//! Lifecycle hooks
//!
//! A hook takes the record by value and hands back the record to carry on
//! with, so "mutating in place" is simply returning a modified record.

use crate::errors::ModelError;
use futures::future::BoxFuture;
use query_executor::Record;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type HookFuture = BoxFuture<'static, Result<Record, ModelError>>;

/// Type-erased async hook
pub type Hook = Arc<dyn Fn(Record) -> HookFuture + Send + Sync>;

/// Box an async closure into a [`Hook`]
pub fn hook<F, Fut>(f: F) -> Hook
where
    F: Fn(Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Record, ModelError>> + Send + 'static,
{
    Arc::new(move |record: Record| -> HookFuture { Box::pin(f(record)) })
}

/// The four optional hook slots of a model
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_insert: Option<Hook>,
    pub after_insert: Option<Hook>,
    pub before_update: Option<Hook>,
    pub after_update: Option<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before_insert", &self.before_insert.is_some())
            .field("after_insert", &self.after_insert.is_some())
            .field("before_update", &self.before_update.is_some())
            .field("after_update", &self.after_update.is_some())
            .finish()
    }
}

/// Run `slot` if set, otherwise pass the record through untouched
pub(crate) async fn run_hook(slot: &Option<Hook>, record: Record) -> Result<Record, ModelError> {
    match slot {
        Some(hook) => hook(record).await,
        None => Ok(record),
    }
}
