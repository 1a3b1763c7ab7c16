use std::time::Duration;

use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the storage adapter. All of them are transient from the
/// pipeline's point of view: the message is requeued, never dropped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("Store {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
