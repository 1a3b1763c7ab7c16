use std::sync::Arc;

use tracing::warn;

use crate::store::MessageStore;

/// Pre-insert duplicate check against the store.
///
/// Fails open: when the lookup itself fails the frame is reported as new
/// and the unique index on `raw` settles it at insert time.
#[derive(Clone)]
pub struct DedupGate {
    store: Arc<dyn MessageStore>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub async fn is_duplicate(&self, raw: &str) -> bool {
        match self.store.find_by_raw(raw).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(raw = %raw, error = %e, "Duplicate check failed, treating frame as new");
                false
            }
        }
    }
}
