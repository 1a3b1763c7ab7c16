use std::sync::Arc;

use common::{FrameLayout, MonotonicClock};

use crate::dedup::DedupGate;
use crate::store::MessageStore;

/// Everything the ingest pipeline needs, built once at startup and passed
/// explicitly to each consumer.
#[derive(Clone)]
pub struct IngestContext {
    pub store: Arc<dyn MessageStore>,
    pub dedup: DedupGate,
    pub clock: Arc<MonotonicClock>,
    pub layout: FrameLayout,
}

impl IngestContext {
    pub fn new(store: Arc<dyn MessageStore>, layout: FrameLayout) -> Self {
        Self {
            dedup: DedupGate::new(Arc::clone(&store)),
            store,
            clock: Arc::new(MonotonicClock::new()),
            layout,
        }
    }
}
