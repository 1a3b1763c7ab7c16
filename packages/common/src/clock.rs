use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Wall clock that never goes backwards within one process.
///
/// Used for `received_at` so ingestion order stays sortable even if the
/// system clock is stepped back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time, or the previously returned instant if the wall clock
    /// is behind it.
    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = match *last {
            Some(prev) if prev > candidate => prev,
            _ => candidate,
        };
        *last = Some(next);
        next
    }
}
