use common::decode_payload;
use common::extract::fill_missing;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::models::{InsertOutcome, NewMessage};
use crate::state::IngestContext;

/// What happened to one queue payload.
#[derive(Debug)]
pub enum Disposition {
    /// Stored as a new message.
    Inserted { id: i32 },
    /// Already stored; caught by the dedup gate or the unique index.
    Duplicate,
    /// Nothing storable in the payload.
    Discarded,
    /// The store failed; the payload must be delivered again.
    Retry(StoreError),
}

impl Disposition {
    /// Whether the queue message has been durably handled and may be
    /// acknowledged.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Disposition::Retry(_))
    }
}

/// Run one payload through decode, parse, extraction, dedup and insert.
pub async fn ingest_payload(ctx: &IngestContext, payload: &str) -> Disposition {
    let mut frame = match decode_payload(payload, &ctx.layout) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Discarding undecodable payload");
            return Disposition::Discarded;
        }
    };

    if frame.is_minimal() {
        info!(raw = %frame.raw, "Frame does not match layout, storing minimal record");
    } else {
        fill_missing(&mut frame);
    }

    if ctx.dedup.is_duplicate(&frame.raw).await {
        info!(raw = %frame.raw, "Duplicate skipped");
        return Disposition::Duplicate;
    }

    let raw = frame.raw.clone();
    let message = NewMessage::from_frame(frame, ctx.clock.now());
    let priority = message.priority.clone();
    let grip = message.grip;

    match ctx.store.insert(message).await {
        Ok(InsertOutcome::Inserted { id }) => {
            info!(
                id,
                raw = %raw,
                priority = ?priority,
                grip = ?grip,
                "Stored message"
            );
            Disposition::Inserted { id }
        }
        Ok(InsertOutcome::DuplicateKey) => {
            info!(raw = %raw, "Concurrent duplicate rejected by unique index");
            Disposition::Duplicate
        }
        Err(e) => {
            warn!(raw = %raw, error = %e, "Failed to store message");
            Disposition::Retry(e)
        }
    }
}
