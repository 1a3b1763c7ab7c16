use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::frame::{FrameLayout, ParsedFrame, parse_frame};

/// Pre-serialized frame as some upstream publishers send it.
///
/// Field aliases accept the short keys used by older publishers
/// (`time`, `prio`, `capcode`, `message`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub raw: String,
    #[serde(default, alias = "time")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "prio")]
    pub priority: Option<String>,
    #[serde(default)]
    pub grip: Option<u8>,
    #[serde(default, alias = "capcode")]
    pub capcodes: Vec<String>,
    #[serde(default, alias = "message")]
    pub body: Option<String>,
}

impl From<FrameRecord> for ParsedFrame {
    fn from(record: FrameRecord) -> Self {
        Self {
            raw: record.raw,
            timestamp: record.timestamp,
            priority: record.priority.filter(|p| !p.trim().is_empty()),
            grip: record.grip.filter(|g| (1..=4).contains(g)),
            capcodes: record.capcodes,
            body: record.body,
            minimal: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,
}

/// Turn one queue payload into a candidate record.
///
/// A JSON object carrying `raw` is taken as a structured record with its
/// own explicit fields. Anything else is treated as the raw frame line and
/// run through [`parse_frame`].
pub fn decode_payload(body: &str, layout: &FrameLayout) -> Result<ParsedFrame, DecodeError> {
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }

    if body.trim_start().starts_with('{') {
        match serde_json::from_str::<FrameRecord>(body) {
            Ok(record) if !record.raw.is_empty() => {
                debug!(raw = %record.raw, "Decoded structured frame record");
                return Ok(record.into());
            }
            Ok(_) => debug!("Structured record without raw, treating payload as frame"),
            Err(e) => debug!(error = %e, "Payload is not a frame record, treating as frame"),
        }
    }

    Ok(parse_frame(body, layout))
}
