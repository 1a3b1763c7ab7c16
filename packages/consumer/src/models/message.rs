use chrono::{DateTime, Utc};
use common::ParsedFrame;
use serde::Serialize;

use crate::entity::message;

/// A stored pager message as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerMessage {
    pub id: i32,
    pub raw: String,
    pub timestamp: Option<String>,
    pub priority: Option<String>,
    pub grip: Option<u8>,
    pub capcodes: Vec<String>,
    pub body: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl From<message::Model> for PagerMessage {
    fn from(model: message::Model) -> Self {
        Self {
            id: model.id,
            raw: model.raw,
            timestamp: model.timestamp,
            priority: model.priority,
            grip: model.grip.and_then(|g| u8::try_from(g).ok()),
            capcodes: split_capcodes(&model.capcodes),
            body: model.body,
            received_at: model.received_at,
        }
    }
}

/// A message about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub raw: String,
    pub timestamp: Option<String>,
    pub priority: Option<String>,
    pub grip: Option<u8>,
    pub capcodes: Vec<String>,
    pub body: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn from_frame(frame: ParsedFrame, received_at: DateTime<Utc>) -> Self {
        Self {
            raw: frame.raw,
            timestamp: frame.timestamp,
            priority: frame.priority,
            grip: frame.grip,
            capcodes: frame.capcodes,
            body: frame.body,
            received_at,
        }
    }

    /// Storage form of the capcode list.
    pub fn joined_capcodes(&self) -> String {
        self.capcodes.join(" ")
    }
}

pub(crate) fn split_capcodes(joined: &str) -> Vec<String> {
    joined.split_whitespace().map(str::to_string).collect()
}

/// Result of an insert. A duplicate key is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: i32 },
    /// The unique index on `raw` already holds this frame.
    DuplicateKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageFilter {
    #[default]
    Recent,
    /// Substring match over the body.
    BodyContains(String),
    /// Substring match over the capcode list.
    CapcodeContains(String),
    /// Substring match over body or capcodes.
    Text(String),
}

/// Read-side query. Results are always newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub filter: MessageFilter,
    pub limit: u64,
    pub offset: u64,
}

impl MessageQuery {
    pub fn recent(limit: u64) -> Self {
        Self {
            filter: MessageFilter::Recent,
            limit,
            offset: 0,
        }
    }

    pub fn filtered(filter: MessageFilter, limit: u64) -> Self {
        Self {
            filter,
            limit,
            offset: 0,
        }
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}
