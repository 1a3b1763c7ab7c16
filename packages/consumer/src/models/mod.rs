pub mod message;

pub use message::{InsertOutcome, MessageFilter, MessageQuery, NewMessage, PagerMessage};
