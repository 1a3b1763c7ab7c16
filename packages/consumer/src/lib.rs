pub mod config;
pub mod consumers;
pub mod database;
pub mod dedup;
pub mod entity;
pub mod error;
pub mod ingest;
pub mod models;
pub mod state;
pub mod store;

pub use error::StoreError;
pub use state::IngestContext;
pub use store::{MessageStore, SeaOrmStore};
