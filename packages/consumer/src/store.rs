use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Select, Set, SqlErr,
};
use tracing::{info, warn};

use crate::entity::message;
use crate::error::StoreError;
use crate::models::{InsertOutcome, MessageFilter, MessageQuery, NewMessage, PagerMessage};

/// Indexed persistence for pager messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create the message table and its indexes if missing. Idempotent.
    async fn ensure_schema(&self) -> Result<(), StoreError>;

    async fn insert(&self, message: NewMessage) -> Result<InsertOutcome, StoreError>;

    async fn find_by_raw(&self, raw: &str) -> Result<Option<PagerMessage>, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<PagerMessage>, StoreError>;

    /// Newest first.
    async fn query(&self, query: &MessageQuery) -> Result<Vec<PagerMessage>, StoreError>;

    async fn count(&self, filter: &MessageFilter) -> Result<u64, StoreError>;
}

/// [`MessageStore`] over a sea-orm connection (SQLite or PostgreSQL).
///
/// Every call is bounded by `timeout` so one slow query cannot stall the
/// consumer loop.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    timeout: Duration,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn timed<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }

    async fn create_index(&self, stmt: IndexCreateStatement) -> Result<(), DbErr> {
        let backend = self.db.get_database_backend();
        self.db.execute_raw(backend.build(&stmt)).await?;
        Ok(())
    }
}

fn message_indexes() -> Vec<(&'static str, IndexCreateStatement)> {
    vec![
        (
            "idx_message_raw",
            Index::create()
                .if_not_exists()
                .name("idx_message_raw")
                .table(message::Entity)
                .col(message::Column::Raw)
                .unique()
                .to_owned(),
        ),
        (
            "idx_message_timestamp",
            Index::create()
                .if_not_exists()
                .name("idx_message_timestamp")
                .table(message::Entity)
                .col(message::Column::Timestamp)
                .to_owned(),
        ),
        (
            "idx_message_priority",
            Index::create()
                .if_not_exists()
                .name("idx_message_priority")
                .table(message::Entity)
                .col(message::Column::Priority)
                .to_owned(),
        ),
        (
            "idx_message_capcodes",
            Index::create()
                .if_not_exists()
                .name("idx_message_capcodes")
                .table(message::Entity)
                .col(message::Column::Capcodes)
                .to_owned(),
        ),
    ]
}

fn filtered(filter: &MessageFilter) -> Select<message::Entity> {
    let query = message::Entity::find();
    match filter {
        MessageFilter::Recent => query,
        MessageFilter::BodyContains(text) => {
            query.filter(message::Column::Body.contains(text.as_str()))
        }
        MessageFilter::CapcodeContains(code) => {
            query.filter(message::Column::Capcodes.contains(code.as_str()))
        }
        MessageFilter::Text(text) => query.filter(
            Condition::any()
                .add(message::Column::Body.contains(text.as_str()))
                .add(message::Column::Capcodes.contains(text.as_str())),
        ),
    }
}

#[async_trait]
impl MessageStore for SeaOrmStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let mut table = Schema::new(backend).create_table_from_entity(message::Entity);
        table.if_not_exists();
        self.timed("create table", self.db.execute_raw(backend.build(&table)))
            .await?;

        for (name, stmt) in message_indexes() {
            match self.timed("create index", self.create_index(stmt)).await {
                Ok(()) => info!(index = name, "Ensured index exists"),
                // Without the unique index concurrent consumers could store
                // the same frame twice.
                Err(e) if name == "idx_message_raw" => return Err(e),
                Err(e) => warn!(index = name, error = %e, "Failed to create index"),
            }
        }

        Ok(())
    }

    async fn insert(&self, message: NewMessage) -> Result<InsertOutcome, StoreError> {
        let model = message::ActiveModel {
            capcodes: Set(message.joined_capcodes()),
            raw: Set(message.raw),
            timestamp: Set(message.timestamp),
            priority: Set(message.priority),
            grip: Set(message.grip.map(i32::from)),
            body: Set(message.body),
            received_at: Set(message.received_at),
            ..Default::default()
        };

        match tokio::time::timeout(self.timeout, model.insert(&self.db)).await {
            Ok(Ok(inserted)) => Ok(InsertOutcome::Inserted { id: inserted.id }),
            Ok(Err(e)) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertOutcome::DuplicateKey)
            }
            Ok(Err(e)) => Err(StoreError::Db(e)),
            Err(_) => Err(StoreError::Timeout {
                op: "insert",
                after: self.timeout,
            }),
        }
    }

    async fn find_by_raw(&self, raw: &str) -> Result<Option<PagerMessage>, StoreError> {
        let found = self
            .timed(
                "find_by_raw",
                message::Entity::find()
                    .filter(message::Column::Raw.eq(raw))
                    .one(&self.db),
            )
            .await?;
        Ok(found.map(PagerMessage::from))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<PagerMessage>, StoreError> {
        let found = self
            .timed("find_by_id", message::Entity::find_by_id(id).one(&self.db))
            .await?;
        Ok(found.map(PagerMessage::from))
    }

    async fn query(&self, query: &MessageQuery) -> Result<Vec<PagerMessage>, StoreError> {
        let rows = self
            .timed(
                "query",
                filtered(&query.filter)
                    .order_by_desc(message::Column::Id)
                    .limit(query.limit)
                    .offset(query.offset)
                    .all(&self.db),
            )
            .await?;
        Ok(rows.into_iter().map(PagerMessage::from).collect())
    }

    async fn count(&self, filter: &MessageFilter) -> Result<u64, StoreError> {
        self.timed("count", filtered(filter).count(&self.db)).await
    }
}
