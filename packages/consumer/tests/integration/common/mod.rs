use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ::common::FrameLayout;
use chrono::Utc;
use consumer::config::DatabaseConfig;
use consumer::consumers::{ConsumeSettings, ConsumerReport, consume_frames};
use consumer::database::init_db;
use consumer::entity::message;
use consumer::models::{InsertOutcome, MessageFilter, MessageQuery, NewMessage, PagerMessage};
use consumer::{IngestContext, MessageStore, SeaOrmStore, StoreError};
use mq::{MemoryBroker, MessageQueue, QueueConnector};
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionTrait};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const QUEUE: &str = "p2000";

/// A SQLite file database with the message schema and an in-memory broker.
pub struct TestEnv {
    _dir: TempDir,
    pub store: Arc<SeaOrmStore>,
    pub broker: MemoryBroker,
}

impl TestEnv {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("p2000.db").display()
        );
        let db = init_db(&DatabaseConfig {
            url,
            max_connections: 4,
            min_connections: 1,
            connect_timeout_secs: 5,
        })
        .await
        .expect("Failed to open test database");

        let store = SeaOrmStore::new(db, Duration::from_secs(5));
        store
            .ensure_schema()
            .await
            .expect("Failed to create message schema");

        Self {
            _dir: dir,
            store: Arc::new(store),
            broker: MemoryBroker::new(),
        }
    }

    pub fn context(&self) -> IngestContext {
        IngestContext::new(self.store.clone(), FrameLayout::default())
    }

    pub fn context_with(&self, store: Arc<dyn MessageStore>) -> IngestContext {
        IngestContext::new(store, FrameLayout::default())
    }

    pub async fn publish(&self, body: &str) {
        let queue = self
            .broker
            .connect()
            .await
            .expect("Broker should be online");
        queue
            .publish(QUEUE, body)
            .await
            .expect("Failed to publish test frame");
    }

    pub fn spawn_consumer(&self, ctx: IngestContext) -> RunningConsumer {
        self.spawn_consumer_with(ctx, settings())
    }

    /// Consumer that sweeps unsettled deliveries back onto the queue after
    /// every connect.
    pub fn spawn_recovering_consumer(&self, ctx: IngestContext) -> RunningConsumer {
        self.spawn_consumer_with(
            ctx,
            ConsumeSettings {
                recover_on_connect: true,
                ..settings()
            },
        )
    }

    fn spawn_consumer_with(&self, ctx: IngestContext, settings: ConsumeSettings) -> RunningConsumer {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(consume_frames(
            ctx,
            self.broker.clone(),
            settings,
            cancel.clone(),
        ));
        RunningConsumer { cancel, handle }
    }

    /// Store over the same database whose calls give up after `timeout`.
    pub fn store_with_timeout(&self, timeout: Duration) -> Arc<SeaOrmStore> {
        Arc::new(SeaOrmStore::new(self.store.connection().clone(), timeout))
    }

    /// Block until every published message has been settled.
    pub async fn drain(&self) {
        assert!(
            self.broker.wait_idle(QUEUE, Duration::from_secs(10)).await,
            "queue did not drain"
        );
    }

    /// Open a transaction that holds the SQLite write lock until it is
    /// committed or rolled back.
    pub async fn hold_write_lock(&self) -> DatabaseTransaction {
        let txn = self
            .store
            .connection()
            .begin()
            .await
            .expect("Failed to begin transaction");
        message::ActiveModel {
            raw: Set("FLEX|write lock".into()),
            capcodes: Set(String::new()),
            received_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .expect("Failed to take write lock");
        txn
    }

    pub async fn stored(&self) -> Vec<PagerMessage> {
        self.store
            .query(&MessageQuery::recent(1000))
            .await
            .expect("Failed to query messages")
    }

    pub async fn count(&self) -> u64 {
        self.store
            .count(&MessageFilter::Recent)
            .await
            .expect("Failed to count messages")
    }
}

pub fn settings() -> ConsumeSettings {
    ConsumeSettings {
        queue_name: QUEUE.to_string(),
        reconnect_delay: Duration::from_millis(20),
        retry_base_delay_ms: 10,
        retry_max_delay_ms: 50,
        recover_on_connect: false,
    }
}

pub struct RunningConsumer {
    cancel: CancellationToken,
    handle: JoinHandle<ConsumerReport>,
}

impl RunningConsumer {
    pub async fn stop(self) -> ConsumerReport {
        self.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("consumer did not stop")
            .expect("consumer task panicked")
    }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Store wrapper that fails a set number of inserts and lookups before
/// delegating to the real store.
pub struct FlakyStore {
    inner: Arc<SeaOrmStore>,
    insert_failures: AtomicUsize,
    lookup_failures: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SeaOrmStore>, insert_failures: usize, lookup_failures: usize) -> Self {
        Self {
            inner,
            insert_failures: AtomicUsize::new(insert_failures),
            lookup_failures: AtomicUsize::new(lookup_failures),
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn outage() -> StoreError {
        StoreError::Unavailable("simulated outage".into())
    }
}

#[async_trait]
impl MessageStore for FlakyStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.inner.ensure_schema().await
    }

    async fn insert(&self, message: NewMessage) -> Result<InsertOutcome, StoreError> {
        if Self::take(&self.insert_failures) {
            return Err(Self::outage());
        }
        self.inner.insert(message).await
    }

    async fn find_by_raw(&self, raw: &str) -> Result<Option<PagerMessage>, StoreError> {
        if Self::take(&self.lookup_failures) {
            return Err(Self::outage());
        }
        self.inner.find_by_raw(raw).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<PagerMessage>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn query(&self, query: &MessageQuery) -> Result<Vec<PagerMessage>, StoreError> {
        self.inner.query(query).await
    }

    async fn count(&self, filter: &MessageFilter) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }
}

/// Store wrapper whose inserts wait until the test opens the gate.
pub struct GatedStore {
    inner: Arc<SeaOrmStore>,
    gate: Arc<Semaphore>,
}

impl GatedStore {
    /// Returns the store and its closed gate.
    pub fn new(inner: Arc<SeaOrmStore>) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                inner,
                gate: gate.clone(),
            },
            gate,
        )
    }
}

#[async_trait]
impl MessageStore for GatedStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.inner.ensure_schema().await
    }

    async fn insert(&self, message: NewMessage) -> Result<InsertOutcome, StoreError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.inner.insert(message).await
    }

    async fn find_by_raw(&self, raw: &str) -> Result<Option<PagerMessage>, StoreError> {
        self.inner.find_by_raw(raw).await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<PagerMessage>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn query(&self, query: &MessageQuery) -> Result<Vec<PagerMessage>, StoreError> {
        self.inner.query(query).await
    }

    async fn count(&self, filter: &MessageFilter) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }
}
