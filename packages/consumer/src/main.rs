use std::sync::Arc;

use anyhow::Context;
use common::shutdown::cancel_on_signal;
use consumer::config::ConsumerAppConfig;
use consumer::consumers::consume_frames;
use consumer::database::init_db_with_retry;
use consumer::{IngestContext, MessageStore, SeaOrmStore};
use mq::BroccoliConnector;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = ConsumerAppConfig::load().context("Failed to load config")?;
    info!(consumer_id = %config.consumer.id, "Consumer starting");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let settings = config.consume_settings();
    let Some(db) = init_db_with_retry(&config.database, settings.reconnect_delay, &cancel).await
    else {
        info!("Shutdown before database became available");
        return Ok(());
    };

    let store = SeaOrmStore::new(db, config.store_timeout());
    store
        .ensure_schema()
        .await
        .context("Failed to ensure message schema")?;

    info!(
        queue_name = %settings.queue_name,
        message_ttl_secs = config.mq.message_ttl_secs,
        frame_layout = ?config.frame,
        "Store ready"
    );

    let ctx = IngestContext::new(Arc::new(store), config.frame);
    let connector = BroccoliConnector::new(config.mq_config());

    let report = consume_frames(ctx, connector, settings, cancel).await;
    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        "Consumer exiting"
    );

    Ok(())
}
