use std::time::Duration;

use common::retry::calculate_backoff;
use mq::{Delivery, MessageQueue, MqError, QueueConnector, connect_with_retry};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ingest::{Disposition, ingest_payload};
use crate::state::IngestContext;

/// Queue and timing settings of one consumer instance.
#[derive(Debug, Clone)]
pub struct ConsumeSettings {
    pub queue_name: String,
    /// Fixed delay between broker connection attempts.
    pub reconnect_delay: Duration,
    /// Backoff before a failed message is handed back to the broker.
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Return deliveries left unsettled by earlier consumers to the queue
    /// after every connect.
    pub recover_on_connect: bool,
}

/// Counters collected over the lifetime of one consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub inserted: u64,
    pub duplicates: u64,
    pub discarded: u64,
    pub requeued: u64,
    pub recovered: u64,
    pub reconnects: u64,
}

enum SessionEnd {
    Cancelled,
    Disconnected(MqError),
}

/// Consume frames until `cancel` fires, reconnecting to the broker as
/// needed.
///
/// Messages are processed one at a time and acknowledged only once stored,
/// found to be duplicates, or found to hold nothing storable. Store
/// failures hand the message back to the broker for redelivery.
pub async fn consume_frames<C: QueueConnector>(
    ctx: IngestContext,
    connector: C,
    settings: ConsumeSettings,
    cancel: CancellationToken,
) -> ConsumerReport {
    info!(queue = %settings.queue_name, "Starting frame consumer");

    let mut report = ConsumerReport::default();

    loop {
        let Some(queue) = connect_with_retry(&connector, settings.reconnect_delay, &cancel).await
        else {
            break;
        };

        if settings.recover_on_connect {
            match queue.recover(&settings.queue_name).await {
                Ok(0) => {}
                Ok(count) => {
                    report.recovered += count;
                    info!(count, "Returned unsettled messages to the queue");
                }
                Err(e) => {
                    report.reconnects += 1;
                    warn!(error = %e, "Failed to recover unsettled messages, reconnecting");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(settings.reconnect_delay) => {}
                    }
                    continue;
                }
            }
        }

        match run_session(&ctx, &queue, &settings, &cancel, &mut report).await {
            SessionEnd::Cancelled => break,
            SessionEnd::Disconnected(e) => {
                report.reconnects += 1;
                warn!(error = %e, "Lost message broker connection, reconnecting");
            }
        }
    }

    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        discarded = report.discarded,
        requeued = report.requeued,
        recovered = report.recovered,
        reconnects = report.reconnects,
        "Frame consumer stopped"
    );

    report
}

async fn run_session<Q: MessageQueue>(
    ctx: &IngestContext,
    queue: &Q,
    settings: &ConsumeSettings,
    cancel: &CancellationToken,
    report: &mut ConsumerReport,
) -> SessionEnd {
    loop {
        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            received = queue.consume(&settings.queue_name) => match received {
                Ok(delivery) => delivery,
                Err(e) => return SessionEnd::Disconnected(e),
            },
        };

        // From here on the delivery is finished even if cancellation
        // arrives: it is either acknowledged or handed back.
        if let Err(e) = handle_delivery(ctx, queue, settings, cancel, delivery, report).await {
            return SessionEnd::Disconnected(e);
        }
    }
}

async fn handle_delivery<Q: MessageQueue>(
    ctx: &IngestContext,
    queue: &Q,
    settings: &ConsumeSettings,
    cancel: &CancellationToken,
    delivery: Delivery<Q::Handle>,
    report: &mut ConsumerReport,
) -> Result<(), MqError> {
    let disposition = ingest_payload(ctx, &delivery.body).await;

    match &disposition {
        Disposition::Inserted { .. } => report.inserted += 1,
        Disposition::Duplicate => report.duplicates += 1,
        Disposition::Discarded => report.discarded += 1,
        Disposition::Retry(_) => report.requeued += 1,
    }

    if disposition.is_settled() {
        return queue.ack(&settings.queue_name, delivery).await;
    }

    let delay = calculate_backoff(
        delivery.attempts,
        settings.retry_base_delay_ms,
        settings.retry_max_delay_ms,
    );
    warn!(
        message_id = %delivery.id,
        attempt = delivery.attempts,
        delay_ms = delay.as_millis() as u64,
        "Store unavailable, requeueing message"
    );

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(delay) => {}
    }

    queue.requeue(&settings.queue_name, delivery).await
}
