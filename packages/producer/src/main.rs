use anyhow::Context;
use common::shutdown::cancel_on_signal;
use mq::{BroccoliConnector, connect_with_retry};
use producer::config::ProducerAppConfig;
use producer::decoder::DecoderPipeline;
use producer::filter::FrameFilter;
use producer::{Producer, ProducerError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = ProducerAppConfig::load().context("Failed to load config")?;
    info!(producer_id = %config.producer.id, "Producer starting");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let connector = BroccoliConnector::new(config.mq_config());
    let Some(queue) = connect_with_retry(&connector, config.reconnect_delay(), &cancel).await
    else {
        info!("Shutdown before message broker became available");
        return Ok(());
    };
    info!(queue_name = %config.mq.queue_name, "MQ connected");

    let mut pipeline =
        DecoderPipeline::spawn(&config.decoder).context("Failed to start decoder pipeline")?;
    let output = pipeline
        .take_output()
        .ok_or(ProducerError::DecoderExited)
        .context("Decoder output unavailable")?;

    let mut producer = Producer::new(
        queue,
        config.mq.queue_name.clone(),
        FrameFilter::new(config.decoder.diagnostic_prefixes.clone()),
    );

    info!("Listening for pager frames");
    match producer.run(output, &cancel).await {
        Ok(report) => {
            info!(
                published = report.published,
                skipped = report.skipped,
                "Producer exiting"
            );
            Ok(())
        }
        Err(e) => {
            let report = producer.report();
            error!(
                error = %e,
                published = report.published,
                "Producer stopped unexpectedly"
            );
            Err(e.into())
        }
    }
}
