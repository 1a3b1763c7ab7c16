use mq::MessageQueue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ProducerError, Result};
use crate::filter::FrameFilter;

/// Counters over the lifetime of one producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub received: u64,
    pub published: u64,
    pub skipped: u64,
}

/// Forwards decoder frames to the queue, one message per frame.
pub struct Producer<Q> {
    queue: Q,
    queue_name: String,
    filter: FrameFilter,
    report: ProducerReport,
}

impl<Q: MessageQueue> Producer<Q> {
    pub fn new(queue: Q, queue_name: impl Into<String>, filter: FrameFilter) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            filter,
            report: ProducerReport::default(),
        }
    }

    pub fn report(&self) -> ProducerReport {
        self.report
    }

    /// Publish every frame read from `output` until `cancel` fires.
    ///
    /// The decoder never ends its stream on its own, so end of input is
    /// reported as [`ProducerError::DecoderExited`]. A failed publish is
    /// returned as is; frames are not buffered across broker outages.
    pub async fn run<R>(&mut self, output: R, cancel: &CancellationToken) -> Result<ProducerReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut segments = output.split(b'\n');

        loop {
            let segment = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(published = self.report.published, "Producer stopping");
                    return Ok(self.report);
                }
                next = segments.next_segment() => next?,
            };

            let Some(bytes) = segment else {
                return Err(ProducerError::DecoderExited);
            };

            let line = String::from_utf8_lossy(&bytes);
            let Some(frame) = self.filter.accept(&line) else {
                self.report.skipped += 1;
                debug!(line = %line.trim(), "Skipping decoder output");
                continue;
            };

            self.report.received += 1;
            info!(count = self.report.received, frame = %frame, "RX");

            self.queue.publish(&self.queue_name, frame).await?;
            self.report.published += 1;
        }
    }
}
