//! In-process broker with the same settle semantics as the Redis queue.
//! Consumed messages stay in flight until acknowledged or requeued, even
//! across a broker outage; only [`MessageQueue::recover`] hands abandoned
//! deliveries back to their queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::MqError;
use crate::queue::{Delivery, MessageQueue, QueueConnector};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
struct Stored {
    id: String,
    body: String,
    attempts: u8,
}

#[derive(Debug)]
struct InFlight {
    queue: String,
    stored: Stored,
    /// Delivery order, used to put recovered messages back oldest first.
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, VecDeque<Stored>>,
    in_flight: HashMap<String, InFlight>,
    delivered: u64,
}

#[derive(Debug)]
struct Inner {
    state: Mutex<State>,
    notify: Notify,
    online: AtomicBool,
    next_id: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    recovered: AtomicU64,
}

/// Shared broker. Clones talk to the same queues.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                online: AtomicBool::new(true),
                next_id: AtomicU64::new(1),
                acked: AtomicU64::new(0),
                requeued: AtomicU64::new(0),
                recovered: AtomicU64::new(0),
            }),
        }
    }

    /// Simulate a broker outage or its end. In-flight messages stay in
    /// flight either way.
    pub async fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    /// Messages waiting to be delivered on `queue`.
    pub async fn pending(&self, queue: &str) -> usize {
        let state = self.inner.state.lock().await;
        state.queues.get(queue).map(VecDeque::len).unwrap_or(0)
    }

    /// Messages delivered but not yet settled, across all queues.
    pub async fn in_flight(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }

    pub fn acked(&self) -> u64 {
        self.inner.acked.load(Ordering::SeqCst)
    }

    pub fn requeued(&self) -> u64 {
        self.inner.requeued.load(Ordering::SeqCst)
    }

    /// Messages returned to their queue by [`MessageQueue::recover`].
    pub fn recovered(&self) -> u64 {
        self.inner.recovered.load(Ordering::SeqCst)
    }

    /// Whether `queue` is empty and nothing is in flight.
    pub async fn is_idle(&self, queue: &str) -> bool {
        let state = self.inner.state.lock().await;
        state.in_flight.is_empty() && state.queues.get(queue).is_none_or(VecDeque::is_empty)
    }

    /// Wait until `queue` is empty and nothing is in flight.
    pub async fn wait_idle(&self, queue: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_idle(queue).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn ensure_online(&self) -> Result<(), MqError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(MqError::Connection("memory broker is offline".into()))
        }
    }
}

/// Connection handle onto a [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    broker: MemoryBroker,
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    type Handle = ();

    async fn publish(&self, queue: &str, body: &str) -> Result<(), MqError> {
        self.broker.ensure_online()?;
        let id = self.broker.inner.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.broker.inner.state.lock().await;
            state.queues.entry(queue.to_string()).or_default().push_back(Stored {
                id: format!("mem-{id}"),
                body: body.to_string(),
                attempts: 0,
            });
        }
        self.broker.inner.notify.notify_one();
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Delivery<Self::Handle>, MqError> {
        loop {
            self.broker.ensure_online()?;
            {
                let mut state = self.broker.inner.state.lock().await;
                let next = state.queues.get_mut(queue).and_then(VecDeque::pop_front);
                if let Some(mut stored) = next {
                    stored.attempts = stored.attempts.saturating_add(1);
                    state.delivered += 1;
                    let seq = state.delivered;
                    state.in_flight.insert(
                        stored.id.clone(),
                        InFlight {
                            queue: queue.to_string(),
                            stored: stored.clone(),
                            seq,
                        },
                    );
                    return Ok(Delivery {
                        id: stored.id,
                        body: stored.body,
                        attempts: stored.attempts,
                        handle: (),
                    });
                }
            }
            let _ = tokio::time::timeout(POLL_INTERVAL, self.broker.inner.notify.notified()).await;
        }
    }

    async fn ack(&self, _queue: &str, delivery: Delivery<Self::Handle>) -> Result<(), MqError> {
        self.broker.ensure_online()?;
        let mut state = self.broker.inner.state.lock().await;
        match state.in_flight.remove(&delivery.id) {
            Some(_) => {
                self.broker.inner.acked.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(MqError::Ack(format!("unknown delivery {}", delivery.id))),
        }
    }

    async fn requeue(
        &self,
        _queue: &str,
        delivery: Delivery<Self::Handle>,
    ) -> Result<(), MqError> {
        self.broker.ensure_online()?;
        {
            let mut state = self.broker.inner.state.lock().await;
            let Some(entry) = state.in_flight.remove(&delivery.id) else {
                return Err(MqError::Ack(format!("unknown delivery {}", delivery.id)));
            };
            state.queues.entry(entry.queue).or_default().push_back(entry.stored);
        }
        self.broker.inner.requeued.fetch_add(1, Ordering::SeqCst);
        self.broker.inner.notify.notify_one();
        Ok(())
    }

    async fn recover(&self, queue: &str) -> Result<u64, MqError> {
        self.broker.ensure_online()?;
        let recovered = {
            let mut state = self.broker.inner.state.lock().await;
            let ids: Vec<String> = state
                .in_flight
                .iter()
                .filter(|(_, entry)| entry.queue == queue)
                .map(|(id, _)| id.clone())
                .collect();
            let mut entries: Vec<InFlight> = ids
                .iter()
                .filter_map(|id| state.in_flight.remove(id))
                .collect();
            // Newest first, so pushing to the front leaves the oldest at the head.
            entries.sort_by(|a, b| b.seq.cmp(&a.seq));
            let count = entries.len() as u64;
            let waiting = state.queues.entry(queue.to_string()).or_default();
            for entry in entries {
                waiting.push_front(entry.stored);
            }
            count
        };
        if recovered > 0 {
            self.broker
                .inner
                .recovered
                .fetch_add(recovered, Ordering::SeqCst);
            self.broker.inner.notify.notify_waiters();
        }
        Ok(recovered)
    }
}

#[async_trait]
impl QueueConnector for MemoryBroker {
    type Queue = MemoryQueue;

    async fn connect(&self) -> Result<Self::Queue, MqError> {
        self.ensure_online()?;
        Ok(MemoryQueue {
            broker: self.clone(),
        })
    }
}
