//! Heartbeat aggregator and delivery worker
//!
//! `record()` never touches the network. The append, the flush check, the
//! buffer swap, and the hand-off to the delivery queue all happen under one
//! mutex, so concurrent producers can neither lose nor duplicate events and
//! batches reach the worker in flush order.
//!
//! The delivery queue is bounded. When the worker falls behind (remote down,
//! slow deliveries) new batches are dropped whole instead of piling up.

use crate::config::AggregatorConfig;
use crate::patterns::detect_patterns;
use daimon_core::{BatchRequest, Event};
use daimon_sink::RemoteSink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a batch was flushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushReason {
    /// The flush interval elapsed.
    Interval,
    /// The event contained this significant marker.
    Significant(String),
    /// The pending buffer reached `max_pending`.
    Overflow,
    /// `flush()` was called.
    Manual,
}

struct Pending {
    events: Vec<Event>,
    last_flush: Instant,
}

pub struct Aggregator {
    state: Mutex<Pending>,
    interval: Duration,
    markers: Vec<String>,
    error_streak_threshold: usize,
    max_pending: usize,
    outbox: mpsc::Sender<BatchRequest>,
    dropped: AtomicU64,
}

impl Aggregator {
    /// Build an aggregator and the receiving end of its delivery queue.
    pub fn new(config: &AggregatorConfig) -> (Self, mpsc::Receiver<BatchRequest>) {
        let (outbox, rx) = mpsc::channel(config.delivery_queue.max(1));
        let aggregator = Self {
            state: Mutex::new(Pending {
                events: Vec::new(),
                last_flush: Instant::now(),
            }),
            interval: config.flush_interval(),
            markers: config.significant_markers.clone(),
            error_streak_threshold: config.error_streak_threshold,
            max_pending: config.max_pending.max(1),
            outbox,
            dropped: AtomicU64::new(0),
        };
        (aggregator, rx)
    }

    /// Build an aggregator and spawn its delivery worker on the current runtime.
    ///
    /// The worker exits once every handle to the aggregator has been dropped
    /// and the queue is drained, returning its delivery counts.
    pub fn spawn(
        config: &AggregatorConfig,
        sink: Arc<dyn RemoteSink>,
        delivery_timeout: Duration,
    ) -> (Self, JoinHandle<DeliveryStats>) {
        let (aggregator, rx) = Self::new(config);
        let worker = DeliveryWorker::new(rx, sink, delivery_timeout);
        (aggregator, tokio::spawn(worker.run()))
    }

    /// Append an event and flush if the predicate holds. Returns the reason
    /// when this call flushed.
    pub fn record(&self, event: Event) -> Option<FlushReason> {
        let mut state = self.lock();

        let reason = self
            .marker_in(&event.payload)
            .map(|m| FlushReason::Significant(m.to_string()))
            .or_else(|| (state.last_flush.elapsed() > self.interval).then_some(FlushReason::Interval));

        debug!("Heartbeat [{}]: {}", event.source, event.payload);
        state.events.push(event);

        let reason = reason.or_else(|| (state.events.len() >= self.max_pending).then_some(FlushReason::Overflow))?;
        self.swap_and_send(&mut state, &reason);
        Some(reason)
    }

    /// Flush whatever is pending. No-op (and no delivery) on an empty buffer.
    pub fn flush(&self) -> bool {
        let mut state = self.lock();
        if state.events.is_empty() {
            return false;
        }
        self.swap_and_send(&mut state, &FlushReason::Manual)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().events.len()
    }

    /// Batches dropped because the delivery queue was full or closed.
    pub fn dropped_batches(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn marker_in(&self, payload: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|m| payload.contains(m.as_str()))
            .map(String::as_str)
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // A producer panicking mid-append leaves a valid Vec behind.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Must be called with the state lock held.
    fn swap_and_send(&self, state: &mut Pending, reason: &FlushReason) -> bool {
        let events = std::mem::take(&mut state.events);
        state.last_flush = Instant::now();
        if events.is_empty() {
            return false;
        }

        let patterns = detect_patterns(&events, self.error_streak_threshold);
        info!(
            "Flushing {} heartbeats ({:?}){}",
            events.len(),
            reason,
            if patterns.is_empty() { String::new() } else { format!(" patterns={:?}", patterns) }
        );

        let batch = BatchRequest { heartbeats: events, patterns };
        match self.outbox.try_send(batch) {
            Ok(()) => true,
            Err(TrySendError::Full(batch)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Delivery queue full, dropping batch of {} heartbeats", batch.heartbeats.len());
                false
            }
            Err(TrySendError::Closed(batch)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Delivery worker gone, dropping batch of {} heartbeats", batch.heartbeats.len());
                false
            }
        }
    }
}

/// Delivery counts reported when the worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: u64,
    pub failed: u64,
}

/// Single consumer of the delivery queue. Each batch gets one attempt,
/// bounded by `timeout`; failures are logged and the batch is dropped.
pub struct DeliveryWorker {
    rx: mpsc::Receiver<BatchRequest>,
    sink: Arc<dyn RemoteSink>,
    timeout: Duration,
}

impl DeliveryWorker {
    pub fn new(rx: mpsc::Receiver<BatchRequest>, sink: Arc<dyn RemoteSink>, timeout: Duration) -> Self {
        Self { rx, sink, timeout }
    }

    pub async fn run(mut self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        while let Some(batch) = self.rx.recv().await {
            let count = batch.heartbeats.len();
            match tokio::time::timeout(self.timeout, self.sink.deliver_batch(&batch)).await {
                Ok(Ok(response)) => {
                    stats.delivered += 1;
                    debug!("Delivered {} heartbeats (stored {})", count, response.stored);
                    for insight in &response.insights {
                        info!("Insight: {}", insight);
                    }
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    warn!("Dropping batch of {} heartbeats: {}", count, e);
                }
                Err(_) => {
                    stats.failed += 1;
                    warn!("Dropping batch of {} heartbeats: delivery exceeded {:?}", count, self.timeout);
                }
            }
        }
        debug!("Delivery worker stopped: {:?}", stats);
        stats
    }
}
