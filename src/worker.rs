//! Worker scheduler (C8): a bounded set of signer workers fed by
//! `OrderRegistry::next_pair()`.
//!
//! Grounded on the teacher's `tokio::spawn`-per-task pattern (`main.rs`,
//! `mempool/monitor.rs`'s reconnect loop) and `data_collector/
//! shared_state.rs`'s shared-state-behind-`Arc`+`DashMap` idiom.
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::registry::OrderRegistry;
use crate::telemetry::PairOutcome;

/// Cooperative shutdown signal shared between the scheduler and every
/// worker task. Cloneable, cheap, `Arc`-backed.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled_fut(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// One worker's processing function: given a pair, runs the full §4.6/§4.7
/// pipeline and reports a terminal outcome. Boxed so the scheduler stays
/// generic over whatever wiring `main.rs` assembles (oracles, routers,
/// executor).
pub type PairProcessor = Arc<dyn Fn(crate::model::Pair) -> BoxedOutcomeFuture + Send + Sync>;

pub type BoxedOutcomeFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = PairOutcome> + Send>>;

/// Bounded pool of N workers (one per funded signer account), each
/// cooperatively pulling from the shared `OrderRegistry`. No global lock:
/// the registry's readers-writer discipline is the only shared mutable
/// state (§4.8).
pub struct WorkerScheduler {
    registry: OrderRegistry,
    worker_count: usize,
    idle_backoff: Duration,
}

impl WorkerScheduler {
    pub fn new(registry: OrderRegistry, worker_count: usize, idle_backoff: Duration) -> Self {
        Self { registry, worker_count, idle_backoff }
    }

    /// Run until `shutdown` is cancelled. Spawns `worker_count` tasks,
    /// each looping: pull a pair, process it, repeat. When the registry
    /// has nothing to offer, a worker backs off rather than busy-polling
    /// the indexer harder than it is consumed (§5 back-pressure).
    pub async fn run(self: Arc<Self>, processor: PairProcessor, shutdown: ShutdownSignal) {
        let mut handles = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let scheduler = self.clone();
            let processor = processor.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                scheduler.worker_loop(worker_id, processor, shutdown).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn worker_loop(&self, worker_id: usize, processor: PairProcessor, shutdown: ShutdownSignal) {
        loop {
            if shutdown.is_cancelled() {
                info!(worker_id, "worker shutting down");
                return;
            }

            let pair = tokio::select! {
                pair = self.registry.next_pair() => pair,
                _ = shutdown.cancelled_fut() => return,
            };

            let Some(pair) = pair else {
                tokio::time::sleep(self.idle_backoff).await;
                continue;
            };

            let outcome = processor(pair).await;
            if let PairOutcome::TxFailed { .. } = &outcome {
                warn!(worker_id, ?outcome, "pair attempt ended in tx failure");
            }
        }
    }
}
