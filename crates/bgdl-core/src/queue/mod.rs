//! Download queue coordinator.
//!
//! Requests move through four persisted partitions (waiting, started,
//! finished, errored). Admission keeps the started partition at or below the
//! concurrency limit; engine events drive records to a terminal partition and
//! free slots for waiting work. Every transition happens under one
//! queue-wide lock, so a reader never sees a record in two partitions.

mod admission;
mod events;
mod lifecycle;
mod partitions;

pub use partitions::{slot_key, Partitions, QueueCounts};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::config::BgdlConfig;
use crate::engine::TransferEngine;
use crate::model::{LifecycleState, TaskHandle, TransferRecord};
use crate::observer::{DeliveryContext, Observer, ObserverRegistry, QueueEvent, SubscriptionId};
use crate::store::SlotStore;

/// When waiting work is admitted after a slot frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillPolicy {
    /// Top up to the limit after every terminal event.
    #[default]
    Eager,
    /// Wait until nothing is in flight, then admit a full batch.
    OnDrain,
}

#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub name: String,
    pub limit: usize,
    pub refill_policy: RefillPolicy,
    /// Applied to requests that carry no timeout of their own.
    pub default_timeout: Option<Duration>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self::from(&BgdlConfig::default())
    }
}

impl From<&BgdlConfig> for QueueOptions {
    fn from(cfg: &BgdlConfig) -> Self {
        Self {
            name: cfg.queue_name.clone(),
            limit: cfg.concurrency_limit,
            refill_policy: cfg.refill_policy,
            default_timeout: cfg.transfer_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// How an `enqueue` batch was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnqueueOutcome {
    /// Submitted to the engine right away.
    pub admitted: usize,
    /// Appended to the waiting partition.
    pub deferred: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("no queued or running request named {0:?}")]
    UnknownRequest(String),
    #[error("request {name:?} is already {state}")]
    AlreadyTerminal { name: String, state: LifecycleState },
}

pub struct QueueManager {
    me: Weak<QueueManager>,
    partitions: Partitions,
    engine: Arc<dyn TransferEngine>,
    observers: ObserverRegistry,
    options: QueueOptions,
    /// Held for writing by every transition, for reading by snapshots.
    transition: RwLock<()>,
    /// Handles the queue itself cancelled; their late engine events are expected.
    retired: Mutex<HashSet<TaskHandle>>,
    counts: watch::Sender<QueueCounts>,
}

impl QueueManager {
    /// Load the queue's partitions from `store`, recover work interrupted by
    /// a previous run, and admit up to the limit.
    pub async fn open(
        options: QueueOptions,
        store: Arc<dyn SlotStore>,
        engine: Arc<dyn TransferEngine>,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Arc<Self> {
        let mut options = options;
        if options.limit == 0 {
            tracing::warn!(queue = %options.name, "concurrency limit 0 raised to 1");
            options.limit = 1;
        }
        let partitions = Partitions::open(&options.name, store).await;
        let (counts, _) = watch::channel(partitions.counts().await);
        let manager = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            partitions,
            engine,
            observers: ObserverRegistry::new(delivery),
            options,
            transition: RwLock::new(()),
            retired: Mutex::new(HashSet::new()),
            counts,
        });
        manager.recover().await;
        manager
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Every record: waiting, then started, finished, errored.
    pub async fn get_all(&self) -> Vec<TransferRecord> {
        let _transition = self.transition.read().await;
        self.partitions.all().await
    }

    /// State of the record named `file_name`; `Waiting` when there is none.
    pub async fn get_state(&self, file_name: &str) -> LifecycleState {
        self.lookup(file_name)
            .await
            .map(|r| r.state)
            .unwrap_or(LifecycleState::Waiting)
    }

    pub async fn lookup(&self, file_name: &str) -> Option<TransferRecord> {
        let _transition = self.transition.read().await;
        self.partitions.find(file_name).await
    }

    /// Counts as of the last transition.
    pub fn counts(&self) -> QueueCounts {
        *self.counts.borrow()
    }

    /// Resolve once nothing is waiting or in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.counts.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(QueueCounts::is_idle).await;
    }

    fn notify(&self, event: QueueEvent) {
        self.observers.notify_all(event);
    }

    async fn publish_counts(&self) {
        let counts = self.partitions.counts().await;
        self.counts.send_replace(counts);
    }

    fn retire(&self, handle: TaskHandle) {
        self.retired
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle);
        self.engine.cancel(handle);
    }

    /// True if `handle` was cancelled by the queue. Terminal events also
    /// forget the handle.
    fn is_retired(&self, handle: TaskHandle, terminal: bool) -> bool {
        let mut retired = self.retired.lock().unwrap_or_else(|e| e.into_inner());
        if terminal {
            retired.remove(&handle)
        } else {
            retired.contains(&handle)
        }
    }
}
