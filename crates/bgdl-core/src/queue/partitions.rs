//! The four lifecycle partitions of a queue, each in its own durable slot.

use std::collections::HashSet;
use std::sync::Arc;

use crate::collection::PersistentCollection;
use crate::model::{LifecycleState, TaskHandle, TransferRecord};
use crate::store::SlotStore;

/// Number of records per partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub waiting: usize,
    pub started: usize,
    pub finished: usize,
    pub errored: usize,
}

impl QueueCounts {
    /// Nothing waiting and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.waiting == 0 && self.started == 0
    }
}

pub struct Partitions {
    pub waiting: PersistentCollection<TransferRecord>,
    pub started: PersistentCollection<TransferRecord>,
    pub finished: PersistentCollection<TransferRecord>,
    pub errored: PersistentCollection<TransferRecord>,
}

impl Partitions {
    /// Load `<name>.waiting`, `<name>.started`, `<name>.finished`, `<name>.errored`.
    pub async fn open(name: &str, store: Arc<dyn SlotStore>) -> Self {
        let slot = |state: LifecycleState| slot_key(name, state);
        Self {
            waiting: PersistentCollection::open(
                slot(LifecycleState::Waiting),
                Arc::clone(&store),
            )
            .await,
            started: PersistentCollection::open(
                slot(LifecycleState::Started),
                Arc::clone(&store),
            )
            .await,
            finished: PersistentCollection::open(
                slot(LifecycleState::Finished),
                Arc::clone(&store),
            )
            .await,
            errored: PersistentCollection::open(slot(LifecycleState::Errored), store).await,
        }
    }

    pub fn of(&self, state: LifecycleState) -> &PersistentCollection<TransferRecord> {
        match state {
            LifecycleState::Waiting => &self.waiting,
            LifecycleState::Started => &self.started,
            LifecycleState::Finished => &self.finished,
            LifecycleState::Errored => &self.errored,
        }
    }

    /// Waiting, started, finished, errored, each in stored order.
    pub async fn all(&self) -> Vec<TransferRecord> {
        let mut out = self.waiting.snapshot().await;
        out.extend(self.started.snapshot().await);
        out.extend(self.finished.snapshot().await);
        out.extend(self.errored.snapshot().await);
        out
    }

    pub async fn counts(&self) -> QueueCounts {
        QueueCounts {
            waiting: self.waiting.len().await,
            started: self.started.len().await,
            finished: self.finished.len().await,
            errored: self.errored.len().await,
        }
    }

    /// Record for `file_name`, searching active partitions first.
    pub async fn find(&self, file_name: &str) -> Option<TransferRecord> {
        for state in SEARCH_ORDER {
            let hit = self
                .of(state)
                .with_read_lock(|items| items.iter().find(|r| r.file_name() == file_name).cloned())
                .await;
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    pub async fn find_started(&self, handle: TaskHandle) -> Option<TransferRecord> {
        self.started
            .with_read_lock(|items| items.iter().find(|r| r.handle == Some(handle)).cloned())
            .await
    }

    /// Remove every record named `file_name` from `state`'s partition.
    /// Returns the last one removed; the slot is only rewritten on a hit.
    pub async fn remove_named(
        &self,
        state: LifecycleState,
        file_name: &str,
    ) -> Option<TransferRecord> {
        let part = self.of(state);
        let present = part
            .with_read_lock(|items| items.iter().any(|r| r.file_name() == file_name))
            .await;
        if !present {
            return None;
        }
        part.with_write_lock(|items| {
            let mut removed = None;
            items.retain(|r| {
                if r.file_name() == file_name {
                    removed = Some(r.clone());
                    false
                } else {
                    true
                }
            });
            removed
        })
        .await
    }

    /// Keep one record per file name across all partitions: the one in the
    /// most advanced state (terminal, then started, then waiting), and the
    /// last one within a partition. Returns how many records were dropped.
    ///
    /// Duplicates only appear when the process died between the two writes
    /// of a partition move.
    pub async fn dedupe(&self) -> usize {
        let mut seen: HashSet<String> = HashSet::new();
        let mut dropped = 0;
        for state in DEDUPE_ORDER {
            let part = self.of(state);
            let keep: Vec<bool> = part
                .with_read_lock(|items| {
                    let mut keep = vec![false; items.len()];
                    for (i, r) in items.iter().enumerate().rev() {
                        keep[i] = seen.insert(r.file_name().to_string());
                    }
                    keep
                })
                .await;
            let drop_here = keep.iter().filter(|k| !**k).count();
            if drop_here == 0 {
                continue;
            }
            dropped += drop_here;
            part.with_write_lock(|items| {
                let mut flags = keep.iter();
                items.retain(|_| flags.next().copied().unwrap_or(true));
            })
            .await;
        }
        dropped
    }
}

const SEARCH_ORDER: [LifecycleState; 4] = [
    LifecycleState::Started,
    LifecycleState::Waiting,
    LifecycleState::Finished,
    LifecycleState::Errored,
];

const DEDUPE_ORDER: [LifecycleState; 4] = [
    LifecycleState::Finished,
    LifecycleState::Errored,
    LifecycleState::Started,
    LifecycleState::Waiting,
];

pub fn slot_key(queue_name: &str, state: LifecycleState) -> String {
    format!("{}.{}", queue_name, state.as_str())
}
