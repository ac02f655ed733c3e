//! Cancellation, per-transfer timeouts and startup recovery.

use tracing::{debug, info};

use super::{QueueError, QueueManager};
use crate::engine::TransferError;
use crate::model::{DownloadRequest, LifecycleState, TaskHandle, TransferRecord};
use crate::observer::QueueEvent;

impl QueueManager {
    /// Remove a waiting or started request. A running transfer is cancelled
    /// in the engine and its slot refilled.
    pub async fn cancel(&self, file_name: &str) -> Result<TransferRecord, QueueError> {
        let _transition = self.transition.write().await;
        let record = match self.partitions.find(file_name).await {
            None => return Err(QueueError::UnknownRequest(file_name.to_string())),
            Some(r) if r.state.is_terminal() => {
                return Err(QueueError::AlreadyTerminal {
                    name: file_name.to_string(),
                    state: r.state,
                })
            }
            Some(r) => r,
        };
        self.partitions.remove_named(record.state, file_name).await;
        if let Some(handle) = record.handle.filter(|_| record.state == LifecycleState::Started) {
            self.retire(handle);
        }
        info!(file = %file_name, was = %record.state, "request cancelled");
        self.notify(QueueEvent::Cancelled(record.request.clone()));
        self.after_terminal().await;
        Ok(record)
    }

    /// Fail `handle` with [`TransferError::TimedOut`] if it is still running
    /// once its timeout elapses. Caller holds the transition lock.
    pub(super) fn arm_timeout(&self, handle: TaskHandle, request: &DownloadRequest) {
        let Some(timeout) = request.timeout().or(self.options.default_timeout) else {
            return;
        };
        let me = self.me.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(manager) = me.upgrade() {
                manager.expire(handle).await;
            }
        });
        debug!(%handle, ?timeout, "transfer timeout armed");
    }

    async fn expire(&self, handle: TaskHandle) {
        let _transition = self.transition.write().await;
        if self.partitions.find_started(handle).await.is_none() {
            return;
        }
        self.retire(handle);
        self.fail_started(handle, TransferError::TimedOut).await;
        self.after_terminal().await;
    }

    /// Requeue work a previous run left started, reset waiting records, and
    /// admit up to the limit. Interrupted transfers go to the front of the
    /// waiting partition in their original order.
    pub(super) async fn recover(&self) {
        let _transition = self.transition.write().await;
        let duplicates = self.partitions.dedupe().await;

        let stale = self.partitions.started.snapshot().await;
        if !stale.is_empty() {
            // Waiting is written before started is cleared; a crash in
            // between leaves duplicates for the next dedupe.
            self.partitions
                .waiting
                .with_write_lock(|items| {
                    let mut requeued: Vec<TransferRecord> =
                        stale.iter().cloned().map(TransferRecord::into_waiting).collect();
                    requeued.append(items);
                    *items = requeued;
                })
                .await;
            self.partitions.started.with_write_lock(|items| items.clear()).await;
        }
        self.partitions
            .waiting
            .replace_each(TransferRecord::into_waiting)
            .await;

        let admitted = self.admit_waiting().await;
        self.publish_counts().await;
        let counts = self.counts();
        info!(
            queue = %self.options.name,
            interrupted = stale.len(),
            duplicates,
            admitted,
            waiting = counts.waiting,
            finished = counts.finished,
            errored = counts.errored,
            "queue recovered"
        );
    }
}
