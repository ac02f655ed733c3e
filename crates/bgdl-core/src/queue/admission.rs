//! Enqueueing and slot refill.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{EnqueueOutcome, QueueManager, RefillPolicy};
use crate::engine::TransferError;
use crate::model::{DownloadRequest, LifecycleState, TaskHandle, TransferRecord};
use crate::observer::QueueEvent;
use crate::planner;

impl QueueManager {
    /// Add a batch of requests.
    ///
    /// A request whose file name is already known replaces the old record
    /// (cancelling its transfer if one is running); within the batch the last
    /// request for a name wins. With nothing in flight the head of the batch,
    /// up to the limit, is submitted immediately and the rest waits; otherwise
    /// the whole batch waits behind the current work.
    pub async fn enqueue(&self, requests: Vec<DownloadRequest>) -> EnqueueOutcome {
        let batch = last_wins(requests);
        if batch.is_empty() {
            return EnqueueOutcome::default();
        }
        let _transition = self.transition.write().await;

        for request in &batch {
            if let Some(old) = self.evict(&request.file_name).await {
                info!(file = %request.file_name, was = %old.state, "replacing existing request");
            }
        }

        let (head, tail) = if self.partitions.started.is_empty().await {
            planner::split(batch, self.options.limit)
        } else {
            (Vec::new(), batch)
        };

        let mut admitted = 0;
        for request in head {
            if self.admit(request).await.is_some() {
                admitted += 1;
            }
        }
        let deferred = tail.len();
        self.partitions
            .waiting
            .append_all(tail.into_iter().map(TransferRecord::waiting))
            .await;

        self.publish_counts().await;
        info!(queue = %self.options.name, admitted, deferred, "batch enqueued");
        EnqueueOutcome { admitted, deferred }
    }

    /// Admit waiting work into free slots according to the refill policy.
    /// Returns how many transfers were submitted. Safe to call at any time;
    /// a call with no free slot or no waiting work changes nothing.
    pub async fn refill(&self) -> usize {
        let _transition = self.transition.write().await;
        let admitted = self.admit_waiting().await;
        self.publish_counts().await;
        admitted
    }

    /// Free slots under the current policy. Caller holds the transition lock.
    pub(super) async fn free_slots(&self) -> usize {
        let started = self.partitions.started.len().await;
        match self.options.refill_policy {
            RefillPolicy::Eager => self.options.limit.saturating_sub(started),
            RefillPolicy::OnDrain if started == 0 => self.options.limit,
            RefillPolicy::OnDrain => 0,
        }
    }

    /// Move waiting records, oldest first, into free slots. Caller holds the
    /// transition lock.
    pub(super) async fn admit_waiting(&self) -> usize {
        let free = self.free_slots().await;
        let mut admitted = 0;
        while admitted < free {
            let Some(next) = self.partitions.waiting.get(0).await else {
                break;
            };
            // The started (or errored) write lands before the waiting entry
            // goes, so an interrupted move leaves a duplicate, never a loss.
            if self.admit(next.request).await.is_some() {
                admitted += 1;
            }
            self.partitions.waiting.remove_at(0).await;
        }
        if admitted > 0 {
            debug!(queue = %self.options.name, admitted, "refilled free slots");
        }
        admitted
    }

    /// Submit one request and record the outcome in the started or errored
    /// partition. Caller holds the transition lock, so engine events for the
    /// new handle are not processed before the record exists.
    pub(super) async fn admit(&self, request: DownloadRequest) -> Option<TaskHandle> {
        match self.engine.submit(&request.url) {
            Ok(handle) => {
                info!(%handle, file = %request.file_name, url = %request.url, "transfer admitted");
                self.arm_timeout(handle, &request);
                self.partitions
                    .started
                    .append(TransferRecord::started(request, handle))
                    .await;
                Some(handle)
            }
            Err(e) => {
                warn!(file = %request.file_name, "engine refused transfer: {}", e);
                let error = TransferError::Submit(e.to_string());
                self.partitions
                    .errored
                    .append(TransferRecord::waiting(request.clone()).fail())
                    .await;
                self.notify(QueueEvent::Failed(request, error));
                None
            }
        }
    }

    /// Drop every record named `file_name` from all partitions, cancelling
    /// the transfer of a started one. Caller holds the transition lock.
    pub(super) async fn evict(&self, file_name: &str) -> Option<TransferRecord> {
        let mut found = None;
        for state in [
            LifecycleState::Waiting,
            LifecycleState::Started,
            LifecycleState::Finished,
            LifecycleState::Errored,
        ] {
            if let Some(record) = self.partitions.remove_named(state, file_name).await {
                if let Some(handle) = record.handle.filter(|_| state == LifecycleState::Started) {
                    self.retire(handle);
                }
                found.get_or_insert(record);
            }
        }
        found
    }
}

/// Keep the last request per file name, at the position of that last one.
fn last_wins(requests: Vec<DownloadRequest>) -> Vec<DownloadRequest> {
    let mut seen = HashSet::new();
    let mut kept: Vec<DownloadRequest> = requests
        .into_iter()
        .rev()
        .filter(|r| seen.insert(r.file_name.clone()))
        .collect();
    kept.reverse();
    kept
}
