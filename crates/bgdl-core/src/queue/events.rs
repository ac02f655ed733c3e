//! Engine event handling.
//!
//! Events are matched to records by handle, searching only the started
//! partition. An event for a handle the queue no longer tracks is logged and
//! dropped.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::QueueManager;
use crate::engine::{relocate_artifact, EngineEvent, EventStream, TransferError};
use crate::model::{LifecycleState, Progress, TaskHandle, TransferRecord};
use crate::observer::QueueEvent;

impl QueueManager {
    /// Consume engine events until the stream closes.
    pub async fn run_events(&self, mut events: EventStream) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!(queue = %self.options.name, "engine event stream closed");
    }

    /// Run [`run_events`](Self::run_events) on a spawned task.
    pub fn spawn_event_loop(self: &Arc<Self>, events: EventStream) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_events(events).await })
    }

    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress {
                handle,
                bytes_written,
                total_expected,
            } => self.on_progress(handle, bytes_written, total_expected).await,
            EngineEvent::Completed { handle, location } => {
                self.on_completed(handle, location).await
            }
            EngineEvent::Failed { handle, error } => self.on_failed(handle, error).await,
            EngineEvent::Drained => self.on_drained().await,
        }
    }

    /// Record progress. The first report for a transfer tells observers it
    /// started; later ones carry the updated counts.
    pub async fn on_progress(&self, handle: TaskHandle, bytes_written: u64, total_expected: u64) {
        let _transition = self.transition.write().await;
        if self.partitions.find_started(handle).await.is_none() {
            self.unknown_handle(handle, "progress", false);
            return;
        }
        let progress = Progress::new(bytes_written, total_expected);
        let updated = self
            .partitions
            .started
            .with_write_lock(|items| {
                let record = items.iter_mut().find(|r| r.handle == Some(handle))?;
                let first = record.progress.is_none();
                record.progress = Some(progress);
                Some((record.request.clone(), first))
            })
            .await;
        match updated {
            Some((request, true)) => {
                debug!(%handle, file = %request.file_name, "first bytes received");
                self.notify(QueueEvent::Started(request));
            }
            Some((request, false)) => self.notify(QueueEvent::Progress(request, progress)),
            None => {}
        }
    }

    /// Move the finished body into place and retire the record as finished,
    /// or as errored if the move fails. Frees a slot.
    pub async fn on_completed(&self, handle: TaskHandle, location: PathBuf) {
        let _transition = self.transition.write().await;
        let Some(record) = self.partitions.find_started(handle).await else {
            self.unknown_handle(handle, "completion", true);
            discard_artifact(&location).await;
            return;
        };
        let destination = record.request.destination_path.clone();
        match relocate_artifact(&location, &destination).await {
            Ok(()) => {
                info!(
                    %handle,
                    file = %record.file_name(),
                    dest = %destination.display(),
                    "transfer finished"
                );
                let request = record.request.clone();
                self.settle(handle, record.finish()).await;
                self.notify(QueueEvent::Finished(request));
            }
            Err(error) => {
                warn!(%handle, file = %record.file_name(), "{}", error);
                discard_artifact(&location).await;
                let request = record.request.clone();
                self.settle(handle, record.fail()).await;
                self.notify(QueueEvent::Failed(request, error));
            }
        }
        self.after_terminal().await;
    }

    /// Retire the record as errored. Frees a slot.
    pub async fn on_failed(&self, handle: TaskHandle, error: TransferError) {
        let _transition = self.transition.write().await;
        if self.partitions.find_started(handle).await.is_none() {
            self.unknown_handle(handle, "failure", true);
            return;
        }
        self.fail_started(handle, error).await;
        self.after_terminal().await;
    }

    /// The engine has nothing in flight; admit waiting work.
    pub async fn on_drained(&self) {
        let _transition = self.transition.write().await;
        let admitted = self.admit_waiting().await;
        self.publish_counts().await;
        debug!(queue = %self.options.name, admitted, "engine drained");
    }

    /// Move a started record to errored and notify. Caller holds the
    /// transition lock and has checked that `handle` is started.
    pub(super) async fn fail_started(&self, handle: TaskHandle, error: TransferError) {
        let Some(record) = self.partitions.find_started(handle).await else {
            return;
        };
        warn!(%handle, file = %record.file_name(), "transfer failed: {}", error);
        let request = record.request.clone();
        self.settle(handle, record.fail()).await;
        self.notify(QueueEvent::Failed(request, error));
    }

    /// Append `record` to its terminal partition, then drop the started
    /// entry for `handle`.
    async fn settle(&self, handle: TaskHandle, record: TransferRecord) {
        let target = match record.state {
            LifecycleState::Finished => &self.partitions.finished,
            _ => &self.partitions.errored,
        };
        target.append(record).await;
        self.partitions
            .started
            .with_write_lock(|items| items.retain(|r| r.handle != Some(handle)))
            .await;
    }

    /// Refill after a slot was freed, then publish counts.
    pub(super) async fn after_terminal(&self) {
        self.admit_waiting().await;
        self.publish_counts().await;
    }

    fn unknown_handle(&self, handle: TaskHandle, what: &str, terminal: bool) {
        if self.is_retired(handle, terminal) {
            debug!(%handle, "{} for cancelled transfer dropped", what);
        } else {
            warn!(%handle, "{} for unknown transfer ignored", what);
        }
    }
}

async fn discard_artifact(location: &std::path::Path) {
    if let Err(e) = tokio::fs::remove_file(location).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %location.display(), "could not remove temp file: {}", e);
        }
    }
}
