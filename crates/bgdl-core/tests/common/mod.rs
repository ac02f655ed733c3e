#![allow(dead_code)]

pub mod file_server;
pub mod manual_engine;

use std::sync::Arc;

use bgdl_core::observer::{EventForwarder, Inline, QueueEvent};
use bgdl_core::queue::{QueueManager, QueueOptions, RefillPolicy};
use bgdl_core::store::{MemoryStore, SlotStore};
use bgdl_core::{DownloadRequest, TransferEngine};
use tokio::sync::mpsc::UnboundedReceiver;

use manual_engine::ManualEngine;

pub fn options(limit: usize) -> QueueOptions {
    QueueOptions {
        name: "test_queue".to_string(),
        limit,
        refill_policy: RefillPolicy::Eager,
        default_timeout: None,
    }
}

/// Manager over a scripted engine, with observer events captured on a channel.
pub struct Harness {
    pub manager: Arc<QueueManager>,
    pub engine: Arc<ManualEngine>,
    pub store: Arc<dyn SlotStore>,
    pub events: UnboundedReceiver<QueueEvent>,
}

impl Harness {
    pub async fn new(options: QueueOptions) -> Self {
        Self::with_store(options, Arc::new(MemoryStore::new())).await
    }

    pub async fn with_store(options: QueueOptions, store: Arc<dyn SlotStore>) -> Self {
        let engine = Arc::new(ManualEngine::new());
        let manager = QueueManager::open(
            options,
            Arc::clone(&store),
            Arc::clone(&engine) as Arc<dyn TransferEngine>,
            Arc::new(Inline),
        )
        .await;
        let (forwarder, events) = EventForwarder::channel();
        manager.subscribe(Arc::new(forwarder));
        Self {
            manager,
            engine,
            store,
            events,
        }
    }

    /// Observer events delivered so far.
    pub fn drain_events(&mut self) -> Vec<QueueEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

/// `count` requests named `file-<i>.bin` under `dir`.
pub fn requests(dir: &std::path::Path, count: usize) -> Vec<DownloadRequest> {
    (0..count).map(|i| request(dir, &format!("file-{i}.bin"))).collect()
}

pub fn request(dir: &std::path::Path, name: &str) -> DownloadRequest {
    DownloadRequest::new(format!("https://example.com/{name}"), name, dir.join(name))
}
