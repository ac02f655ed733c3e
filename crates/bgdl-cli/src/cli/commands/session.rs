//! Manager, curl engine and progress printer wired together for one CLI run.

use anyhow::Result;
use bgdl_core::config::BgdlConfig;
use bgdl_core::engine::{CurlEngine, EngineOptions};
use bgdl_core::observer::{DedicatedWorker, DeliveryContext};
use bgdl_core::queue::{QueueManager, QueueOptions};
use bgdl_core::store::SlotStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cli::progress::ProgressPrinter;

pub struct Session {
    pub manager: Arc<QueueManager>,
    observers: Arc<DedicatedWorker>,
    pump: JoinHandle<()>,
}

impl Session {
    /// Open the queue (recovering interrupted work) on a fresh curl engine.
    pub async fn open(cfg: &BgdlConfig, slots: Arc<dyn SlotStore>) -> Result<Self> {
        let (engine, events) = CurlEngine::new(EngineOptions::from(&cfg.engine));
        let observers = Arc::new(DedicatedWorker::spawn("bgdl-observers")?);
        let manager = QueueManager::open(
            QueueOptions::from(cfg),
            slots,
            Arc::new(engine),
            Arc::clone(&observers) as Arc<dyn DeliveryContext>,
        )
        .await;
        manager.subscribe(Arc::new(ProgressPrinter::new()));
        let pump = manager.spawn_event_loop(events);
        Ok(Self {
            manager,
            observers,
            pump,
        })
    }

    /// Wait for the queue to go idle, then print a summary.
    pub async fn run_until_idle(self) -> Result<()> {
        self.manager.wait_idle().await;
        let observers = Arc::clone(&self.observers);
        tokio::task::spawn_blocking(move || observers.flush()).await?;
        self.pump.abort();

        let counts = self.manager.counts();
        println!(
            "Queue idle: {} finished, {} failed",
            counts.finished, counts.errored
        );
        tracing::info!(
            finished = counts.finished,
            errored = counts.errored,
            "queue run complete"
        );
        Ok(())
    }
}
