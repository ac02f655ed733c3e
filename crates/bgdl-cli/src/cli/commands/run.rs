//! `bgdl run` – resume the queue and run it until idle.

use anyhow::Result;
use bgdl_core::config::BgdlConfig;
use bgdl_core::store::SlotStore;
use std::sync::Arc;

use super::session::Session;

pub async fn run_queue(cfg: &BgdlConfig, slots: Arc<dyn SlotStore>) -> Result<()> {
    let session = Session::open(cfg, slots).await?;
    if session.manager.counts().is_idle() {
        println!("No queued downloads.");
        return Ok(());
    }
    session.run_until_idle().await
}
