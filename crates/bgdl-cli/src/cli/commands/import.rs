//! `bgdl import <path>` – queue a download list as one batch.

use anyhow::{bail, Result};
use bgdl_core::config::BgdlConfig;
use bgdl_core::import;
use bgdl_core::store::SlotStore;
use std::path::Path;
use std::sync::Arc;

use super::session::Session;

pub async fn run_import(
    cfg: &BgdlConfig,
    slots: Arc<dyn SlotStore>,
    path: &Path,
    dir: &Path,
) -> Result<()> {
    let requests = import::read_list(path, dir)?;
    if requests.is_empty() {
        bail!("{} lists no downloads", path.display());
    }
    let count = requests.len();

    let session = Session::open(cfg, slots).await?;
    let outcome = session.manager.enqueue(requests).await;
    println!(
        "Imported {count} entr{} from {}: {} started, {} waiting",
        if count == 1 { "y" } else { "ies" },
        path.display(),
        outcome.admitted,
        outcome.deferred
    );
    session.run_until_idle().await
}
