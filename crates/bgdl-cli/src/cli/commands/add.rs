//! `bgdl add <url>...` – queue URLs and download them.

use anyhow::{bail, Result};
use bgdl_core::config::BgdlConfig;
use bgdl_core::import;
use bgdl_core::store::SlotStore;
use std::path::Path;
use std::sync::Arc;

use super::session::Session;

pub async fn run_add(
    cfg: &BgdlConfig,
    slots: Arc<dyn SlotStore>,
    urls: &[String],
    name: Option<&str>,
    dir: &Path,
) -> Result<()> {
    if name.is_some() && urls.len() > 1 {
        bail!("--name applies to a single URL, got {}", urls.len());
    }
    let requests = urls
        .iter()
        .map(|url| import::request_for(url, name, dir))
        .collect::<Result<Vec<_>>>()?;

    let session = Session::open(cfg, slots).await?;
    let outcome = session.manager.enqueue(requests).await;
    println!(
        "Queued {} download(s): {} started, {} waiting",
        outcome.admitted + outcome.deferred,
        outcome.admitted,
        outcome.deferred
    );
    session.run_until_idle().await
}
