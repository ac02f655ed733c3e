//! `bgdl status` – show every request in the queue.

use anyhow::Result;
use bgdl_core::config::BgdlConfig;
use bgdl_core::queue::Partitions;
use bgdl_core::store::SlotStore;
use bgdl_core::TransferRecord;
use std::sync::Arc;

pub async fn run_status(cfg: &BgdlConfig, slots: Arc<dyn SlotStore>) -> Result<()> {
    // Read-only: no engine, no recovery.
    let partitions = Partitions::open(&cfg.queue_name, slots).await;
    let records = partitions.all().await;
    if records.is_empty() {
        println!("No downloads in queue.");
        return Ok(());
    }
    println!("{:<32} {:<9} {:<16} {}", "NAME", "STATE", "PROGRESS", "URL");
    for r in &records {
        println!(
            "{:<32} {:<9} {:<16} {}",
            r.file_name(),
            r.state,
            progress_cell(r),
            r.request.url
        );
    }
    Ok(())
}

pub(crate) fn progress_cell(record: &TransferRecord) -> String {
    match record.progress {
        None => "-".to_string(),
        Some(p) => match p.percent() {
            Some(pct) => format!("{:.1}%", pct),
            None => format!("{} B", p.downloaded),
        },
    }
}
