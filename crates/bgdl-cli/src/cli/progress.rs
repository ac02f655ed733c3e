//! Observer that prints queue activity to stdout.

use bgdl_core::observer::Observer;
use bgdl_core::{DownloadRequest, Progress, TransferError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Prints one line per transition and throttled progress lines per file.
#[derive(Default)]
pub struct ProgressPrinter {
    last_print: Mutex<HashMap<String, Instant>>,
}

impl ProgressPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a progress line for `name` is due, and records it as printed.
    fn due(&self, name: &str, now: Instant) -> bool {
        let mut last = self.last_print.lock().unwrap_or_else(|e| e.into_inner());
        match last.get(name) {
            Some(at) if now.duration_since(*at) < PROGRESS_INTERVAL => false,
            _ => {
                last.insert(name.to_string(), now);
                true
            }
        }
    }

    fn forget(&self, name: &str) {
        self.last_print
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }
}

pub(crate) fn progress_line(name: &str, progress: Progress) -> String {
    let done_mib = progress.downloaded as f64 / 1_048_576.0;
    match progress.percent() {
        Some(pct) => {
            let total_mib = progress.total as f64 / 1_048_576.0;
            format!("  {name}: {done_mib:.1} / {total_mib:.1} MiB ({pct:.1}%)")
        }
        None => format!("  {name}: {done_mib:.1} MiB"),
    }
}

impl Observer for ProgressPrinter {
    fn on_request_started(&self, request: &DownloadRequest) {
        println!("started  {}", request.file_name);
    }

    fn on_download_progress(&self, request: &DownloadRequest, progress: Progress) {
        if self.due(&request.file_name, Instant::now()) {
            println!("{}", progress_line(&request.file_name, progress));
        }
    }

    fn on_request_finished(&self, request: &DownloadRequest) {
        self.forget(&request.file_name);
        println!(
            "finished {} -> {}",
            request.file_name,
            request.destination_path.display()
        );
    }

    fn on_request_failed(&self, request: &DownloadRequest, error: &TransferError) {
        self.forget(&request.file_name);
        println!("failed   {}: {}", request.file_name, error);
    }

    fn on_request_cancelled(&self, request: &DownloadRequest) {
        self.forget(&request.file_name);
        println!("cancelled {}", request.file_name);
    }
}
