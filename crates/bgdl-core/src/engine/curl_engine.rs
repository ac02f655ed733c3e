//! libcurl-backed engine: one worker thread per transfer, body streamed to a
//! temp file, events sent on the shared channel.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{
    AbortTokens, EngineError, EngineEvent, EventSink, EventStream, TransferEngine, TransferError,
};
use crate::config::EngineConfig;
use crate::model::TaskHandle;

/// Tuning for each curl transfer.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub connect_timeout: Duration,
    /// Abort when slower than this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Where in-progress bodies are written (`bgdl-<handle>-<random>.part`).
    pub temp_dir: PathBuf,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            temp_dir: cfg.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
        }
    }
}

pub struct CurlEngine {
    options: Arc<EngineOptions>,
    events: EventSink,
    tokens: Arc<AbortTokens>,
    in_flight: Arc<AtomicUsize>,
    next_handle: AtomicU64,
}

impl CurlEngine {
    /// Create the engine and the receiving end of its event channel.
    pub fn new(options: EngineOptions) -> (Self, EventStream) {
        let (events, stream) = super::event_channel();
        let engine = Self {
            options: Arc::new(options),
            events,
            tokens: Arc::new(AbortTokens::new()),
            in_flight: Arc::new(AtomicUsize::new(0)),
            next_handle: AtomicU64::new(1),
        };
        (engine, stream)
    }
}

impl TransferEngine for CurlEngine {
    fn submit(&self, url: &str) -> Result<TaskHandle, EngineError> {
        if self.events.is_closed() {
            return Err(EngineError::Closed);
        }
        let handle = TaskHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let job = TransferJob {
            handle,
            url: url.to_string(),
            abort: self.tokens.register(handle),
            options: Arc::clone(&self.options),
            events: self.events.clone(),
        };
        let tokens = Arc::clone(&self.tokens);
        let in_flight = Arc::clone(&self.in_flight);
        let events = self.events.clone();

        in_flight.fetch_add(1, Ordering::AcqRel);
        let spawned = std::thread::Builder::new()
            .name(format!("bgdl-transfer-{}", handle.0))
            .spawn(move || {
                let terminal = job.run();
                let _ = events.send(terminal);
                tokens.unregister(handle);
                if in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                    let _ = events.send(EngineEvent::Drained);
                }
            });
        if let Err(e) = spawned {
            self.tokens.unregister(handle);
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(EngineError::Spawn(e));
        }
        tracing::debug!(%handle, url, "transfer submitted");
        Ok(handle)
    }

    fn cancel(&self, handle: TaskHandle) {
        if self.tokens.request_abort(handle) {
            tracing::debug!(%handle, "transfer abort requested");
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

struct TransferJob {
    handle: TaskHandle,
    url: String,
    abort: Arc<AtomicBool>,
    options: Arc<EngineOptions>,
    events: EventSink,
}

impl TransferJob {
    /// Perform the transfer and build its terminal event.
    fn run(self) -> EngineEvent {
        match self.perform() {
            Ok(location) => EngineEvent::Completed {
                handle: self.handle,
                location,
            },
            Err(error) => {
                tracing::debug!(handle = %self.handle, "transfer failed: {}", error);
                EngineEvent::Failed {
                    handle: self.handle,
                    error,
                }
            }
        }
    }

    /// Stream the body into a fresh part file and return its path. The part
    /// file is removed on every error path when `part` drops.
    fn perform(&self) -> Result<PathBuf, TransferError> {
        let transport = |e: curl::Error| TransferError::Transport(e.to_string());
        let io = |e: std::io::Error| TransferError::Io(e.to_string());
        let part = tempfile::Builder::new()
            .prefix(&format!("bgdl-{}-", self.handle.0))
            .suffix(".part")
            .tempfile_in(&self.options.temp_dir)
            .map_err(io)?;
        let mut file: &File = part.as_file();

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.url).map_err(transport)?;
        easy.follow_location(true).map_err(transport)?;
        easy.max_redirections(10).map_err(transport)?;
        easy.connect_timeout(self.options.connect_timeout)
            .map_err(transport)?;
        easy.low_speed_limit(self.options.low_speed_limit)
            .map_err(transport)?;
        easy.low_speed_time(self.options.low_speed_time)
            .map_err(transport)?;
        easy.progress(true).map_err(transport)?;

        let mut write_error: Option<std::io::Error> = None;
        let mut last_reported = 0u64;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match file.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        write_error = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(transport)?;
            transfer
                .progress_function(|dl_total, dl_now, _, _| {
                    if self.abort.load(Ordering::Relaxed) {
                        return false;
                    }
                    let now = dl_now.max(0.0) as u64;
                    if now > last_reported {
                        last_reported = now;
                        let _ = self.events.send(EngineEvent::Progress {
                            handle: self.handle,
                            bytes_written: now,
                            total_expected: dl_total.max(0.0) as u64,
                        });
                    }
                    true
                })
                .map_err(transport)?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if self.abort.load(Ordering::Relaxed) {
                return Err(TransferError::Cancelled);
            }
            if let Some(e) = write_error {
                return Err(io(e));
            }
            if e.is_operation_timedout() {
                return Err(TransferError::TimedOut);
            }
            return Err(transport(e));
        }

        // 0 means a non-HTTP scheme (file://, ftp:// ...) without a status line.
        let code = easy.response_code().map_err(transport)?;
        if code != 0 && !(200..300).contains(&code) {
            return Err(TransferError::Http(code));
        }
        file.flush().map_err(io)?;
        let (_, location) = part.keep().map_err(|e| io(e.error))?;
        Ok(location)
    }
}
