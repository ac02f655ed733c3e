//! Engine double: records submissions and cancellations; tests drive the
//! queue's event handlers themselves.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use bgdl_core::engine::EngineError;
use bgdl_core::{TaskHandle, TransferEngine};

#[derive(Default)]
pub struct ManualEngine {
    next: AtomicU64,
    submitted: Mutex<Vec<(TaskHandle, String)>>,
    cancelled: Mutex<Vec<TaskHandle>>,
    live: Mutex<HashSet<TaskHandle>>,
    refuse: AtomicBool,
}

impl ManualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<(TaskHandle, String)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn handles(&self) -> Vec<TaskHandle> {
        self.submitted().into_iter().map(|(h, _)| h).collect()
    }

    /// Handle of the most recent submission of `url`.
    pub fn handle_for(&self, url: &str) -> TaskHandle {
        self.submitted()
            .into_iter()
            .rev()
            .find(|(_, u)| u == url)
            .map(|(h, _)| h)
            .unwrap_or_else(|| panic!("{url} was never submitted"))
    }

    pub fn cancelled(&self) -> Vec<TaskHandle> {
        self.cancelled.lock().unwrap().clone()
    }

    /// Make every following `submit` fail.
    pub fn refuse_submissions(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Mark a transfer done from the engine's side.
    pub fn retire(&self, handle: TaskHandle) {
        self.live.lock().unwrap().remove(&handle);
    }
}

impl TransferEngine for ManualEngine {
    fn submit(&self, url: &str) -> Result<TaskHandle, EngineError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(EngineError::Closed);
        }
        let handle = TaskHandle(self.next.fetch_add(1, Ordering::SeqCst) + 1);
        self.submitted.lock().unwrap().push((handle, url.to_string()));
        self.live.lock().unwrap().insert(handle);
        Ok(handle)
    }

    fn cancel(&self, handle: TaskHandle) {
        self.cancelled.lock().unwrap().push(handle);
        self.live.lock().unwrap().remove(&handle);
    }

    fn in_flight(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

/// Write a finished body where an engine would leave it.
pub fn stage_body(dir: &Path, handle: TaskHandle, body: &[u8]) -> PathBuf {
    let path = dir.join(format!("staged-{}.part", handle.0));
    std::fs::write(&path, body).unwrap();
    path
}
