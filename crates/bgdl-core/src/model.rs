//! Queue data model: requests, transfer records, lifecycle states and progress.
//!
//! These types are what the queue persists. The serialized shape is stable:
//! `{"handle"?, "request": {"url", "fileName", "destinationPath"}, "state", "progress"?}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine-assigned identifier of an admitted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(pub u64);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One file to fetch. Identity is `file_name`: two requests with the same
/// name are the same logical item and the later one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: String,
    pub file_name: String,
    pub destination_path: PathBuf,
    /// Per-transfer timeout; falls back to the queue default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl DownloadRequest {
    pub fn new(
        url: impl Into<String>,
        file_name: impl Into<String>,
        destination_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
            destination_path: destination_path.into(),
            timeout_secs: None,
        }
    }

    /// Request saved as `dir/<name>`, where the name is derived from the URL path.
    pub fn from_url(url: impl Into<String>, dir: &Path) -> Self {
        let url = url.into();
        let file_name = crate::url_model::derive_filename(&url);
        let destination_path = dir.join(&file_name);
        Self::new(url, file_name, destination_path)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Lifecycle of a record. Transitions only move forward:
/// `Waiting -> Started -> {Finished | Errored}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Waiting,
    Started,
    Errored,
    Finished,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Waiting => "waiting",
            LifecycleState::Started => "started",
            LifecycleState::Errored => "errored",
            LifecycleState::Finished => "finished",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Errored | LifecycleState::Finished)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte progress of a transfer. `total == 0` means the size is not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub downloaded: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(downloaded: u64, total: u64) -> Self {
        Self { downloaded, total }
    }

    /// Fraction complete in [0.0, 1.0], or `None` while the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.downloaded as f64 / self.total as f64).min(1.0))
    }

    /// Percentage in [0.0, 100.0], or `None` while the total is unknown.
    pub fn percent(&self) -> Option<f64> {
        self.fraction().map(|f| f * 100.0)
    }
}

/// A request plus its queue bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<TaskHandle>,
    pub request: DownloadRequest,
    pub state: LifecycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

impl TransferRecord {
    pub fn waiting(request: DownloadRequest) -> Self {
        Self {
            handle: None,
            request,
            state: LifecycleState::Waiting,
            progress: None,
        }
    }

    pub fn started(request: DownloadRequest, handle: TaskHandle) -> Self {
        Self {
            handle: Some(handle),
            request,
            state: LifecycleState::Started,
            progress: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.request.file_name
    }

    /// Same request, back to a fresh waiting record (no handle, no progress).
    pub fn into_waiting(self) -> Self {
        Self::waiting(self.request)
    }

    pub fn finish(mut self) -> Self {
        self.state = LifecycleState::Finished;
        self
    }

    pub fn fail(mut self) -> Self {
        self.state = LifecycleState::Errored;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DownloadRequest {
        DownloadRequest::new(
            "https://example.com/a.bin",
            "a.bin",
            "/tmp/downloads/a.bin",
        )
    }

    #[test]
    fn progress_fraction_undefined_for_unknown_total() {
        assert_eq!(Progress::new(500, 0).fraction(), None);
        assert_eq!(Progress::new(0, 0).percent(), None);
        assert_eq!(Progress::new(50, 200).fraction(), Some(0.25));
        assert_eq!(Progress::new(300, 200).fraction(), Some(1.0));
    }

    #[test]
    fn record_json_shape() {
        let mut record = TransferRecord::started(request(), TaskHandle(7));
        record.progress = Some(Progress::new(10, 100));
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["handle"], 7);
        assert_eq!(json["state"], "started");
        assert_eq!(json["request"]["fileName"], "a.bin");
        assert_eq!(json["request"]["destinationPath"], "/tmp/downloads/a.bin");
        assert_eq!(json["progress"]["downloaded"], 10);
        assert_eq!(json["progress"]["total"], 100);
        assert!(json["request"].get("timeoutSecs").is_none());
    }

    #[test]
    fn waiting_record_omits_handle_and_progress() {
        let json = serde_json::to_string(&TransferRecord::waiting(request())).unwrap();
        assert!(!json.contains("handle"));
        assert!(!json.contains("progress"));
        assert!(json.contains("\"state\":\"waiting\""));
    }

    #[test]
    fn record_decodes_with_null_handle() {
        let json = r#"{
            "handle": null,
            "request": {"url": "https://e.com/x", "fileName": "x", "destinationPath": "/d/x"},
            "state": "errored"
        }"#;
        let record: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.handle, None);
        assert_eq!(record.state, LifecycleState::Errored);
        assert_eq!(record.request.timeout(), None);
    }

    #[test]
    fn into_waiting_clears_handle_and_progress() {
        let mut record = TransferRecord::started(request(), TaskHandle(3));
        record.progress = Some(Progress::new(1, 2));
        let reset = record.into_waiting();
        assert_eq!(reset.state, LifecycleState::Waiting);
        assert_eq!(reset.handle, None);
        assert_eq!(reset.progress, None);
    }

    #[test]
    fn from_url_derives_name_and_destination() {
        let req = DownloadRequest::from_url(
            "https://cdn.example.com/isos/debian-12.iso?sig=1",
            Path::new("/srv/dl"),
        );
        assert_eq!(req.file_name, "debian-12.iso");
        assert_eq!(req.destination_path, PathBuf::from("/srv/dl/debian-12.iso"));
    }
}
