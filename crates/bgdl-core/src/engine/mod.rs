//! Transfer-engine boundary.
//!
//! An engine runs one network transfer per accepted request. It reports back
//! through a single event channel: any number of `Progress` events per
//! handle, then exactly one `Completed` or `Failed`. `Drained` is sent when
//! the engine has nothing left in flight.

mod control;
mod curl_engine;
mod relocate;

pub use control::AbortTokens;
pub use curl_engine::{CurlEngine, EngineOptions};
pub use relocate::relocate_artifact;

use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::model::TaskHandle;

/// Something that performs transfers on its own threads and reports back
/// through an [`EventSink`].
pub trait TransferEngine: Send + Sync {
    /// Start fetching `url`. The returned handle tags every later event.
    fn submit(&self, url: &str) -> Result<TaskHandle, EngineError>;

    /// Ask the engine to stop a transfer. Unknown handles are ignored.
    fn cancel(&self, handle: TaskHandle);

    /// Transfers accepted but not yet terminated.
    fn in_flight(&self) -> usize;
}

/// Asynchronous report from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress {
        handle: TaskHandle,
        bytes_written: u64,
        total_expected: u64,
    },
    /// The body is complete at `location`, a temporary file the queue moves
    /// to the request's destination.
    Completed {
        handle: TaskHandle,
        location: PathBuf,
    },
    Failed {
        handle: TaskHandle,
        error: TransferError,
    },
    /// Nothing is in flight any more.
    Drained,
}

pub type EventSink = mpsc::UnboundedSender<EngineEvent>;
pub type EventStream = mpsc::UnboundedReceiver<EngineEvent>;

/// The single delivery channel between an engine and the queue.
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Why a transfer ended without a file at its destination. Carried to
/// observers, so it is cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("HTTP {0}")]
    Http(u32),
    #[error("transfer failed: {0}")]
    Transport(String),
    #[error("writing download: {0}")]
    Io(String),
    #[error("transfer timed out")]
    TimedOut,
    #[error("transfer cancelled")]
    Cancelled,
    #[error("moving download to {destination}: {reason}")]
    Relocation { destination: PathBuf, reason: String },
    #[error("engine refused transfer: {0}")]
    Submit(String),
}

/// The engine could not accept a transfer at all.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("spawn transfer worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine is shut down")]
    Closed,
}
