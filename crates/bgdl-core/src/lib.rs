pub mod config;
pub mod logging;

pub mod collection;
pub mod engine;
pub mod import;
pub mod model;
pub mod observer;
pub mod planner;
pub mod queue;
pub mod store;
pub mod url_model;

pub use engine::{EngineEvent, TransferEngine, TransferError};
pub use model::{DownloadRequest, LifecycleState, Progress, TaskHandle, TransferRecord};
pub use queue::{QueueManager, QueueOptions, RefillPolicy};
