//! Observer fan-out for queue transitions and progress ticks.
//!
//! Every notification runs on the registry's [`DeliveryContext`], one job per
//! event, visiting observers in registration order. With a single-threaded
//! context (the default [`DedicatedWorker`] or [`Inline`] from one caller)
//! observers never run concurrently with each other, so they need no locking
//! of their own. This is a delivery-ordering property only: producers are not
//! slowed down by slow observers.

mod delivery;

pub use delivery::{DedicatedWorker, DeliveryContext, DeliveryJob, Inline};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::engine::TransferError;
use crate::model::{DownloadRequest, Progress};

/// Capability set of a queue listener.
pub trait Observer: Send + Sync {
    /// First progress signal of an admitted transfer.
    fn on_request_started(&self, request: &DownloadRequest);

    fn on_download_progress(&self, request: &DownloadRequest, progress: Progress);

    fn on_request_finished(&self, request: &DownloadRequest);

    fn on_request_failed(&self, request: &DownloadRequest, error: &TransferError);

    /// The request was cancelled through the queue and dropped from it.
    fn on_request_cancelled(&self, _request: &DownloadRequest) {}
}

/// One notification, as data.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Started(DownloadRequest),
    Progress(DownloadRequest, Progress),
    Finished(DownloadRequest),
    Failed(DownloadRequest, TransferError),
    Cancelled(DownloadRequest),
}

impl QueueEvent {
    fn deliver_to(&self, observer: &dyn Observer) {
        match self {
            QueueEvent::Started(r) => observer.on_request_started(r),
            QueueEvent::Progress(r, p) => observer.on_download_progress(r, *p),
            QueueEvent::Finished(r) => observer.on_request_finished(r),
            QueueEvent::Failed(r, e) => observer.on_request_failed(r, e),
            QueueEvent::Cancelled(r) => observer.on_request_cancelled(r),
        }
    }
}

/// Observer that forwards every notification as a [`QueueEvent`] on a channel.
pub struct EventForwarder(pub mpsc::UnboundedSender<QueueEvent>);

impl EventForwarder {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    fn forward(&self, event: QueueEvent) {
        let _ = self.0.send(event);
    }
}

impl Observer for EventForwarder {
    fn on_request_started(&self, request: &DownloadRequest) {
        self.forward(QueueEvent::Started(request.clone()));
    }

    fn on_download_progress(&self, request: &DownloadRequest, progress: Progress) {
        self.forward(QueueEvent::Progress(request.clone(), progress));
    }

    fn on_request_finished(&self, request: &DownloadRequest) {
        self.forward(QueueEvent::Finished(request.clone()));
    }

    fn on_request_failed(&self, request: &DownloadRequest, error: &TransferError) {
        self.forward(QueueEvent::Failed(request.clone(), error.clone()));
    }

    fn on_request_cancelled(&self, request: &DownloadRequest) {
        self.forward(QueueEvent::Cancelled(request.clone()));
    }
}

/// Returned by [`ObserverRegistry::subscribe`]; pass to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct ObserverRegistry {
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn Observer>)>>,
    next_id: AtomicU64,
    delivery: Arc<dyn DeliveryContext>,
}

impl ObserverRegistry {
    pub fn new(delivery: Arc<dyn DeliveryContext>) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            delivery,
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, observer));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every current subscriber on the delivery context.
    pub fn notify_all(&self, event: QueueEvent) {
        let observers: Vec<Arc<dyn Observer>> = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        if observers.is_empty() {
            return;
        }
        self.delivery.dispatch(Box::new(move || {
            for observer in &observers {
                event.deliver_to(observer.as_ref());
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn push(&self, what: &str, request: &DownloadRequest) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}:{}", self.tag, what, request.file_name));
        }
    }

    impl Observer for Recorder {
        fn on_request_started(&self, request: &DownloadRequest) {
            self.push("started", request);
        }
        fn on_download_progress(&self, request: &DownloadRequest, progress: Progress) {
            self.push(&format!("progress={}", progress.downloaded), request);
        }
        fn on_request_finished(&self, request: &DownloadRequest) {
            self.push("finished", request);
        }
        fn on_request_failed(&self, request: &DownloadRequest, _error: &TransferError) {
            self.push("failed", request);
        }
    }

    fn request(name: &str) -> DownloadRequest {
        DownloadRequest::new(format!("https://e.com/{name}"), name, format!("/tmp/{name}"))
    }

    #[test]
    fn delivers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(Arc::new(Inline));
        for tag in ["a", "b"] {
            registry.subscribe(Arc::new(Recorder { tag, log: Arc::clone(&log) }));
        }
        registry.notify_all(QueueEvent::Started(request("x")));
        registry.notify_all(QueueEvent::Progress(request("x"), Progress::new(5, 10)));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:started:x", "b:started:x", "a:progress=5:x", "b:progress=5:x"]
        );
    }

    #[test]
    fn unsubscribed_observer_stops_receiving() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(Arc::new(Inline));
        let a = registry.subscribe(Arc::new(Recorder { tag: "a", log: Arc::clone(&log) }));
        registry.subscribe(Arc::new(Recorder { tag: "b", log: Arc::clone(&log) }));

        assert!(registry.unsubscribe(a));
        assert!(!registry.unsubscribe(a));
        assert_eq!(registry.len(), 1);
        registry.notify_all(QueueEvent::Finished(request("y")));
        assert_eq!(*log.lock().unwrap(), vec!["b:finished:y"]);
    }

    #[test]
    fn cancelled_defaults_to_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ObserverRegistry::new(Arc::new(Inline));
        registry.subscribe(Arc::new(Recorder { tag: "a", log: Arc::clone(&log) }));
        registry.notify_all(QueueEvent::Cancelled(request("z")));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn forwarder_turns_calls_into_events() {
        let (forwarder, mut rx) = EventForwarder::channel();
        let registry = ObserverRegistry::new(Arc::new(Inline));
        registry.subscribe(Arc::new(forwarder));
        registry.notify_all(QueueEvent::Failed(request("f"), TransferError::Http(404)));
        assert_eq!(
            rx.recv().await,
            Some(QueueEvent::Failed(request("f"), TransferError::Http(404)))
        );
    }
}
