//! Where observer callbacks run.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;

pub type DeliveryJob = Box<dyn FnOnce() + Send + 'static>;

/// Execution context for observer notifications.
pub trait DeliveryContext: Send + Sync {
    fn dispatch(&self, job: DeliveryJob);
}

/// Runs each job immediately on the notifying thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inline;

impl DeliveryContext for Inline {
    fn dispatch(&self, job: DeliveryJob) {
        job();
    }
}

/// Runs jobs one at a time, in dispatch order, on a single named thread.
pub struct DedicatedWorker {
    sender: Mutex<Option<mpsc::Sender<DeliveryJob>>>,
    thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl DedicatedWorker {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<DeliveryJob>();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            })?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Block until every job dispatched so far has run.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        self.dispatch(Box::new(move || {
            let _ = done_tx.send(());
        }));
        let _ = done_rx.recv();
    }
}

impl DeliveryContext for DedicatedWorker {
    fn dispatch(&self, job: DeliveryJob) {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.as_ref() {
            Some(tx) if tx.send(job).is_ok() => {}
            _ => tracing::warn!("observer worker stopped; notification dropped"),
        }
    }
}

impl Drop for DedicatedWorker {
    fn drop(&mut self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn worker_runs_jobs_in_order_on_one_thread() {
        let worker = DedicatedWorker::spawn("bgdl-test-observers").unwrap();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        for i in 0..10 {
            let seen = Arc::clone(&seen);
            worker.dispatch(Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                seen.lock().unwrap().push((i, name));
            }));
        }
        worker.flush();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        for (expected, (i, name)) in seen.iter().enumerate() {
            assert_eq!(*i, expected);
            assert_eq!(name.as_deref(), Some("bgdl-test-observers"));
        }
    }

    #[test]
    fn inline_runs_immediately() {
        let hit = Arc::new(StdMutex::new(false));
        let flag = Arc::clone(&hit);
        Inline.dispatch(Box::new(move || *flag.lock().unwrap() = true));
        assert!(*hit.lock().unwrap());
    }
}
