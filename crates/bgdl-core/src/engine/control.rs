//! Per-transfer abort tokens.
//!
//! Each running transfer is registered with a token; `request_abort` flips it
//! and the transfer loop notices on its next progress callback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::model::TaskHandle;

/// Shared registry of handle -> abort token.
#[derive(Debug, Default)]
pub struct AbortTokens {
    tokens: RwLock<HashMap<TaskHandle, Arc<AtomicBool>>>,
}

impl AbortTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transfer; the returned token becomes true on abort.
    pub fn register(&self, handle: TaskHandle) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, Arc::clone(&token));
        token
    }

    /// Forget a transfer (call when it ends, whatever the outcome).
    pub fn unregister(&self, handle: TaskHandle) {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle);
    }

    /// Returns false if the handle is not registered.
    pub fn request_abort(&self, handle: TaskHandle) -> bool {
        match self
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&handle)
        {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}
