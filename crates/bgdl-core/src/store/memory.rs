//! Process-local slots (tests, or explicitly non-durable queues).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{SlotStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous peek, handy for assertions.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Seed a slot directly, bypassing any collection.
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.lock().insert(key.to_string(), value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.insert(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::new();
        assert_eq!(store.load("q.waiting").await.unwrap(), None);
        store.save("q.waiting", "[]").await.unwrap();
        assert_eq!(store.load("q.waiting").await.unwrap().as_deref(), Some("[]"));
        store.save("q.waiting", "[1]").await.unwrap();
        assert_eq!(store.get("q.waiting").as_deref(), Some("[1]"));
    }
}
