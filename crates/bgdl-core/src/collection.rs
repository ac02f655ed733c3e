//! Thread-safe ordered collection mirrored to a durable slot.
//!
//! Readers share the lock; writers are exclusive. Every mutation re-serializes
//! the whole collection and writes it to the slot before the write lock is
//! released. Write failures are logged and swallowed: the in-memory mutation
//! always stands, so durability is best-effort, not guaranteed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::SlotStore;

pub struct PersistentCollection<T> {
    key: String,
    items: RwLock<Vec<T>>,
    store: Arc<dyn SlotStore>,
}

impl<T> PersistentCollection<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Load the collection stored under `key`. A missing slot or one that
    /// fails to decode yields an empty collection.
    pub async fn open(key: impl Into<String>, store: Arc<dyn SlotStore>) -> Self {
        let key = key.into();
        let items = match store.load(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(slot = %key, "discarding undecodable slot: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(slot = %key, "slot load failed, starting empty: {}", e);
                Vec::new()
            }
        };
        tracing::debug!(slot = %key, len = items.len(), "collection loaded");
        Self {
            key,
            items: RwLock::new(items),
            store,
        }
    }

    pub async fn get(&self, index: usize) -> Option<T> {
        self.items.read().await.get(index).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Copy of every element, in order.
    pub async fn snapshot(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    pub async fn append(&self, item: T) {
        self.with_write_lock(|items| items.push(item)).await;
    }

    pub async fn append_all(&self, new_items: impl IntoIterator<Item = T>) {
        let new_items: Vec<T> = new_items.into_iter().collect();
        if new_items.is_empty() {
            return;
        }
        self.with_write_lock(|items| items.extend(new_items)).await;
    }

    /// Remove and return the element at `index`; out of range is a no-op.
    pub async fn remove_at(&self, index: usize) -> Option<T> {
        self.with_write_lock(|items| (index < items.len()).then(|| items.remove(index)))
            .await
    }

    /// Rewrite every element in place.
    pub async fn replace_each(&self, transform: impl Fn(T) -> T) {
        self.with_write_lock(|items| {
            let old = std::mem::take(items);
            items.extend(old.into_iter().map(transform));
        })
        .await;
    }

    /// Run `f` against the elements under the shared lock.
    pub async fn with_read_lock<U>(&self, f: impl FnOnce(&[T]) -> U) -> U {
        let items = self.items.read().await;
        f(&items)
    }

    /// Run `f` under the exclusive lock, then persist before releasing it.
    pub async fn with_write_lock<U>(&self, f: impl FnOnce(&mut Vec<T>) -> U) -> U {
        let mut items = self.items.write().await;
        let out = f(&mut items);
        self.persist(&items).await;
        out
    }

    /// Like [`with_write_lock`](Self::with_write_lock) but runs on a spawned
    /// task; the caller does not wait for the mutation or the write.
    pub fn with_write_lock_async<F>(self: &Arc<Self>, f: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(&mut Vec<T>) + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.with_write_lock(f).await;
        })
    }

    async fn persist(&self, items: &[T]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(slot = %self.key, "serialize failed, slot not updated: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.save(&self.key, &json).await {
            tracing::warn!(slot = %self.key, "durable write failed: {}", e);
        }
    }
}
