//! The `KvStore` boundary: durable byte storage `cg-dataset` persists
//! checkpoints to, plus the in-memory reference implementation used in
//! tests. The real backend — and any real file locking — lives outside this
//! workspace; here `try_lock` is modeled as a single-owner in-memory guard.

use crate::error::{DatasetError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Durable key/value storage for dataset checkpoints and journal payloads.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Acquire the storage directory's exclusive lock for the lifetime of
    /// this clone process. `false` if already held elsewhere.
    async fn try_lock(&self) -> Result<bool>;

    /// `try_lock`, turning a failed acquisition into `StorageLocked` — the
    /// form clone startup actually wants, since a held lock should fail
    /// startup outright rather than be checked and ignored.
    async fn require_lock(&self) -> Result<()> {
        if self.try_lock().await? {
            Ok(())
        } else {
            Err(DatasetError::StorageLocked)
        }
    }
}

/// In-memory `KvStore`. Only the one backend exists today, matching the
/// teacher's `aura-store`, whose single implementation is explicitly
/// documented as in-memory-only pending a real storage engine.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    locked: Arc<AtomicBool>,
}

impl MemoryKv {
    pub fn new() -> Self {
        MemoryKv::default()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.lock().remove(key);
        Ok(())
    }

    async fn try_lock(&self) -> Result<bool> {
        Ok(self
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let kv = MemoryKv::new();
        kv.put("k", b"v".to_vec()).await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), Some(b"v".to_vec()));
        kv.delete("k").await.unwrap();
        assert_eq!(kv.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lock_is_single_owner() {
        let kv = MemoryKv::new();
        assert!(kv.try_lock().await.unwrap());
        assert!(!kv.try_lock().await.unwrap());

        let same_store = kv.clone();
        assert!(same_store.require_lock().await.is_err());
    }
}
