use super::FailoverCache;
use crate::core::{BeanId, PassivationError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
struct CacheEntry {
    bytes: Vec<u8>,
    last_access_time: i64,
}

/// Single-process failover cache.
///
/// Sticky marking and an unavailability switch let callers drive the error
/// paths of activation and passivation.
#[derive(Default)]
pub struct InMemoryFailoverCache {
    entries: RwLock<HashMap<BeanId, CacheEntry>>,
    sticky: RwLock<HashSet<BeanId>>,
    unavailable: AtomicBool,
}

impl InMemoryFailoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as mid-replication inside a sticky unit of work.
    pub fn mark_sticky(&self, id: &BeanId) -> Result<()> {
        self.sticky.write()?.insert(id.clone());
        Ok(())
    }

    pub fn clear_sticky(&self, id: &BeanId) -> Result<()> {
        self.sticky.write()?.remove(id);
        Ok(())
    }

    /// While set, every operation fails with `StoreUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn last_access_time(&self, id: &BeanId) -> Option<i64> {
        self.entries
            .read()
            .ok()?
            .get(id)
            .map(|entry| entry.last_access_time)
    }

    /// Raw bytes of an entry without removing it.
    pub fn peek(&self, id: &BeanId) -> Option<Vec<u8>> {
        self.entries.read().ok()?.get(id).map(|entry| entry.bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PassivationError::StoreUnavailable(
                "failover cache unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

impl FailoverCache for InMemoryFailoverCache {
    fn exists(&self, id: &BeanId) -> Result<bool> {
        self.check_available()?;
        Ok(self.entries.read()?.contains_key(id))
    }

    fn get_and_remove(&self, id: &BeanId, _client_hint: Option<&str>) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        Ok(self.entries.write()?.remove(id).map(|entry| entry.bytes))
    }

    fn put(&self, id: &BeanId, bytes: Vec<u8>, last_access_time: i64) -> Result<()> {
        self.check_available()?;
        self.entries.write()?.insert(
            id.clone(),
            CacheEntry {
                bytes,
                last_access_time,
            },
        );
        Ok(())
    }

    fn update(&self, id: &BeanId, bytes: Vec<u8>, last_access_time: i64) -> Result<()> {
        self.check_available()?;
        let mut entries = self.entries.write()?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| PassivationError::NotFound(id.clone()))?;
        entry.bytes = bytes;
        entry.last_access_time = last_access_time;
        Ok(())
    }

    fn remove_entry(&self, id: &BeanId) -> Result<bool> {
        self.check_available()?;
        self.sticky.write()?.remove(id);
        Ok(self.entries.write()?.remove(id).is_some())
    }

    fn in_sticky_unit_of_work(&self, id: &BeanId) -> Result<bool> {
        self.check_available()?;
        Ok(self.sticky.read()?.contains(id))
    }
}
