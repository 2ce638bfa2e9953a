//! Cluster-replicated failover cache contract.

pub mod memory;

pub use memory::InMemoryFailoverCache;

use crate::core::{BeanId, Result};

/// Replicated cache that lets another node activate a bean without access to
/// the durable store of the node that passivated it.
///
/// Entries hold the compressed frame bytes together with the access time the
/// frame was written with.
pub trait FailoverCache: Send + Sync {
    fn exists(&self, id: &BeanId) -> Result<bool>;

    /// Takes the entry out of the cache. `client_hint` identifies the
    /// requesting client for implementations that route by affinity.
    fn get_and_remove(&self, id: &BeanId, client_hint: Option<&str>) -> Result<Option<Vec<u8>>>;

    /// Inserts a new entry.
    fn put(&self, id: &BeanId, bytes: Vec<u8>, last_access_time: i64) -> Result<()>;

    /// Replaces an existing entry. Fails when there is none.
    fn update(&self, id: &BeanId, bytes: Vec<u8>, last_access_time: i64) -> Result<()>;

    /// Returns whether an entry was removed.
    fn remove_entry(&self, id: &BeanId) -> Result<bool>;

    /// True while the entry is being replicated to this node as part of an
    /// open sticky unit of work.
    fn in_sticky_unit_of_work(&self, id: &BeanId) -> Result<bool>;
}
