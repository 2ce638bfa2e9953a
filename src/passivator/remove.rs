use super::StatefulPassivator;
use super::stats::StatsCounters;
use crate::core::{BeanId, OperationKind, Result};
use log::debug;

impl StatefulPassivator {
    /// Deletes every passivated copy of `id` from the store and the failover
    /// cache. Returns whether anything was deleted; a missing entry is not
    /// an error.
    pub fn remove(&self, id: &BeanId) -> Result<bool> {
        let result = self.locks.remove().and_then(|_lock| {
            let from_store = self.store.remove(id)?;
            let from_cache = match &self.failover {
                Some(cache) => cache.remove_entry(id)?,
                None => false,
            };
            Ok(from_store || from_cache)
        });

        match result {
            Ok(removed) => {
                StatsCounters::bump(&self.stats.removals);
                debug!("removed {}: entry found = {}", id, removed);
                Ok(removed)
            }
            Err(err) => {
                StatsCounters::bump(&self.stats.removal_failures);
                Err(err.in_operation(OperationKind::Remove, id))
            }
        }
    }
}
