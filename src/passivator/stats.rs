use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of passivator counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassivatorStats {
    /// Passivations that committed to at least one sink.
    pub passivations: u64,
    /// Passivations skipped because the bean was removed or the container is terminating.
    pub skipped_passivations: u64,
    pub passivation_failures: u64,
    pub activations: u64,
    pub activation_failures: u64,
    pub removals: u64,
    pub removal_failures: u64,
    /// Frames pushed to the failover cache.
    pub failover_pushes: u64,
    pub failover_push_failures: u64,
    /// Activations served from the failover cache.
    pub failover_activations: u64,
    /// Activations served from the durable store.
    pub store_activations: u64,
    /// Best-effort store deletes that failed and were absorbed.
    pub cleanup_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub passivations: AtomicU64,
    pub skipped_passivations: AtomicU64,
    pub passivation_failures: AtomicU64,
    pub activations: AtomicU64,
    pub activation_failures: AtomicU64,
    pub removals: AtomicU64,
    pub removal_failures: AtomicU64,
    pub failover_pushes: AtomicU64,
    pub failover_push_failures: AtomicU64,
    pub failover_activations: AtomicU64,
    pub store_activations: AtomicU64,
    pub cleanup_failures: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PassivatorStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        PassivatorStats {
            passivations: load(&self.passivations),
            skipped_passivations: load(&self.skipped_passivations),
            passivation_failures: load(&self.passivation_failures),
            activations: load(&self.activations),
            activation_failures: load(&self.activation_failures),
            removals: load(&self.removals),
            removal_failures: load(&self.removal_failures),
            failover_pushes: load(&self.failover_pushes),
            failover_push_failures: load(&self.failover_push_failures),
            failover_activations: load(&self.failover_activations),
            store_activations: load(&self.store_activations),
            cleanup_failures: load(&self.cleanup_failures),
        }
    }
}
