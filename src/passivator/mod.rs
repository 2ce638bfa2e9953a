//! Passivation engine.
//!
//! [`StatefulPassivator`] moves idle [`StatefulInstance`]s into a
//! [`BeanStore`] (and optionally a [`FailoverCache`]) and brings them back.
//! Passivate, activate and remove each run under their own exclusion lock;
//! the identity collaborator is switched outside those locks.

pub mod activate;
pub mod collaborators;
pub mod config;
pub mod instance;
pub mod locks;
pub mod passivate;
pub mod remove;
pub mod stats;

pub use activate::{ActivationSource, ActivationState};
pub use collaborators::{IdentityContext, ManagedContextHook, NoIdentity, NoManagedContext};
pub use config::PassivatorConfig;
pub use instance::StatefulInstance;
pub use locks::ExclusionLocks;
pub use passivate::{PassivationOutcome, PassivationState, SkipReason};
pub use stats::PassivatorStats;

use crate::catalog::TypeRegistry;
use crate::codec::FrameGeneration;
use crate::core::{BeanId, BeanMetaData};
use crate::failover::FailoverCache;
use crate::storage::BeanStore;
use log::{trace, warn};
use stats::StatsCounters;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct StatefulPassivator {
    registry: Arc<TypeRegistry>,
    store: Arc<dyn BeanStore>,
    failover: Option<Arc<dyn FailoverCache>>,
    managed_context: Arc<dyn ManagedContextHook>,
    identity: Arc<dyn IdentityContext>,
    config: PassivatorConfig,
    locks: ExclusionLocks,
    terminating: Arc<AtomicBool>,
    stats: StatsCounters,
}

impl StatefulPassivator {
    pub fn new(
        registry: Arc<TypeRegistry>,
        store: Arc<dyn BeanStore>,
        config: PassivatorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            failover: None,
            managed_context: Arc::new(NoManagedContext),
            identity: Arc::new(NoIdentity),
            config,
            locks: ExclusionLocks::new(),
            terminating: Arc::new(AtomicBool::new(false)),
            stats: StatsCounters::default(),
        }
    }

    /// Enables failover replication through `cache`.
    pub fn with_failover(mut self, cache: Arc<dyn FailoverCache>) -> Self {
        self.failover = Some(cache);
        self
    }

    pub fn with_managed_context(mut self, hook: Arc<dyn ManagedContextHook>) -> Self {
        self.managed_context = hook;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityContext>) -> Self {
        self.identity = identity;
        self
    }

    /// Shares the container's terminating flag instead of an owned one.
    pub fn with_termination_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.terminating = flag;
        self
    }

    /// From now on every passivate is a no-op.
    pub fn begin_termination(&self) {
        self.terminating.store(true, Ordering::Release);
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::Acquire)
    }

    pub fn is_failover_active(&self) -> bool {
        self.failover.is_some()
    }

    /// Frame layout used for `bean`, identical for passivate and activate.
    pub fn generation_for(&self, bean: &BeanMetaData) -> FrameGeneration {
        FrameGeneration::select(
            bean.module_version,
            self.config.structured_threshold,
            self.is_failover_active(),
        )
    }

    pub fn stats(&self) -> PassivatorStats {
        self.stats.snapshot()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn BeanStore> {
        &self.store
    }

    pub fn config(&self) -> &PassivatorConfig {
        &self.config
    }

    /// Deletes the store entry for `id`, logging instead of failing.
    fn discard_entry(&self, id: &BeanId, reason: &str) {
        match self.store.remove(id) {
            Ok(removed) => trace!("discarded store entry for {} ({}): {}", id, reason, removed),
            Err(err) => {
                StatsCounters::bump(&self.stats.cleanup_failures);
                warn!("could not delete store entry for {} ({}): {}", id, reason, err);
            }
        }
    }
}

fn advance<S: Debug + Copy>(id: &BeanId, state: &mut S, next: S) {
    trace!("bean {}: {:?} -> {:?}", id, state, next);
    *state = next;
}
