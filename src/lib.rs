// ============================================================================
// RustPassivator Library
// ============================================================================

pub mod capture;
pub mod catalog;
pub mod codec;
pub mod core;
pub mod failover;
pub mod passivator;
pub mod storage;

// Re-export main types for convenience
pub use core::{
    BeanId, BeanMetaData, ModuleVersion, OperationKind, PassivationError, PersistenceContextBinding,
    Result, Value,
};

pub use catalog::{FieldCatalog, FieldModifiers, TypeDescriptor, TypeRegistry};
pub use capture::{CapturedObject, capture_object, restore_object};
pub use codec::{FrameGeneration, PassivationFrame};

// Re-export storage and failover
pub use failover::{FailoverCache, InMemoryFailoverCache};
pub use storage::{
    BeanStore, DurabilityMode, FailingBeanStore, FailurePolicy, FileBeanStore, InMemoryBeanStore,
};

pub use passivator::{
    ActivationSource, IdentityContext, ManagedContextHook, PassivationOutcome, PassivatorConfig,
    PassivatorStats, SkipReason, StatefulInstance, StatefulPassivator,
};
