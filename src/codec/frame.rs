use crate::capture::CapturedObject;
use crate::core::{ModuleVersion, PersistenceContextBinding};
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-wire layout of a passivation frame.
///
/// Selected once per operation from bean metadata and never inferred from the
/// bytes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameGeneration {
    /// Access time, context binding and the raw native value of the bean.
    Legacy,
    /// Full layout with managed-context blob and interceptor records.
    Structured,
}

impl FrameGeneration {
    /// Legacy is only used for beans declared below `structured_threshold`
    /// while failover replication is active.
    pub fn select(
        module_version: ModuleVersion,
        structured_threshold: ModuleVersion,
        failover_active: bool,
    ) -> Self {
        if failover_active && module_version < structured_threshold {
            Self::Legacy
        } else {
            Self::Structured
        }
    }
}

impl fmt::Display for FrameGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => f.write_str("legacy"),
            Self::Structured => f.write_str("structured"),
        }
    }
}

/// Full unit of passivated state for one bean instance.
#[derive(Debug, Clone, PartialEq)]
pub struct PassivationFrame {
    pub last_access_time: i64,
    pub persistence_context: Option<PersistenceContextBinding>,
    pub primary: CapturedObject,
    /// Side-channel blob owned by the managed-context collaborator.
    pub managed_context: Vec<u8>,
    /// `None` is written as the `-1` absence marker.
    pub interceptors: Option<Vec<CapturedObject>>,
}

impl PassivationFrame {
    pub fn new(last_access_time: i64, primary: CapturedObject) -> Self {
        Self {
            last_access_time,
            persistence_context: None,
            primary,
            managed_context: Vec::new(),
            interceptors: None,
        }
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.as_ref().map_or(0, Vec::len)
    }
}
