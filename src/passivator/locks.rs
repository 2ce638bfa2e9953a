use crate::core::Result;
use std::sync::{Mutex, MutexGuard};

/// Three independent exclusion domains.
///
/// Each serialises one kind of operation process-wide; operations of
/// different kinds run concurrently.
#[derive(Debug, Default)]
pub struct ExclusionLocks {
    passivate: Mutex<()>,
    activate: Mutex<()>,
    remove: Mutex<()>,
}

impl ExclusionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passivate(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.passivate.lock()?)
    }

    pub fn activate(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.activate.lock()?)
    }

    pub fn remove(&self) -> Result<MutexGuard<'_, ()>> {
        Ok(self.remove.lock()?)
    }
}
