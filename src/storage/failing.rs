//! A [`BeanStore`] wrapper that injects failures, for exercising the cleanup
//! paths of passivation and activation without a broken disk.

use super::engine::{BeanStore, StoreWriter};
use crate::core::{BeanId, PassivationError, Result};
use std::io::{self, Read, Write};
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};

/// When the wrapped store should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Never fail (passthrough).
    Never,
    /// Accept this many bytes per write handle, then fail every write.
    WritesAfterBytes(usize),
    /// Accept all bytes but fail on commit.
    Commit,
    /// Fail when opening an entry for write.
    OpenForWrite,
    /// Fail every read.
    Reads,
    /// Fail every remove.
    Removes,
}

pub struct FailingBeanStore<S: BeanStore> {
    inner: S,
    policy: RwLock<FailurePolicy>,
    injected: Arc<AtomicUsize>,
}

impl<S: BeanStore> FailingBeanStore<S> {
    pub fn new(inner: S, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy: RwLock::new(policy),
            injected: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn set_policy(&self, policy: FailurePolicy) {
        if let Ok(mut current) = self.policy.write() {
            *current = policy;
        }
    }

    /// Number of failures injected so far.
    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn policy(&self) -> FailurePolicy {
        self.policy
            .read()
            .map(|policy| policy.clone())
            .unwrap_or(FailurePolicy::Never)
    }

    fn inject(&self, what: &str) -> PassivationError {
        self.injected.fetch_add(1, Ordering::SeqCst);
        PassivationError::StoreUnavailable(format!("injected failure: {}", what))
    }
}

impl<S: BeanStore> BeanStore for FailingBeanStore<S> {
    fn open_for_write(&self, id: &BeanId) -> Result<Box<dyn StoreWriter>> {
        let policy = self.policy();
        if policy == FailurePolicy::OpenForWrite {
            return Err(self.inject("open for write"));
        }
        let inner = self.inner.open_for_write(id)?;
        Ok(Box::new(FailingWriter {
            inner,
            remaining: match policy {
                FailurePolicy::WritesAfterBytes(n) => Some(n),
                _ => None,
            },
            fail_commit: policy == FailurePolicy::Commit,
            injected: self.injected.clone(),
        }))
    }

    fn open_for_read(&self, id: &BeanId) -> Result<Option<Box<dyn Read + Send>>> {
        if self.policy() == FailurePolicy::Reads {
            return Err(self.inject("read"));
        }
        self.inner.open_for_read(id)
    }

    fn remove(&self, id: &BeanId) -> Result<bool> {
        if self.policy() == FailurePolicy::Removes {
            return Err(self.inject("remove"));
        }
        self.inner.remove(id)
    }

    fn contains(&self, id: &BeanId) -> Result<bool> {
        self.inner.contains(id)
    }

    fn list(&self) -> Result<Vec<BeanId>> {
        self.inner.list()
    }
}

struct FailingWriter {
    inner: Box<dyn StoreWriter>,
    remaining: Option<usize>,
    fail_commit: bool,
    injected: Arc<AtomicUsize>,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.remaining {
            Some(0) => {
                self.injected.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::other("injected failure: write"))
            }
            Some(remaining) => {
                let accepted = buf.len().min(remaining);
                let written = self.inner.write(&buf[..accepted])?;
                self.remaining = Some(remaining - written);
                Ok(written)
            }
            None => self.inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl StoreWriter for FailingWriter {
    fn commit(self: Box<Self>) -> Result<()> {
        if self.fail_commit {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(PassivationError::StoreUnavailable(
                "injected failure: commit".to_string(),
            ));
        }
        self.inner.commit()
    }
}
