//! Hooks the enclosing container plugs into the passivator.

use crate::core::{BeanId, BeanMetaData, Result};
use log::trace;
use std::sync::Arc;

/// Owner of the opaque managed-context blob carried in structured frames.
pub trait ManagedContextHook: Send + Sync {
    /// Produces the blob to store alongside the bean.
    fn write_context(&self, id: &BeanId, bean: &BeanMetaData) -> Result<Vec<u8>>;

    /// Receives the stored blob on activation. `last_access_time` has already
    /// been applied to the instance when this runs.
    fn read_context(&self, id: &BeanId, last_access_time: i64, blob: &[u8]) -> Result<()>;
}

/// Writes an empty blob and ignores what it reads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoManagedContext;

impl ManagedContextHook for NoManagedContext {
    fn write_context(&self, _id: &BeanId, _bean: &BeanMetaData) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn read_context(&self, _id: &BeanId, _last_access_time: i64, _blob: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Security identity switched around a whole passivate or activate call.
pub trait IdentityContext: Send + Sync {
    fn push(&self, bean: &BeanMetaData) -> Result<()>;
    fn pop(&self, bean: &BeanMetaData);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoIdentity;

impl IdentityContext for NoIdentity {
    fn push(&self, _bean: &BeanMetaData) -> Result<()> {
        Ok(())
    }

    fn pop(&self, _bean: &BeanMetaData) {}
}

/// Pops the pushed identity when dropped.
pub(crate) struct IdentityGuard<'a> {
    identity: Arc<dyn IdentityContext>,
    bean: &'a BeanMetaData,
}

impl<'a> IdentityGuard<'a> {
    pub(crate) fn push(identity: Arc<dyn IdentityContext>, bean: &'a BeanMetaData) -> Result<Self> {
        identity.push(bean)?;
        trace!("identity pushed for bean '{}'", bean.name);
        Ok(Self { identity, bean })
    }
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        self.identity.pop(self.bean);
        trace!("identity popped for bean '{}'", self.bean.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ModuleVersion;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<String>>,
    }

    impl IdentityContext for Recording {
        fn push(&self, bean: &BeanMetaData) -> Result<()> {
            self.events.lock()?.push(format!("push {}", bean.name));
            Ok(())
        }

        fn pop(&self, bean: &BeanMetaData) {
            if let Ok(mut events) = self.events.lock() {
                events.push(format!("pop {}", bean.name));
            }
        }
    }

    #[test]
    fn test_guard_pops_on_drop() {
        let recording = Arc::new(Recording::default());
        let bean = BeanMetaData::new("Cart", "shop.Cart", ModuleVersion::STRUCTURED);
        {
            let _guard = IdentityGuard::push(recording.clone(), &bean).unwrap();
            assert_eq!(recording.events.lock().unwrap().len(), 1);
        }
        assert_eq!(
            *recording.events.lock().unwrap(),
            vec!["push Cart".to_string(), "pop Cart".to_string()]
        );
    }
}
