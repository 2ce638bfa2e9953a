use crate::catalog::BoxedObject;
use crate::core::{BeanId, PassivationError, PersistenceContextBinding, Result};
use std::any::Any;

/// In-memory stateful bean: the primary object, its interceptor chain and
/// its persistence-context binding.
pub struct StatefulInstance {
    bean_id: BeanId,
    object: BoxedObject,
    interceptors: Option<Vec<BoxedObject>>,
    persistence_context: Option<PersistenceContextBinding>,
    last_access_time: i64,
    removed: bool,
}

impl StatefulInstance {
    pub fn new<T: Any + Send>(bean_id: BeanId, object: T) -> Self {
        Self::from_boxed(bean_id, Box::new(object))
    }

    pub fn from_boxed(bean_id: BeanId, object: BoxedObject) -> Self {
        Self {
            bean_id,
            object,
            interceptors: None,
            persistence_context: None,
            last_access_time: now_millis(),
            removed: false,
        }
    }

    pub fn with_interceptor<T: Any + Send>(mut self, interceptor: T) -> Self {
        self.interceptors
            .get_or_insert_with(Vec::new)
            .push(Box::new(interceptor));
        self
    }

    pub fn with_interceptors(mut self, interceptors: Vec<BoxedObject>) -> Self {
        self.interceptors = Some(interceptors);
        self
    }

    pub fn with_persistence_context(mut self, binding: PersistenceContextBinding) -> Self {
        self.persistence_context = Some(binding);
        self
    }

    pub fn with_last_access_time(mut self, last_access_time: i64) -> Self {
        self.last_access_time = last_access_time;
        self
    }

    pub fn bean_id(&self) -> &BeanId {
        &self.bean_id
    }

    pub fn last_access_time(&self) -> i64 {
        self.last_access_time
    }

    pub(crate) fn set_last_access_time(&mut self, last_access_time: i64) {
        self.last_access_time = last_access_time;
    }

    /// Records an access at the current wall-clock time.
    pub fn touch(&mut self) {
        self.last_access_time = now_millis();
    }

    pub fn persistence_context(&self) -> Option<&PersistenceContextBinding> {
        self.persistence_context.as_ref()
    }

    pub(crate) fn set_persistence_context(&mut self, binding: Option<PersistenceContextBinding>) {
        self.persistence_context = binding;
    }

    /// Once removed, an instance is never passivated again.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn raw_object(&self) -> &dyn Any {
        self.object.as_ref()
    }

    pub fn object<T: Any>(&self) -> Result<&T> {
        self.object
            .downcast_ref::<T>()
            .ok_or_else(|| type_mismatch::<T>(&self.bean_id, "bean"))
    }

    pub fn object_mut<T: Any>(&mut self) -> Result<&mut T> {
        let bean_id = self.bean_id.clone();
        self.object
            .downcast_mut::<T>()
            .ok_or_else(|| type_mismatch::<T>(&bean_id, "bean"))
    }

    pub fn interceptor_count(&self) -> Option<usize> {
        self.interceptors.as_ref().map(Vec::len)
    }

    pub(crate) fn raw_interceptors(&self) -> Option<&[BoxedObject]> {
        self.interceptors.as_deref()
    }

    pub fn interceptor<T: Any>(&self, index: usize) -> Result<&T> {
        self.interceptors
            .as_ref()
            .and_then(|interceptors| interceptors.get(index))
            .and_then(|interceptor| interceptor.downcast_ref::<T>())
            .ok_or_else(|| type_mismatch::<T>(&self.bean_id, &format!("interceptor {}", index)))
    }

    pub fn into_object(self) -> BoxedObject {
        self.object
    }
}

impl std::fmt::Debug for StatefulInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatefulInstance")
            .field("bean_id", &self.bean_id)
            .field("interceptors", &self.interceptor_count())
            .field("persistence_context", &self.persistence_context)
            .field("last_access_time", &self.last_access_time)
            .field("removed", &self.removed)
            .finish()
    }
}

fn type_mismatch<T>(bean_id: &BeanId, what: &str) -> PassivationError {
    PassivationError::TypeMismatch(format!(
        "{} of {} is not a {}",
        what,
        bean_id,
        std::any::type_name::<T>()
    ))
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut instance = StatefulInstance::new(BeanId::from("b"), 41i64)
            .with_interceptor(String::from("audit"))
            .with_last_access_time(7);

        *instance.object_mut::<i64>().unwrap() += 1;
        assert_eq!(*instance.object::<i64>().unwrap(), 42);
        assert!(instance.object::<String>().is_err());
        assert_eq!(instance.interceptor::<String>(0).unwrap(), "audit");
        assert!(instance.interceptor::<String>(1).is_err());
        assert_eq!(instance.last_access_time(), 7);

        instance.touch();
        assert!(instance.last_access_time() > 7);
    }
}
