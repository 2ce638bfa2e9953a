use super::registry::{FieldHandle, TypeDescriptor};
use crate::core::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub struct CatalogField {
    pub name: String,
    pub handle: FieldHandle,
}

/// Persistent fields declared by one class level, in declaration order.
#[derive(Debug, Clone)]
pub struct CatalogLevel {
    pub class_name: String,
    pub fields: Vec<CatalogField>,
}

impl CatalogLevel {
    pub fn handle(&self, field_name: &str) -> Option<&FieldHandle> {
        self.fields
            .iter()
            .find(|field| field.name == field_name)
            .map(|field| &field.handle)
    }
}

/// Which fields of a type take part in field-by-field capture.
///
/// An empty catalog with `native == true` means the type is captured by
/// native value copy and no field walk happens.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    type_name: String,
    native: bool,
    levels: Vec<CatalogLevel>,
}

impl FieldCatalog {
    /// Walks the class chain from the concrete level upward. The first
    /// serializable level turns the whole type native; otherwise every
    /// non-static, non-transient field is collected.
    pub fn compute(descriptor: &TypeDescriptor) -> Self {
        let mut levels = Vec::with_capacity(descriptor.levels().len());

        for level in descriptor.levels() {
            if level.serializable {
                return Self {
                    type_name: descriptor.type_name().to_string(),
                    native: true,
                    levels: Vec::new(),
                };
            }

            let fields = level
                .fields
                .iter()
                .filter(|field| field.modifiers.is_persistent())
                .filter_map(|field| {
                    field.handle().map(|handle| CatalogField {
                        name: field.name.clone(),
                        handle: handle.clone(),
                    })
                })
                .collect();

            levels.push(CatalogLevel {
                class_name: level.class_name.clone(),
                fields,
            });
        }

        Self {
            type_name: descriptor.type_name().to_string(),
            native: false,
            levels,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_native(&self) -> bool {
        self.native
    }

    pub fn levels(&self) -> &[CatalogLevel] {
        &self.levels
    }

    pub fn level(&self, class_name: &str) -> Option<&CatalogLevel> {
        self.levels.iter().find(|level| level.class_name == class_name)
    }

    pub fn handle(&self, class_name: &str, field_name: &str) -> Option<&FieldHandle> {
        self.level(class_name)?.handle(field_name)
    }

    /// Class name to ordered field names; the structural shape of the catalog.
    pub fn field_names(&self) -> BTreeMap<&str, Vec<&str>> {
        self.levels
            .iter()
            .map(|level| {
                (
                    level.class_name.as_str(),
                    level.fields.iter().map(|field| field.name.as_str()).collect(),
                )
            })
            .collect()
    }

    pub fn field_count(&self) -> usize {
        self.levels.iter().map(|level| level.fields.len()).sum()
    }
}

impl PartialEq for FieldCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.native == other.native
            && self.field_names() == other.field_names()
    }
}

/// Process-lifetime cache of computed catalogs, one per type name.
///
/// Computation happens outside the lock. Concurrent first users may both
/// compute; the results are equal and the last insert wins.
#[derive(Default)]
pub struct FieldCatalogCache {
    entries: RwLock<HashMap<String, Arc<FieldCatalog>>>,
}

impl FieldCatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, descriptor: &TypeDescriptor) -> Result<Arc<FieldCatalog>> {
        if let Some(found) = self.entries.read()?.get(descriptor.type_name()) {
            return Ok(found.clone());
        }

        let computed = Arc::new(FieldCatalog::compute(descriptor));
        self.entries
            .write()?
            .insert(descriptor.type_name().to_string(), computed.clone());
        Ok(computed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::thread;

    #[derive(Default)]
    struct Account {
        owner: String,
        balance: i64,
        audit_id: i64,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct Snapshot {
        value: i64,
    }

    fn account_descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Account>("bank.Account")
            .field("balance", |a: &Account| a.balance, |a, v| a.balance = v)
            .static_field("INSTANCES")
            .transient_field("session_cache")
            .superclass("bank.Audited")
            .field("audit_id", |a: &Account| a.audit_id, |a, v| a.audit_id = v)
            .superclass("bank.Owned")
            .field("owner", |a: &Account| a.owner.clone(), |a, v| a.owner = v)
            .build()
            .unwrap()
    }

    #[test]
    fn test_catalog_excludes_static_and_transient() {
        let catalog = FieldCatalog::compute(&account_descriptor());

        assert!(!catalog.is_native());
        assert_eq!(catalog.field_count(), 3);
        let names = catalog.field_names();
        assert_eq!(names["bank.Account"], vec!["balance"]);
        assert_eq!(names["bank.Audited"], vec!["audit_id"]);
        assert_eq!(names["bank.Owned"], vec!["owner"]);
        assert!(catalog.handle("bank.Account", "session_cache").is_none());
        assert!(catalog.handle("bank.Account", "INSTANCES").is_none());
    }

    #[test]
    fn test_serializable_level_makes_catalog_native() {
        let descriptor = TypeDescriptor::builder::<Snapshot>("app.Snapshot")
            .native()
            .build()
            .unwrap();
        let catalog = FieldCatalog::compute(&descriptor);
        assert!(catalog.is_native());
        assert_eq!(catalog.field_count(), 0);
    }

    #[test]
    fn test_concurrent_computation_is_structurally_equal() {
        let descriptor = Arc::new(account_descriptor());
        let cache = Arc::new(FieldCatalogCache::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let descriptor = descriptor.clone();
                let cache = cache.clone();
                thread::spawn(move || cache.get_or_compute(&descriptor).unwrap())
            })
            .collect();

        let catalogs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for catalog in &catalogs[1..] {
            assert_eq!(**catalog, *catalogs[0]);
        }
        assert_eq!(cache.len(), 1);
    }
}
