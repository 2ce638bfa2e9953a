//! Object capture and restore.
//!
//! Natively serializable types are copied through their codec. Everything
//! else is walked through its [`FieldCatalog`](crate::catalog::FieldCatalog)
//! and rebuilt from a zero-initialised instance on restore.

pub mod record;

pub use record::{CapturedClass, CapturedField, CapturedObject};

use crate::catalog::{BoxedObject, TypeRegistry};
use crate::core::{PassivationError, Result};
use std::any::Any;

/// Captures `object` using the descriptor of its runtime type.
pub fn capture_object(registry: &TypeRegistry, object: &dyn Any) -> Result<CapturedObject> {
    let descriptor = registry.descriptor_of(object)?;
    let catalog = registry.field_catalog(&descriptor)?;

    if catalog.is_native() {
        let codec = descriptor.native_codec().ok_or_else(|| {
            PassivationError::Registration(format!(
                "'{}' is native but has no codec",
                descriptor.type_name()
            ))
        })?;
        return Ok(CapturedObject::Native {
            type_name: descriptor.type_name().to_string(),
            bytes: codec.encode(object)?,
        });
    }

    let mut fields_by_class = Vec::with_capacity(catalog.levels().len());
    for level in catalog.levels() {
        let mut fields = Vec::with_capacity(level.fields.len());
        for field in &level.fields {
            // Access failures are fatal; keep the declaring class in the error.
            let value = field.handle.read(object).map_err(|err| match err {
                PassivationError::Capture { reason, .. } => PassivationError::Capture {
                    type_name: level.class_name.clone(),
                    field: field.name.clone(),
                    reason,
                },
                other => PassivationError::Capture {
                    type_name: level.class_name.clone(),
                    field: field.name.clone(),
                    reason: other.to_string(),
                },
            })?;
            fields.push(CapturedField {
                name: field.name.clone(),
                value,
            });
        }
        fields_by_class.push(CapturedClass {
            class_name: level.class_name.clone(),
            fields,
        });
    }

    Ok(CapturedObject::Reconstructed {
        type_name: descriptor.type_name().to_string(),
        fields_by_class,
    })
}

/// Rebuilds an object from `record`.
///
/// Records must name `expected_type` exactly, and every recorded
/// field must still exist in the current catalog. Both checks run before the
/// instance is allocated, so a failed restore never writes a field.
pub fn restore_object(
    registry: &TypeRegistry,
    record: CapturedObject,
    expected_type: &str,
) -> Result<BoxedObject> {
    match record {
        CapturedObject::Native { type_name, bytes } => {
            if type_name != expected_type {
                return Err(PassivationError::ClassIdentityMismatch {
                    expected: expected_type.to_string(),
                    found: type_name,
                });
            }
            let descriptor = registry.get(&type_name)?;
            let codec = descriptor.native_codec().ok_or_else(|| {
                PassivationError::CorruptFrame(format!(
                    "native record for '{}' which has no native codec",
                    type_name
                ))
            })?;
            codec.decode(&bytes)
        }
        CapturedObject::Reconstructed {
            type_name,
            fields_by_class,
        } => {
            if type_name != expected_type {
                return Err(PassivationError::ClassIdentityMismatch {
                    expected: expected_type.to_string(),
                    found: type_name,
                });
            }

            let descriptor = registry.get(expected_type)?;
            let catalog = registry.field_catalog(&descriptor)?;

            for class in &fields_by_class {
                for field in &class.fields {
                    if catalog.handle(&class.class_name, &field.name).is_none() {
                        return Err(PassivationError::SchemaMismatch {
                            type_name: type_name.clone(),
                            class_name: class.class_name.clone(),
                            field: field.name.clone(),
                        });
                    }
                }
            }

            let mut object = descriptor.instantiate();
            for class in fields_by_class {
                for field in class.fields {
                    if let Some(handle) = catalog.handle(&class.class_name, &field.name) {
                        handle.write(object.as_mut(), field.value)?;
                    }
                }
            }
            Ok(object)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TypeDescriptor;
    use crate::core::Value;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Preferences {
        theme: String,
        font_size: u32,
    }

    #[derive(Debug, Default, PartialEq)]
    struct ShoppingCart {
        items: Vec<String>,
        total_cents: i64,
        discount: Option<f64>,
        customer: String,
        created_at: i64,
        scratch: Vec<u8>,
    }

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::builder::<Preferences>("app.Preferences")
                    .native()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                TypeDescriptor::builder::<ShoppingCart>("shop.ShoppingCart")
                    .field("items", |c: &ShoppingCart| c.items.clone(), |c, v| c.items = v)
                    .field("total_cents", |c: &ShoppingCart| c.total_cents, |c, v| {
                        c.total_cents = v
                    })
                    .transient_field("scratch")
                    .superclass("shop.AbstractCart")
                    .field("discount", |c: &ShoppingCart| c.discount, |c, v| c.discount = v)
                    .superclass("shop.CustomerBound")
                    .field("customer", |c: &ShoppingCart| c.customer.clone(), |c, v| {
                        c.customer = v
                    })
                    .field("created_at", |c: &ShoppingCart| c.created_at, |c, v| {
                        c.created_at = v
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    fn sample_cart() -> ShoppingCart {
        ShoppingCart {
            items: vec!["book".into(), "lamp".into()],
            total_cents: 4599,
            discount: Some(0.15),
            customer: "alice".into(),
            created_at: 1_700_000_000_000,
            scratch: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_native_round_trip() {
        let registry = registry();
        let prefs = Preferences {
            theme: "dark".into(),
            font_size: 14,
        };

        let record = capture_object(&registry, &prefs).unwrap();
        assert!(record.is_native());

        let restored = restore_object(&registry, record, "app.Preferences").unwrap();
        assert_eq!(restored.downcast_ref::<Preferences>(), Some(&prefs));
    }

    #[test]
    fn test_reconstructed_round_trip_across_hierarchy() {
        let registry = registry();
        let cart = sample_cart();

        let record = capture_object(&registry, &cart).unwrap();
        assert!(!record.is_native());
        assert_eq!(
            record.field("shop.CustomerBound", "customer"),
            Some(&Value::Text("alice".into()))
        );

        let restored = restore_object(&registry, record, "shop.ShoppingCart").unwrap();
        let restored = restored.downcast_ref::<ShoppingCart>().unwrap();
        assert_eq!(restored.items, cart.items);
        assert_eq!(restored.total_cents, cart.total_cents);
        assert_eq!(restored.discount, cart.discount);
        assert_eq!(restored.customer, cart.customer);
        assert_eq!(restored.created_at, cart.created_at);
        // Transient state comes back zero-initialised.
        assert!(restored.scratch.is_empty());
    }

    #[test]
    fn test_transient_fields_are_not_captured() {
        let registry = registry();
        let record = capture_object(&registry, &sample_cart()).unwrap();
        let paths = record.field_paths();
        assert!(!paths.iter().any(|(_, field)| *field == "scratch"));
        assert_eq!(paths.len(), 5);
    }

    #[test]
    fn test_identity_mismatch_writes_nothing() {
        static TALLY_WRITES: AtomicUsize = AtomicUsize::new(0);

        #[derive(Default)]
        struct Tally {
            count: i64,
        }

        let registry = registry();
        registry
            .register(
                TypeDescriptor::builder::<Tally>("stats.Tally")
                    .field("count", |t: &Tally| t.count, |t, v| {
                        TALLY_WRITES.fetch_add(1, Ordering::SeqCst);
                        t.count = v
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let record = capture_object(&registry, &Tally { count: 9 }).unwrap();
        let renamed = match record {
            CapturedObject::Reconstructed {
                fields_by_class, ..
            } => CapturedObject::Reconstructed {
                type_name: "stats.Counter".into(),
                fields_by_class,
            },
            native => native,
        };

        let err = restore_object(&registry, renamed, "stats.Tally").unwrap_err();
        assert!(matches!(
            err,
            PassivationError::ClassIdentityMismatch { ref expected, ref found }
                if expected == "stats.Tally" && found == "stats.Counter"
        ));
        assert_eq!(TALLY_WRITES.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_native_record_of_another_type_is_rejected() {
        let registry = registry();
        let prefs = Preferences {
            theme: "dark".into(),
            font_size: 14,
        };
        let record = capture_object(&registry, &prefs).unwrap();

        let err = restore_object(&registry, record, "shop.ShoppingCart").unwrap_err();
        assert!(matches!(
            err,
            PassivationError::ClassIdentityMismatch { ref expected, ref found }
                if expected == "shop.ShoppingCart" && found == "app.Preferences"
        ));
    }

    #[test]
    fn test_unknown_field_is_schema_mismatch() {
        let registry = registry();
        let record = CapturedObject::Reconstructed {
            type_name: "shop.ShoppingCart".into(),
            fields_by_class: vec![CapturedClass {
                class_name: "shop.ShoppingCart".into(),
                fields: vec![CapturedField {
                    name: "coupon".into(),
                    value: Value::Text("SPRING".into()),
                }],
            }],
        };

        let err = restore_object(&registry, record, "shop.ShoppingCart").unwrap_err();
        assert!(matches!(
            err,
            PassivationError::SchemaMismatch { ref field, .. } if field == "coupon"
        ));
    }

    #[test]
    fn test_refused_field_read_is_capture_error() {
        #[derive(Default)]
        struct Vault {
            secret: String,
        }

        let registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::builder::<Vault>("sec.Vault")
                    .try_field(
                        "secret",
                        |_: &Vault| Err::<String, _>("access denied".to_string()),
                        |v, s| v.secret = s,
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let vault = Vault {
            secret: "hunter2".into(),
        };
        let err = capture_object(&registry, &vault).unwrap_err();
        assert!(matches!(
            err,
            PassivationError::Capture { ref type_name, ref field, ref reason }
                if type_name == "sec.Vault" && field == "secret" && reason == "access denied"
        ));
    }
}
