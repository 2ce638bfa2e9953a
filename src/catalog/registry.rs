//! Registration-time type descriptors.
//!
//! A [`TypeDescriptor`] records, for one concrete Rust type, the class levels
//! it is captured as (concrete level first, ancestors after it, root excluded),
//! the declared fields of every level with their modifiers, and typed
//! accessor handles. Descriptors are validated once in
//! [`TypeDescriptorBuilder::build`] and are immutable afterwards.

use super::field_catalog::{FieldCatalog, FieldCatalogCache};
use crate::core::{FieldValue, PassivationError, Result, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// A type-erased stateful object (bean or interceptor instance).
pub type BoxedObject = Box<dyn Any + Send>;

type Getter = dyn Fn(&dyn Any) -> Result<Value> + Send + Sync;
type Setter = dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync;
type Encoder = dyn Fn(&dyn Any) -> Result<Vec<u8>> + Send + Sync;
type Decoder = dyn Fn(&[u8]) -> Result<BoxedObject> + Send + Sync;
type Factory = dyn Fn() -> BoxedObject + Send + Sync;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldModifiers {
    pub is_static: bool,
    pub is_transient: bool,
}

impl FieldModifiers {
    pub const NONE: FieldModifiers = FieldModifiers {
        is_static: false,
        is_transient: false,
    };
    pub const STATIC: FieldModifiers = FieldModifiers {
        is_static: true,
        is_transient: false,
    };
    pub const TRANSIENT: FieldModifiers = FieldModifiers {
        is_static: false,
        is_transient: true,
    };

    /// Whether a field with these modifiers takes part in field-by-field capture.
    pub fn is_persistent(&self) -> bool {
        !self.is_static && !self.is_transient
    }
}

/// Typed read/write access to one declared field.
#[derive(Clone)]
pub struct FieldHandle {
    get: Arc<Getter>,
    set: Arc<Setter>,
}

impl FieldHandle {
    pub fn read(&self, object: &dyn Any) -> Result<Value> {
        (self.get)(object)
    }

    pub fn write(&self, object: &mut dyn Any, value: Value) -> Result<()> {
        (self.set)(object, value)
    }
}

impl fmt::Debug for FieldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldHandle")
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: FieldModifiers,
    handle: Option<FieldHandle>,
}

impl FieldDecl {
    pub fn handle(&self) -> Option<&FieldHandle> {
        self.handle.as_ref()
    }
}

/// One level of the captured class chain.
#[derive(Debug, Clone)]
pub struct ClassLevel {
    pub class_name: String,
    /// Natively serializable levels switch the whole type to native capture.
    pub serializable: bool,
    pub fields: Vec<FieldDecl>,
}

/// Native value-copy codec for serde-capable types.
#[derive(Clone)]
pub struct NativeCodec {
    encode: Arc<Encoder>,
    decode: Arc<Decoder>,
}

impl NativeCodec {
    pub fn encode(&self, object: &dyn Any) -> Result<Vec<u8>> {
        (self.encode)(object)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<BoxedObject> {
        (self.decode)(bytes)
    }
}

pub struct TypeDescriptor {
    type_name: String,
    type_id: TypeId,
    levels: Vec<ClassLevel>,
    native: Option<NativeCodec>,
    factory: Arc<Factory>,
}

impl TypeDescriptor {
    pub fn builder<T>(type_name: impl Into<String>) -> TypeDescriptorBuilder<T>
    where
        T: Any + Send + Default,
    {
        let type_name = type_name.into();
        TypeDescriptorBuilder {
            levels: vec![ClassLevel {
                class_name: type_name.clone(),
                serializable: false,
                fields: Vec::new(),
            }],
            type_name,
            native: None,
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn levels(&self) -> &[ClassLevel] {
        &self.levels
    }

    pub fn native_codec(&self) -> Option<&NativeCodec> {
        self.native.as_ref()
    }

    /// Zero-initialised instance; no user code beyond `Default` runs.
    pub fn instantiate(&self) -> BoxedObject {
        (self.factory)()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("levels", &self.levels)
            .field("native", &self.native.is_some())
            .finish()
    }
}

pub struct TypeDescriptorBuilder<T> {
    type_name: String,
    levels: Vec<ClassLevel>,
    native: Option<NativeCodec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypeDescriptorBuilder<T>
where
    T: Any + Send + Default,
{
    /// Declares a persistent field on the current class level.
    pub fn field<V, G, S>(self, name: &str, get: G, set: S) -> Self
    where
        V: FieldValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.try_field(name, move |object: &T| Ok(get(object)), set)
    }

    /// Declares a persistent field whose read may be refused at capture time.
    pub fn try_field<V, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        V: FieldValue + 'static,
        G: Fn(&T) -> std::result::Result<V, String> + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let type_name = self.type_name.clone();
        let field_name = name.to_string();
        let read_type = type_name.clone();
        let getter = move |object: &dyn Any| -> Result<Value> {
            let object = object.downcast_ref::<T>().ok_or_else(|| {
                PassivationError::TypeMismatch(format!("object is not a '{}'", read_type))
            })?;
            get(object)
                .map(FieldValue::into_value)
                .map_err(|reason| PassivationError::Capture {
                    type_name: read_type.clone(),
                    field: field_name.clone(),
                    reason,
                })
        };
        let setter = move |object: &mut dyn Any, value: Value| -> Result<()> {
            let object = object.downcast_mut::<T>().ok_or_else(|| {
                PassivationError::TypeMismatch(format!("object is not a '{}'", type_name))
            })?;
            set(object, V::from_value(value)?);
            Ok(())
        };

        self.current_level().fields.push(FieldDecl {
            name: name.to_string(),
            modifiers: FieldModifiers::NONE,
            handle: Some(FieldHandle {
                get: Arc::new(getter),
                set: Arc::new(setter),
            }),
        });
        self
    }

    pub fn transient_field(mut self, name: &str) -> Self {
        self.current_level().fields.push(FieldDecl {
            name: name.to_string(),
            modifiers: FieldModifiers::TRANSIENT,
            handle: None,
        });
        self
    }

    pub fn static_field(mut self, name: &str) -> Self {
        self.current_level().fields.push(FieldDecl {
            name: name.to_string(),
            modifiers: FieldModifiers::STATIC,
            handle: None,
        });
        self
    }

    /// Opens the next ancestor level; subsequent fields are declared on it.
    pub fn superclass(mut self, class_name: &str) -> Self {
        self.levels.push(ClassLevel {
            class_name: class_name.to_string(),
            serializable: false,
            fields: Vec::new(),
        });
        self
    }

    /// Opens a natively serializable ancestor level. Requires [`Self::native`].
    pub fn serializable_superclass(mut self, class_name: &str) -> Self {
        self.levels.push(ClassLevel {
            class_name: class_name.to_string(),
            serializable: true,
            fields: Vec::new(),
        });
        self
    }

    /// Captures the type by native value copy instead of field by field.
    pub fn native(mut self) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        let encode_type = self.type_name.clone();
        let decode_type = self.type_name.clone();
        self.levels[0].serializable = true;
        self.native = Some(NativeCodec {
            encode: Arc::new(move |object: &dyn Any| {
                let object = object.downcast_ref::<T>().ok_or_else(|| {
                    PassivationError::TypeMismatch(format!("object is not a '{}'", encode_type))
                })?;
                rmp_serde::to_vec(object).map_err(|e| PassivationError::Capture {
                    type_name: encode_type.clone(),
                    field: "<native>".to_string(),
                    reason: e.to_string(),
                })
            }),
            decode: Arc::new(move |bytes: &[u8]| {
                let object: T = rmp_serde::from_slice(bytes).map_err(|e| {
                    PassivationError::corrupt(&format!("native value of '{}'", decode_type), e)
                })?;
                Ok(Box::new(object) as BoxedObject)
            }),
        });
        self
    }

    pub fn build(self) -> Result<TypeDescriptor> {
        let mut class_names = HashSet::new();
        for level in &self.levels {
            if !class_names.insert(level.class_name.as_str()) {
                return Err(PassivationError::Registration(format!(
                    "class '{}' appears twice in the hierarchy of '{}'",
                    level.class_name, self.type_name
                )));
            }

            let mut field_names = HashSet::new();
            for field in &level.fields {
                if !field_names.insert(field.name.as_str()) {
                    return Err(PassivationError::Registration(format!(
                        "field '{}' declared twice on '{}'",
                        field.name, level.class_name
                    )));
                }
                if field.modifiers.is_persistent() && field.handle.is_none() {
                    return Err(PassivationError::Registration(format!(
                        "persistent field '{}.{}' has no accessor",
                        level.class_name, field.name
                    )));
                }
            }

            if level.serializable && self.native.is_none() {
                return Err(PassivationError::Registration(format!(
                    "'{}' is serializable but '{}' has no native codec",
                    level.class_name, self.type_name
                )));
            }
        }

        Ok(TypeDescriptor {
            type_name: self.type_name,
            type_id: TypeId::of::<T>(),
            levels: self.levels,
            native: self.native,
            factory: Arc::new(|| Box::new(T::default()) as BoxedObject),
        })
    }

    fn current_level(&mut self) -> &mut ClassLevel {
        // The concrete level is created with the builder, so there is always one.
        let last = self.levels.len() - 1;
        &mut self.levels[last]
    }
}

/// All types that may be passivated, keyed by type name and Rust type.
#[derive(Default)]
pub struct TypeRegistry {
    by_name: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
    by_type_id: RwLock<HashMap<TypeId, String>>,
    catalogs: FieldCatalogCache,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: TypeDescriptor) -> Result<()> {
        let mut by_name = self.by_name.write()?;
        let mut by_type_id = self.by_type_id.write()?;

        if by_name.contains_key(descriptor.type_name()) {
            return Err(PassivationError::Registration(format!(
                "type '{}' is already registered",
                descriptor.type_name()
            )));
        }
        if let Some(existing) = by_type_id.get(&descriptor.type_id()) {
            return Err(PassivationError::Registration(format!(
                "Rust type of '{}' is already registered as '{}'",
                descriptor.type_name(),
                existing
            )));
        }

        by_type_id.insert(descriptor.type_id(), descriptor.type_name().to_string());
        by_name.insert(descriptor.type_name().to_string(), Arc::new(descriptor));
        Ok(())
    }

    pub fn get(&self, type_name: &str) -> Result<Arc<TypeDescriptor>> {
        self.by_name
            .read()?
            .get(type_name)
            .cloned()
            .ok_or_else(|| PassivationError::UnknownType(type_name.to_string()))
    }

    /// Descriptor of the runtime type behind `object`.
    pub fn descriptor_of(&self, object: &dyn Any) -> Result<Arc<TypeDescriptor>> {
        let type_id = object.type_id();
        let name = self
            .by_type_id
            .read()?
            .get(&type_id)
            .cloned()
            .ok_or_else(|| PassivationError::UnknownType(format!("{:?}", type_id)))?;
        self.get(&name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.by_name
            .read()
            .map(|types| types.contains_key(type_name))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.by_name.read().map(|types| types.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field catalog of `descriptor`, computed on first use and cached.
    pub fn field_catalog(&self, descriptor: &TypeDescriptor) -> Result<Arc<FieldCatalog>> {
        self.catalogs.get_or_compute(descriptor)
    }

    pub fn catalog_cache(&self) -> &FieldCatalogCache {
        &self.catalogs
    }
}
