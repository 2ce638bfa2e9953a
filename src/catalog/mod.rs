pub mod field_catalog;
pub mod registry;

pub use field_catalog::{CatalogField, CatalogLevel, FieldCatalog, FieldCatalogCache};
pub use registry::{
    BoxedObject, ClassLevel, FieldDecl, FieldHandle, FieldModifiers, NativeCodec, TypeDescriptor,
    TypeDescriptorBuilder, TypeRegistry,
};
