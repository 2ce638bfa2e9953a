pub mod error;
pub mod types;
pub mod value;

pub use error::{PassivationError, Result};
pub use types::{BeanId, BeanMetaData, ModuleVersion, OperationKind, PersistenceContextBinding};
pub use value::{FieldValue, Value};
