pub mod engine;
pub mod failing;
pub mod memory;
pub mod persistence;

pub use engine::{BeanStore, CompressedStoreWriter, StoreWriter};
pub use failing::{FailingBeanStore, FailurePolicy};
pub use memory::InMemoryBeanStore;
pub use persistence::{DurabilityMode, FRAME_FILE_EXTENSION, FileBeanStore};
