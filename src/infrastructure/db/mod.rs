pub mod store_registry;
pub mod table_io;

pub use store_registry::{Store, StoreRegistry, StoreRegistryConfig};
