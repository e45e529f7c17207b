pub mod backends;
pub mod manager;

pub use backends::{BackendType, Consistency, StorageBackend, StorageSettings};
pub use manager::ResultStore;
