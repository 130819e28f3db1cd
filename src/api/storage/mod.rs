//! Storage module for the API.
//!
//! Provides the key-value persistence interface for flows and run sessions,
//! with in-memory and file-based backends.

pub mod error;
pub mod session_store;
pub mod traits;

// Storage backend implementations
pub mod file;
pub mod memory;

pub use error::StorageError;
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use session_store::RunSessionStore;
pub use traits::KeyValueStore;
