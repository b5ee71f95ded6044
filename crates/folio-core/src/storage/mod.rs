//! Storage layer
//!
//! The local cache that mirrors every saved document and keeps backend
//! credentials and identifiers between sessions.

pub mod cache;
pub mod error;

pub use cache::{LocalCache, LAST_SYNC_KEY};
pub use error::{StorageError, StorageResult};
