//! Persistent client-side storage.
//!
//! A small string key/value store standing in for browser local storage.
//! Session state (cached user, token, guest id) lives here; nothing in it is
//! ever sent to the server as-is.
//!
//! Two adapters are provided:
//! - [`FileStorage`] - one JSON document on disk, used by the CLI
//! - [`MemoryStorage`] - in-process map, used by tests and embedders

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Cached authenticated user (JSON).
    pub const USER: &str = "velorm_user";
    /// Cached session token.
    pub const TOKEN: &str = "velorm_token";
    /// Persisted guest identifier.
    pub const GUEST_ID: &str = "velorm_guest_id";
}

/// Errors that can occur when reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage document could not be (de)serialized.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the storage lock.
    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Synchronous string key/value storage.
///
/// Implementations must be safe to share between tasks.
pub trait Storage: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
