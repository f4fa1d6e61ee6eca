//! Local key-value persistence.
//!
//! Front ends hand this crate a small string store backed by whatever
//! they have (a file, platform storage); everything the crate persists
//! locally goes through the [`KvStore`] seam. [`InMemoryKv`] is the
//! bundled implementation, with optional JSON file persistence.

use crate::Result;

pub mod memory;

pub use memory::InMemoryKv;

/// Synchronous string key-value storage.
///
/// Implementations must be safe to share across threads; calls are
/// expected to be fast enough to run inline on async tasks.
pub trait KvStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns whether a value was actually removed.
    fn remove(&self, key: &str) -> Result<bool>;
}
