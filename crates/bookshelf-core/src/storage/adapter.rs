//! Adapter interface for single-value storage media
//!
//! Cookie, localStorage and sessionStorage all hold one string per key, so
//! they share this trait. IndexedDB stores one row per record and has its
//! own asynchronous API (see [`super::indexed_db`]).

use super::error::StorageResult;

/// Raw string storage keyed by name
///
/// `retrieve` returns `Ok(None)` for a missing key; only real medium
/// failures are errors.
pub trait KeyValueAdapter {
    /// Human-readable medium name for logs and errors
    fn medium(&self) -> &'static str;

    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Read the value stored under `key`
    fn retrieve(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete the value stored under `key`
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Delete every value in the medium
    fn clear(&self) -> StorageResult<()>;
}
