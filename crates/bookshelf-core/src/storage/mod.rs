//! Storage layer
//!
//! Adapters for the four storage media a collection can be persisted to.
//!
//! ## Architecture
//!
//! - **Profile**: owns the media (files under a data directory plus an
//!   in-memory session area)
//! - **Single-value media**: cookie jar, localStorage, sessionStorage; one
//!   JSON string per store name behind [`KeyValueAdapter`]
//! - **IndexedDB**: SQLite-backed object database with one row per record

pub mod adapter;
pub mod cookie;
pub mod error;
mod file;
pub mod indexed_db;
pub mod profile;
pub mod schema;
pub mod web_storage;

pub use adapter::KeyValueAdapter;
pub use cookie::{CookieAdapter, MAX_COOKIE_SIZE};
pub use error::{StorageError, StorageResult};
pub use indexed_db::{IndexedDbAdapter, RecordKey};
pub use profile::{Profile, ProfileOptions, DEFAULT_COOKIE_LIFETIME, DEFAULT_STORAGE_QUOTA};
pub use web_storage::{StorageArea, WebStorageAdapter};
