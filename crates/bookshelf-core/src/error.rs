//! Collection-level errors

use thiserror::Error;

use crate::settings::BackendKind;
use crate::storage::StorageError;

/// Errors returned by the data service and the collection store
#[derive(Error, Debug)]
pub enum Error {
    /// No book with this id exists in the collection
    #[error("Book not found: {id}")]
    NotFound { id: u64 },

    /// A book with this id is already in the collection
    #[error("A book with id {id} already exists")]
    DuplicateId { id: u64 },

    /// Explicit id outside `1..=MAX_ID`
    #[error("Book id {id} is out of range (1..={})", crate::models::MAX_ID)]
    InvalidId { id: u64 },

    /// Every id up to `MAX_ID` has been handed out
    #[error("No book ids left to assign")]
    IdsExhausted,

    /// The configured backend could not be constructed
    #[error("Data service unavailable: cannot use {backend} storage: {source}")]
    DataServiceUnavailable {
        backend: BackendKind,
        #[source]
        source: StorageError,
    },

    /// Settings named a backend with no adapter
    #[error("Unsupported backend kind '{0}' (expected cookie, localstorage, session or indexeddb)")]
    UnsupportedBackendKind(String),

    /// The store was created without a persistence service
    #[error("The persistence service is not enabled for this store")]
    PersistenceNotEnabled,

    /// Page count could not be coerced to a non-negative integer
    #[error("Invalid page count '{0}'")]
    InvalidPageCount(String),

    /// Collection could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage medium reported a failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for collection operations
pub type Result<T> = std::result::Result<T, Error>;
