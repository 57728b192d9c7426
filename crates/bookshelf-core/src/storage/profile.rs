//! Storage profile
//!
//! A profile plays the part of a browser profile: it owns the storage media
//! the adapters write to.
//!
//! - Persistent media live under `data_dir`:
//!   - `cookies.jar` - the cookie jar
//!   - `local_storage.json` - the localStorage area
//!   - `indexeddb/<name>.sqlite3` - one database per store name
//! - The sessionStorage area lives in memory and is shared by every clone of
//!   the profile, so it survives a store being recreated but not the process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Default Web Storage quota per area (5 MiB)
pub const DEFAULT_STORAGE_QUOTA: usize = 5 * 1024 * 1024;

/// Default cookie lifetime (one day)
pub const DEFAULT_COOKIE_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Capabilities and limits of a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOptions {
    pub cookies_enabled: bool,
    pub indexed_db_supported: bool,
    /// Bytes available to localStorage (keys plus values)
    pub local_storage_quota: usize,
    /// Bytes available to sessionStorage (keys plus values)
    pub session_storage_quota: usize,
    pub cookie_lifetime: Duration,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            cookies_enabled: true,
            indexed_db_supported: true,
            local_storage_quota: DEFAULT_STORAGE_QUOTA,
            session_storage_quota: DEFAULT_STORAGE_QUOTA,
            cookie_lifetime: DEFAULT_COOKIE_LIFETIME,
        }
    }
}

struct ProfileInner {
    data_dir: PathBuf,
    options: ProfileOptions,
    session: Mutex<BTreeMap<String, String>>,
    local_lock: Mutex<()>,
    cookie_lock: Mutex<()>,
}

/// Host of the storage media used by the adapters
#[derive(Clone)]
pub struct Profile {
    inner: Arc<ProfileInner>,
}

impl Profile {
    /// Create a profile rooted at `data_dir` with default options
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(data_dir, ProfileOptions::default())
    }

    /// Create a profile with explicit capabilities and limits
    pub fn with_options(data_dir: impl Into<PathBuf>, options: ProfileOptions) -> Self {
        Self {
            inner: Arc::new(ProfileInner {
                data_dir: data_dir.into(),
                options,
                session: Mutex::new(BTreeMap::new()),
                local_lock: Mutex::new(()),
                cookie_lock: Mutex::new(()),
            }),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn options(&self) -> &ProfileOptions {
        &self.inner.options
    }

    /// Get the path to the cookie jar
    pub fn cookie_jar_path(&self) -> PathBuf {
        self.inner.data_dir.join("cookies.jar")
    }

    /// Get the path to the localStorage area
    pub fn local_storage_path(&self) -> PathBuf {
        self.inner.data_dir.join("local_storage.json")
    }

    /// Get the path to the IndexedDB database for a store name
    pub fn indexed_db_path(&self, store_name: &str) -> PathBuf {
        self.inner
            .data_dir
            .join("indexeddb")
            .join(format!("{}.sqlite3", file_safe(store_name)))
    }

    pub(crate) fn session_area(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        lock(&self.inner.session)
    }

    /// Serializes read-modify-write cycles on the localStorage file
    pub(crate) fn local_lock(&self) -> MutexGuard<'_, ()> {
        lock(&self.inner.local_lock)
    }

    /// Serializes read-modify-write cycles on the cookie jar
    pub(crate) fn cookie_lock(&self) -> MutexGuard<'_, ()> {
        lock(&self.inner.cookie_lock)
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("data_dir", &self.inner.data_dir)
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Encode a store name as a file stem, one name to one stem
///
/// Lowercase letters, digits and `-` are kept; every other byte becomes
/// `_` plus two hex digits. Uppercase is escaped too, so names differing
/// only in case stay apart on case-insensitive filesystems.
fn file_safe(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }
    stem
}
