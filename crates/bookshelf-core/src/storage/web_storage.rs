//! Web Storage areas (localStorage and sessionStorage)
//!
//! Both areas are plain string maps with a byte quota. localStorage is
//! written to `local_storage.json` in the profile directory; sessionStorage
//! lives in the profile's in-memory session area.
//!
//! Availability is probed once when the adapter is created by writing and
//! deleting a test key. An unavailable area logs a warning on every call:
//! reads return nothing, removals do nothing, and writes fail.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::adapter::KeyValueAdapter;
use super::error::{StorageError, StorageResult};
use super::file::{atomic_write, read_optional};
use super::profile::Profile;

const PROBE_KEY: &str = "__storage_test__";

/// Which Web Storage area an adapter uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    Local,
    Session,
}

impl StorageArea {
    pub fn medium(&self) -> &'static str {
        match self {
            StorageArea::Local => "localStorage",
            StorageArea::Session => "sessionStorage",
        }
    }
}

/// Storage adapter for one Web Storage area
#[derive(Debug, Clone)]
pub struct WebStorageAdapter {
    profile: Profile,
    area: StorageArea,
    available: bool,
}

impl WebStorageAdapter {
    /// Create an adapter and probe the area once
    pub fn new(profile: Profile, area: StorageArea) -> Self {
        let mut adapter = Self {
            profile,
            area,
            available: false,
        };
        adapter.available = adapter.probe();
        if !adapter.available {
            warn!("{} is not available; storage calls will be skipped", area.medium());
        }
        adapter
    }

    pub fn local(profile: Profile) -> Self {
        Self::new(profile, StorageArea::Local)
    }

    pub fn session(profile: Profile) -> Self {
        Self::new(profile, StorageArea::Session)
    }

    pub fn area(&self) -> StorageArea {
        self.area
    }

    /// Result of the construction-time probe
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Number of keys in the area
    pub fn len(&self) -> StorageResult<usize> {
        self.with_map(|map| Ok((map.len(), false)))
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Write then delete a test key
    ///
    /// A quota failure still counts as available when the area already
    /// holds data: it is full, not disabled.
    fn probe(&self) -> bool {
        let result = self
            .set_item(PROBE_KEY, PROBE_KEY)
            .and_then(|()| self.remove_item(PROBE_KEY));

        match result {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded { .. }) => {
                matches!(self.len(), Ok(n) if n > 0)
            }
            Err(e) => {
                debug!("{} probe failed: {}", self.area.medium(), e);
                false
            }
        }
    }

    fn quota(&self) -> usize {
        let options = self.profile.options();
        match self.area {
            StorageArea::Local => options.local_storage_quota,
            StorageArea::Session => options.session_storage_quota,
        }
    }

    /// Run `f` against the area's map, saving it if `f` reports a change
    fn with_map<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> StorageResult<(R, bool)>,
    ) -> StorageResult<R> {
        match self.area {
            StorageArea::Session => {
                let mut map = self.profile.session_area();
                f(&mut map).map(|(result, _)| result)
            }
            StorageArea::Local => {
                let _guard = self.profile.local_lock();
                let path = self.profile.local_storage_path();
                let mut map: BTreeMap<String, String> = match read_optional(&path)? {
                    Some(content) => {
                        serde_json::from_str(&content).map_err(|e| StorageError::InvalidFormat {
                            path: path.clone(),
                            details: e.to_string(),
                        })?
                    }
                    None => BTreeMap::new(),
                };

                let (result, changed) = f(&mut map)?;
                if changed {
                    let content = serde_json::to_string(&map).map_err(|e| {
                        StorageError::InvalidFormat {
                            path: path.clone(),
                            details: e.to_string(),
                        }
                    })?;
                    atomic_write(&path, content.as_bytes())?;
                }
                Ok(result)
            }
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let quota = self.quota();
        let medium = self.area.medium();
        self.with_map(|map| {
            let current: usize = map.iter().map(|(k, v)| k.len() + v.len()).sum();
            let replaced = map.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let needed = current - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    medium,
                    needed,
                    limit: quota,
                });
            }
            map.insert(key.to_string(), value.to_string());
            Ok(((), true))
        })
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.with_map(|map| {
            let changed = map.remove(key).is_some();
            Ok(((), changed))
        })
    }

    fn unavailable(&self) -> StorageError {
        StorageError::Unavailable {
            medium: self.area.medium(),
            reason: "availability probe failed".to_string(),
        }
    }
}

impl KeyValueAdapter for WebStorageAdapter {
    fn medium(&self) -> &'static str {
        self.area.medium()
    }

    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        if !self.available {
            warn!("{} is not available; value '{}' not saved", self.medium(), key);
            return Err(self.unavailable());
        }
        self.set_item(key, value)
    }

    fn retrieve(&self, key: &str) -> StorageResult<Option<String>> {
        if !self.available {
            warn!("{} is not available", self.medium());
            return Ok(None);
        }
        if key.is_empty() {
            return Ok(None);
        }
        self.with_map(|map| Ok((map.get(key).cloned(), false)))
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.available {
            warn!("{} is not available", self.medium());
            return Ok(());
        }
        if key.is_empty() {
            return Ok(());
        }
        self.remove_item(key)
    }

    fn clear(&self) -> StorageResult<()> {
        if !self.available {
            warn!("{} is not available", self.medium());
            return Ok(());
        }
        self.with_map(|map| {
            let changed = !map.is_empty();
            map.clear();
            Ok(((), changed))
        })
    }
}
