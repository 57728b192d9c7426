//! Data service
//!
//! Routes a collection to the storage backend named by its settings.
//! Single-value backends receive the whole collection as one JSON array
//! under the store name; IndexedDB receives one structured record per row.
//!
//! The adapter is built on first use and cached. If a call passes settings
//! that differ from the ones the cached adapter was built for, it is
//! rebuilt.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::settings::{BackendKind, PersistenceSettings};
use crate::storage::{
    CookieAdapter, IndexedDbAdapter, KeyValueAdapter, Profile, StorageResult, WebStorageAdapter,
};

enum Adapter {
    Cookie(CookieAdapter),
    WebStorage(WebStorageAdapter),
    IndexedDb(IndexedDbAdapter),
}

impl Adapter {
    fn build(profile: &Profile, settings: &PersistenceSettings) -> StorageResult<Self> {
        Ok(match settings.backend() {
            BackendKind::Cookie => Adapter::Cookie(CookieAdapter::new(profile.clone())?),
            BackendKind::LocalStorage => Adapter::WebStorage(WebStorageAdapter::local(profile.clone())),
            BackendKind::SessionStorage => {
                Adapter::WebStorage(WebStorageAdapter::session(profile.clone()))
            }
            BackendKind::IndexedDb => Adapter::IndexedDb(IndexedDbAdapter::new(profile, settings)?),
        })
    }
}

struct Bound {
    settings: PersistenceSettings,
    adapter: Adapter,
}

/// Persists and retrieves whole collections
pub struct DataService {
    profile: Profile,
    settings: PersistenceSettings,
    bound: Option<Bound>,
}

impl DataService {
    pub fn new(profile: Profile, settings: PersistenceSettings) -> Self {
        Self {
            profile,
            settings: settings.normalized(),
            bound: None,
        }
    }

    /// The settings used when a call passes `None`
    pub fn settings(&self) -> &PersistenceSettings {
        &self.settings
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Whether an adapter has been resolved
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Resolve the adapter for the service's own settings
    pub fn bind(&mut self) -> Result<()> {
        let settings = self.settings.clone();
        self.adapter(&settings).map(|_| ())
    }

    /// Write every record to the backend, replacing what was stored
    pub async fn persist<T: Serialize>(
        &mut self,
        settings: Option<&PersistenceSettings>,
        records: &[T],
    ) -> Result<()> {
        let settings = self.resolve(settings);

        match self.adapter(&settings)? {
            Adapter::Cookie(adapter) => save_blob(adapter, &settings, records),
            Adapter::WebStorage(adapter) => save_blob(adapter, &settings, records),
            Adapter::IndexedDb(adapter) => {
                let values = records
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<serde_json::Result<Vec<Value>>>()?;
                let written = adapter.replace_all(values).await?;
                debug!("Persisted {} records to '{}'", written, settings.record_set_name());
                Ok(())
            }
        }
    }

    /// Read every record from the backend
    ///
    /// Read failures and malformed payloads are logged and yield an empty
    /// collection; records that fail to decode are skipped.
    pub async fn retrieve<T: DeserializeOwned>(
        &mut self,
        settings: Option<&PersistenceSettings>,
    ) -> Result<Vec<T>> {
        let settings = self.resolve(settings);

        let values = match self.adapter(&settings)? {
            Adapter::Cookie(adapter) => read_blob(adapter, &settings),
            Adapter::WebStorage(adapter) => read_blob(adapter, &settings),
            Adapter::IndexedDb(adapter) => match adapter.retrieve().await {
                Ok(values) => values,
                Err(e) => {
                    warn!("Failed to read from indexedDB: {}", e);
                    Vec::new()
                }
            },
        };

        Ok(decode_records(values))
    }

    fn resolve(&self, settings: Option<&PersistenceSettings>) -> PersistenceSettings {
        match settings {
            Some(settings) => settings.clone().normalized(),
            None => self.settings.clone(),
        }
    }

    fn adapter(&mut self, settings: &PersistenceSettings) -> Result<&Adapter> {
        let bound = match self.bound.take() {
            Some(bound) if &bound.settings == settings => bound,
            _ => {
                let adapter = Adapter::build(&self.profile, settings).map_err(|source| {
                    Error::DataServiceUnavailable {
                        backend: settings.backend(),
                        source,
                    }
                })?;
                let layout = if settings.backend().is_blob() {
                    "one JSON value"
                } else {
                    "one row per record"
                };
                debug!(
                    "Using {} backend for '{}' ({})",
                    settings.backend(),
                    settings.store_name(),
                    layout
                );
                Bound {
                    settings: settings.clone(),
                    adapter,
                }
            }
        };

        Ok(&self.bound.insert(bound).adapter)
    }
}

impl std::fmt::Debug for DataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("profile", &self.profile)
            .field("settings", &self.settings)
            .field("bound", &self.is_bound())
            .finish()
    }
}

fn save_blob<T: Serialize>(
    adapter: &dyn KeyValueAdapter,
    settings: &PersistenceSettings,
    records: &[T],
) -> Result<()> {
    let json = serde_json::to_string(records)?;
    adapter.save(settings.store_name(), &json)?;
    debug!(
        "Persisted {} records to {} '{}'",
        records.len(),
        adapter.medium(),
        settings.store_name()
    );
    Ok(())
}

fn read_blob(adapter: &dyn KeyValueAdapter, settings: &PersistenceSettings) -> Vec<Value> {
    let raw = match adapter.retrieve(settings.store_name()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read from {}: {}", adapter.medium(), e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(values) => values,
        Err(e) => {
            warn!(
                "Ignoring malformed payload in {} '{}': {}",
                adapter.medium(),
                settings.store_name(),
                e
            );
            Vec::new()
        }
    }
}

fn decode_records<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable record: {}", e);
                None
            }
        })
        .collect()
}
