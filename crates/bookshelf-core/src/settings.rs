//! Persistence settings
//!
//! Describes which storage backend a collection lives in and how it is
//! addressed there. Settings are immutable once built; unset or empty
//! fields fall back to the defaults below.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default logical store name
pub const DEFAULT_STORE_NAME: &str = "ItemStore";
/// Default schema version
pub const DEFAULT_STORE_VERSION: u32 = 1;
/// Default record set (object store) name
pub const DEFAULT_RECORD_SET_NAME: &str = "Items";
/// Default primary key field
pub const DEFAULT_KEY_FIELD: &str = "id";

/// Storage medium a collection is persisted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendKind {
    #[default]
    Cookie,
    LocalStorage,
    SessionStorage,
    IndexedDb,
}

impl BackendKind {
    /// All backend kinds, in declaration order
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Cookie,
        BackendKind::LocalStorage,
        BackendKind::SessionStorage,
        BackendKind::IndexedDb,
    ];

    /// Canonical name used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Cookie => "cookie",
            BackendKind::LocalStorage => "localstorage",
            BackendKind::SessionStorage => "session",
            BackendKind::IndexedDb => "indexeddb",
        }
    }

    /// Whether this backend stores the whole collection as one string
    pub fn is_blob(&self) -> bool {
        !matches!(self, BackendKind::IndexedDb)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cookie" | "cookies" => Ok(BackendKind::Cookie),
            "localstorage" | "local_storage" | "local" => Ok(BackendKind::LocalStorage),
            "session" | "sessionstorage" | "session_storage" => Ok(BackendKind::SessionStorage),
            "indexeddb" | "indexed_db" => Ok(BackendKind::IndexedDb),
            _ => Err(Error::UnsupportedBackendKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for BackendKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendKind> for String {
    fn from(kind: BackendKind) -> Self {
        kind.as_str().to_string()
    }
}

/// What `load()` does when the backend returns no records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnEmptyLoad {
    /// Leave the in-memory collection untouched
    #[default]
    Keep,
    /// Replace the in-memory collection with the empty result
    Overwrite,
}

/// Addressing parameters for a persisted collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    store_name: String,
    store_version: u32,
    record_set_name: String,
    key_field: String,
    backend: BackendKind,
    on_empty_load: OnEmptyLoad,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            store_version: DEFAULT_STORE_VERSION,
            record_set_name: DEFAULT_RECORD_SET_NAME.to_string(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            backend: BackendKind::default(),
            on_empty_load: OnEmptyLoad::default(),
            timeout_ms: None,
        }
    }
}

impl PersistenceSettings {
    /// Start building settings from the defaults
    pub fn builder() -> PersistenceSettingsBuilder {
        PersistenceSettingsBuilder::default()
    }

    /// Default settings for a given backend
    pub fn for_backend(backend: BackendKind) -> Self {
        Self::builder().backend(backend).build()
    }

    /// Logical collection name (cookie name, storage key, database name)
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Schema version, used by IndexedDB only
    pub fn store_version(&self) -> u32 {
        self.store_version
    }

    /// Object store name inside an IndexedDB database
    pub fn record_set_name(&self) -> &str {
        &self.record_set_name
    }

    /// Field used as primary key
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn on_empty_load(&self) -> OnEmptyLoad {
        self.on_empty_load
    }

    /// Upper bound for a single storage operation; `None` waits forever
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Copy of these settings pointed at another backend
    pub fn with_backend(&self, backend: BackendKind) -> Self {
        Self {
            backend,
            ..self.clone()
        }
    }

    /// Builder seeded with these settings
    pub fn to_builder(&self) -> PersistenceSettingsBuilder {
        PersistenceSettingsBuilder {
            store_name: Some(self.store_name.clone()),
            store_version: Some(self.store_version),
            record_set_name: Some(self.record_set_name.clone()),
            key_field: Some(self.key_field.clone()),
            backend: Some(self.backend),
            on_empty_load: Some(self.on_empty_load),
            timeout: self.timeout(),
        }
    }

    /// Replace empty or zero fields with defaults
    ///
    /// Deserialized settings may carry empty strings; these behave as unset.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            store_name: non_empty_or(self.store_name, defaults.store_name),
            store_version: if self.store_version == 0 {
                defaults.store_version
            } else {
                self.store_version
            },
            record_set_name: non_empty_or(self.record_set_name, defaults.record_set_name),
            key_field: non_empty_or(self.key_field, defaults.key_field),
            ..self
        }
    }
}

fn non_empty_or(value: String, default: String) -> String {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Builder for [`PersistenceSettings`]
#[derive(Debug, Default, Clone)]
pub struct PersistenceSettingsBuilder {
    store_name: Option<String>,
    store_version: Option<u32>,
    record_set_name: Option<String>,
    key_field: Option<String>,
    backend: Option<BackendKind>,
    on_empty_load: Option<OnEmptyLoad>,
    timeout: Option<Duration>,
}

impl PersistenceSettingsBuilder {
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = Some(name.into());
        self
    }

    pub fn store_version(mut self, version: u32) -> Self {
        self.store_version = Some(version);
        self
    }

    pub fn record_set_name(mut self, name: impl Into<String>) -> Self {
        self.record_set_name = Some(name.into());
        self
    }

    pub fn key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn on_empty_load(mut self, policy: OnEmptyLoad) -> Self {
        self.on_empty_load = Some(policy);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Wait indefinitely for storage operations
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn build(self) -> PersistenceSettings {
        let defaults = PersistenceSettings::default();
        PersistenceSettings {
            store_name: self.store_name.unwrap_or(defaults.store_name),
            store_version: self.store_version.unwrap_or(defaults.store_version),
            record_set_name: self.record_set_name.unwrap_or(defaults.record_set_name),
            key_field: self.key_field.unwrap_or(defaults.key_field),
            backend: self.backend.unwrap_or(defaults.backend),
            on_empty_load: self.on_empty_load.unwrap_or(defaults.on_empty_load),
            timeout_ms: self.timeout.map(|t| t.as_millis() as u64),
        }
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = PersistenceSettings::default();
        assert_eq!(settings.store_name(), "ItemStore");
        assert_eq!(settings.store_version(), 1);
        assert_eq!(settings.record_set_name(), "Items");
        assert_eq!(settings.key_field(), "id");
        assert_eq!(settings.backend(), BackendKind::Cookie);
        assert_eq!(settings.on_empty_load(), OnEmptyLoad::Keep);
        assert!(settings.timeout().is_none());
    }

    #[test]
    fn test_builder_overrides_and_empty_fields() {
        let settings = PersistenceSettings::builder()
            .store_name("MyBookStore")
            .record_set_name("")
            .store_version(0)
            .backend(BackendKind::IndexedDb)
            .timeout(Duration::from_millis(250))
            .build();

        assert_eq!(settings.store_name(), "MyBookStore");
        assert_eq!(settings.record_set_name(), "Items");
        assert_eq!(settings.store_version(), 1);
        assert_eq!(settings.backend(), BackendKind::IndexedDb);
        assert_eq!(settings.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("cookie".parse::<BackendKind>().unwrap(), BackendKind::Cookie);
        assert_eq!(
            "LocalStorage".parse::<BackendKind>().unwrap(),
            BackendKind::LocalStorage
        );
        assert_eq!(
            "session".parse::<BackendKind>().unwrap(),
            BackendKind::SessionStorage
        );
        assert_eq!(
            "indexeddb".parse::<BackendKind>().unwrap(),
            BackendKind::IndexedDb
        );

        let err = "websql".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedBackendKind(ref k) if k == "websql"));
    }

    #[test]
    fn test_backend_kind_round_trips_through_display() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_only_indexed_db_stores_per_record() {
        let blob: Vec<BackendKind> = BackendKind::ALL.into_iter().filter(|k| k.is_blob()).collect();
        assert_eq!(
            blob,
            vec![BackendKind::Cookie, BackendKind::LocalStorage, BackendKind::SessionStorage]
        );
    }

    #[test]
    fn test_toml_with_missing_fields_uses_defaults() {
        let settings: PersistenceSettings = toml::from_str(
            r#"
            backend = "localstorage"
            on_empty_load = "overwrite"
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend(), BackendKind::LocalStorage);
        assert_eq!(settings.on_empty_load(), OnEmptyLoad::Overwrite);
        assert_eq!(settings.store_name(), "ItemStore");
    }

    #[test]
    fn test_toml_with_unknown_backend_fails() {
        let result: Result<PersistenceSettings, _> = toml::from_str(r#"backend = "websql""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_backend_keeps_addressing() {
        let settings = PersistenceSettings::builder().store_name("Shelf").build();
        let moved = settings.with_backend(BackendKind::SessionStorage);

        assert_eq!(moved.store_name(), "Shelf");
        assert_eq!(moved.backend(), BackendKind::SessionStorage);
        assert_ne!(moved, settings);
    }

    #[test]
    fn test_to_builder_round_trips() {
        let settings = PersistenceSettings::builder()
            .store_name("Shelf")
            .timeout(Duration::from_secs(2))
            .build();

        assert_eq!(settings.to_builder().build(), settings);

        let changed = settings.to_builder().store_version(3).no_timeout().build();
        assert_eq!(changed.store_name(), "Shelf");
        assert_eq!(changed.store_version(), 3);
        assert!(changed.timeout().is_none());
    }
}
