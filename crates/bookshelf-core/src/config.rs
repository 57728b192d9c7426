//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/bookshelf/config.toml)
//! 3. Environment variables (BOOKSHELF_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! ```toml
//! data_dir = "/home/me/.local/share/bookshelf"
//! log_file = "/tmp/bookshelf.log"
//!
//! [persistence]
//! backend = "indexeddb"
//! store_name = "ItemStore"
//! store_version = 1
//! record_set_name = "Items"
//! key_field = "id"
//! on_empty_load = "keep"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::{BackendKind, OnEmptyLoad, PersistenceSettings};
use crate::storage::Profile;

/// Environment variable prefix
const ENV_PREFIX: &str = "BOOKSHELF";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "data_dir",
    "log_file",
    "backend",
    "store_name",
    "store_version",
    "record_set_name",
    "key_field",
    "on_empty_load",
    "timeout_ms",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the cookie jar, localStorage file and databases
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Write logs here instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Where and how the collection is persisted
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_file: None,
            persistence: PersistenceSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BOOKSHELF_DATA_DIR, BOOKSHELF_BACKEND,
    ///    BOOKSHELF_STORE_NAME, BOOKSHELF_LOG_FILE)
    /// 2. Config file (~/.config/bookshelf/config.toml or BOOKSHELF_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when given, else the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.normalize();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        config.normalize();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        // BOOKSHELF_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // BOOKSHELF_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() { None } else { Some(val.into()) };
        }

        // BOOKSHELF_BACKEND
        if let Ok(val) = std::env::var(format!("{}_BACKEND", ENV_PREFIX)) {
            let backend: BackendKind = val.parse()?;
            self.persistence = self.persistence.with_backend(backend);
        }

        // BOOKSHELF_STORE_NAME
        if let Ok(val) = std::env::var(format!("{}_STORE_NAME", ENV_PREFIX)) {
            self.persistence = self.persistence.to_builder().store_name(val).build();
        }

        Ok(())
    }

    fn normalize(&mut self) {
        self.persistence = self.persistence.clone().normalized();
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set one configuration value by key
    ///
    /// An empty value (or `none`) resets optional values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let unset = value.is_empty() || value.eq_ignore_ascii_case("none");
        let builder = self.persistence.to_builder();

        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "log_file" => self.log_file = if unset { None } else { Some(value.into()) },
            "backend" => {
                self.persistence = builder.backend(value.parse::<BackendKind>()?).build();
            }
            "store_name" => self.persistence = builder.store_name(value).build(),
            "store_version" => {
                let version: u32 = value
                    .parse()
                    .context("Invalid value for store_version. Use a positive integer.")?;
                self.persistence = builder.store_version(version).build();
            }
            "record_set_name" => self.persistence = builder.record_set_name(value).build(),
            "key_field" => self.persistence = builder.key_field(value).build(),
            "on_empty_load" => {
                let policy = match value.to_ascii_lowercase().as_str() {
                    "keep" => OnEmptyLoad::Keep,
                    "overwrite" => OnEmptyLoad::Overwrite,
                    _ => bail!("Invalid value for on_empty_load. Use 'keep' or 'overwrite'."),
                };
                self.persistence = builder.on_empty_load(policy).build();
            }
            "timeout_ms" => {
                self.persistence = if unset {
                    builder.no_timeout().build()
                } else {
                    let ms: u64 = value
                        .parse()
                        .context("Invalid value for timeout_ms. Use milliseconds or 'none'.")?;
                    builder.timeout(Duration::from_millis(ms)).build()
                };
            }
            _ => bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BOOKSHELF_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookshelf")
            .join("config.toml")
    }

    /// Storage profile rooted at the data directory
    pub fn profile(&self) -> Profile {
        Profile::new(&self.data_dir)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bookshelf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "BOOKSHELF_DATA_DIR",
        "BOOKSHELF_LOG_FILE",
        "BOOKSHELF_BACKEND",
        "BOOKSHELF_STORE_NAME",
        "BOOKSHELF_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data_dir.ends_with("bookshelf"));
        assert!(config.log_file.is_none());
        assert_eq!(config.persistence, PersistenceSettings::default());
    }

    #[test]
    fn test_profile_uses_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/data/books"),
            ..Config::default()
        };

        let profile = config.profile();
        assert_eq!(profile.data_dir(), Path::new("/data/books"));
        assert!(profile.local_storage_path().starts_with("/data/books"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("BOOKSHELF_DATA_DIR", "/tmp/bookshelf-test");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/bookshelf-test"));
    }

    #[test]
    fn test_env_override_backend_and_store_name() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("BOOKSHELF_BACKEND", "indexeddb");
        env::set_var("BOOKSHELF_STORE_NAME", "Shelf");
        config.apply_env_overrides().unwrap();

        assert_eq!(config.persistence.backend(), BackendKind::IndexedDb);
        assert_eq!(config.persistence.store_name(), "Shelf");
    }

    #[test]
    fn test_env_override_invalid_backend_fails() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("BOOKSHELF_BACKEND", "websql");
        let err = Config::load_from_str("").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedBackendKind(kind)) if kind == "websql"
        ));
    }

    #[test]
    fn test_env_override_log_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("BOOKSHELF_LOG_FILE", "/tmp/bookshelf.log");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/bookshelf.log")));

        // Empty string clears it
        env::set_var("BOOKSHELF_LOG_FILE", "");
        config.apply_env_overrides().unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"

            [persistence]
            backend = "localstorage"
            store_name = ""
            on_empty_load = "overwrite"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.persistence.backend(), BackendKind::LocalStorage);
        assert_eq!(config.persistence.store_name(), "ItemStore");
        assert_eq!(config.persistence.on_empty_load(), OnEmptyLoad::Overwrite);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        env::set_var("BOOKSHELF_DATA_DIR", temp_dir.path().join("data"));

        let path = temp_dir.path().join("missing.toml");
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.persistence, PersistenceSettings::default());
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config {
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        };
        config.set("backend", "session").unwrap();
        config.set("store_version", "4").unwrap();
        config.set("timeout_ms", "1500").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.persistence.backend(), BackendKind::SessionStorage);
        assert_eq!(loaded.persistence.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();

        assert!(config.set("colour", "blue").is_err());
        assert!(config.set("store_version", "two").is_err());
        assert!(config.set("on_empty_load", "sometimes").is_err());
        assert!(config.set("backend", "websql").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_resets_optional_values() {
        let mut config = Config::default();

        config.set("log_file", "/tmp/x.log").unwrap();
        config.set("timeout_ms", "10").unwrap();
        config.set("log_file", "none").unwrap();
        config.set("timeout_ms", "").unwrap();

        assert!(config.log_file.is_none());
        assert!(config.persistence.timeout().is_none());
    }
}
