//! IndexedDB-style object database
//!
//! Unlike the single-value media, each record is its own row, keyed by the
//! value of the configured key field. The database is an SQLite file per
//! store name; all work runs on tokio's blocking pool and a call resolves
//! only after its transaction has committed.
//!
//! ## Connection lifecycle
//!
//! 1. The first operation opens the database at `store_version`.
//! 2. If the stored version is lower, the upgrade step creates the object
//!    store (with a unique index on the key) and records the new version.
//!    A lower requested version fails with `VersionError`.
//! 3. Every transaction first re-reads the stored version. If another
//!    connection upgraded the database, this connection is closed and the
//!    operation fails with `VersionChange`; the next call reopens.
//! 4. An object store keeps the key field it was created with. Opening it
//!    with another key field fails with `KeyPathMismatch`.
//!
//! ## Timeouts
//!
//! A transaction that times out is rolled back. The blocking work claims
//! the commit before running it, so an operation reported as `Timeout`
//! never commits; if the commit was already claimed when the timer fired,
//! the call waits for it and returns its result.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, Transaction};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::profile::{lock, Profile};
use super::schema::{self, table_name};
use crate::settings::PersistenceSettings;

const MEDIUM: &str = "indexedDB";

// Commit race between a transaction and its timeout
const PENDING: u8 = 0;
const COMMITTING: u8 = 1;
const ABANDONED: u8 = 2;

/// Primary key of a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Read the key field of a record
    pub fn from_record(record: &Value, key_path: &str) -> StorageResult<Self> {
        let invalid = || StorageError::InvalidKey {
            key_field: key_path.to_string(),
        };
        match record.get(key_path) {
            Some(Value::Number(n)) => n.as_i64().map(RecordKey::Int).ok_or_else(invalid),
            Some(Value::String(s)) => Ok(RecordKey::Text(s.clone())),
            _ => Err(invalid()),
        }
    }

    fn from_sql(value: SqlValue) -> Option<Self> {
        match value {
            SqlValue::Integer(n) => Some(RecordKey::Int(n)),
            SqlValue::Text(s) => Some(RecordKey::Text(s)),
            _ => None,
        }
    }

    fn to_sql(&self) -> SqlValue {
        match self {
            RecordKey::Int(n) => SqlValue::Integer(*n),
            RecordKey::Text(s) => SqlValue::Text(s.clone()),
        }
    }
}

impl TryFrom<u64> for RecordKey {
    type Error = std::num::TryFromIntError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        i64::try_from(id).map(RecordKey::Int)
    }
}

impl From<i64> for RecordKey {
    fn from(id: i64) -> Self {
        RecordKey::Int(id)
    }
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        RecordKey::Text(key.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(key: String) -> Self {
        RecordKey::Text(key)
    }
}

struct OpenDatabase {
    conn: Connection,
    version: u32,
}

/// Where and how a database is addressed
#[derive(Debug, Clone)]
struct Target {
    path: PathBuf,
    database: String,
    version: u32,
    object_store: String,
    key_path: String,
}

/// Storage adapter for one object store in an IndexedDB-style database
#[derive(Clone)]
pub struct IndexedDbAdapter {
    target: Target,
    timeout: Option<Duration>,
    db: Arc<Mutex<Option<OpenDatabase>>>,
}

impl IndexedDbAdapter {
    /// Create an adapter; the database itself is opened lazily
    pub fn new(profile: &Profile, settings: &PersistenceSettings) -> StorageResult<Self> {
        if !profile.options().indexed_db_supported {
            return Err(StorageError::Unavailable {
                medium: MEDIUM,
                reason: "IndexedDB is not supported by this profile".to_string(),
            });
        }

        Ok(Self {
            target: Target {
                path: profile.indexed_db_path(settings.store_name()),
                database: settings.store_name().to_string(),
                version: settings.store_version(),
                object_store: settings.record_set_name().to_string(),
                key_path: settings.key_field().to_string(),
            },
            timeout: settings.timeout(),
            db: Arc::new(Mutex::new(None)),
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &PathBuf {
        &self.target.path
    }

    /// Whether a connection is currently open
    pub fn is_open(&self) -> bool {
        lock(&self.db).is_some()
    }

    /// Drop the open connection, if any
    pub fn close(&self) {
        if lock(&self.db).take().is_some() {
            debug!("Closed database '{}'", self.target.database);
        }
    }

    /// Put each record by its key; returns the number written
    pub async fn save(&self, records: Vec<Value>) -> StorageResult<usize> {
        let key_path = self.target.key_path.clone();
        self.transaction("save", move |tx, table| {
            let rows = keyed_rows(&records, &key_path)?;
            put_rows(tx, table, &rows)?;
            Ok(rows.len())
        })
        .await
    }

    /// Make the object store hold exactly `records`
    ///
    /// Rows whose keys are not among `records` are deleted and every record
    /// is put, all in one transaction.
    pub async fn replace_all(&self, records: Vec<Value>) -> StorageResult<usize> {
        let key_path = self.target.key_path.clone();
        self.transaction("replace", move |tx, table| {
            let rows = keyed_rows(&records, &key_path)?;
            let wanted: HashSet<&RecordKey> = rows.iter().map(|(key, _)| key).collect();

            let existing: Vec<SqlValue> = tx
                .prepare(&format!("SELECT key FROM {}", table))?
                .query_map([], |row| row.get(0))?
                .collect::<Result<_, _>>()?;

            let delete = format!("DELETE FROM {} WHERE key = ?1", table);
            for key in existing {
                let stale = RecordKey::from_sql(key.clone())
                    .map(|k| !wanted.contains(&k))
                    .unwrap_or(true);
                if stale {
                    tx.execute(&delete, [key])?;
                }
            }

            put_rows(tx, table, &rows)?;
            Ok(rows.len())
        })
        .await
    }

    /// Read every record in key order
    ///
    /// Rows that no longer parse as JSON are skipped with a warning.
    pub async fn retrieve(&self) -> StorageResult<Vec<Value>> {
        self.transaction("retrieve", |tx, table| {
            let mut stmt = tx.prepare(&format!("SELECT key, value FROM {} ORDER BY key", table))?;
            let mut cursor = stmt.query([])?;

            let mut records = Vec::new();
            while let Some(row) = cursor.next()? {
                let raw: String = row.get(1)?;
                match serde_json::from_str(&raw) {
                    Ok(value) => records.push(value),
                    Err(e) => {
                        let key: SqlValue = row.get(0)?;
                        warn!("Skipping unreadable record {:?}: {}", key, e);
                    }
                }
            }
            Ok(records)
        })
        .await
    }

    /// Delete one record by key
    pub async fn remove(&self, key: impl Into<RecordKey>) -> StorageResult<bool> {
        let key = key.into().to_sql();
        self.transaction("remove", move |tx, table| {
            let deleted = tx.execute(&format!("DELETE FROM {} WHERE key = ?1", table), [key])?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Delete every record in the object store
    pub async fn clear(&self) -> StorageResult<()> {
        self.transaction("clear", |tx, table| {
            tx.execute(&format!("DELETE FROM {}", table), [])?;
            Ok(())
        })
        .await
    }

    /// Number of records in the object store
    pub async fn count(&self) -> StorageResult<usize> {
        self.transaction("count", |tx, table| {
            let n: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
            Ok(n as usize)
        })
        .await
    }

    /// Run `work` in a committed transaction on the blocking pool
    async fn transaction<R, F>(&self, operation: &'static str, work: F) -> StorageResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Transaction<'_>, &str) -> StorageResult<R> + Send + 'static,
    {
        let target = self.target.clone();
        let db = Arc::clone(&self.db);
        let phase = Arc::new(AtomicU8::new(PENDING));
        let worker_phase = Arc::clone(&phase);

        let mut handle = tokio::task::spawn_blocking(move || {
            let mut guard = lock(&db);
            let open = match guard.take() {
                Some(open) => open,
                None => open_database(&target)?,
            };
            let open = guard.insert(open);

            let stored = schema::get_version(&open.conn)?;
            if stored != open.version {
                *guard = None;
                warn!(
                    "Database '{}' moved to version {}; closing connection",
                    target.database, stored
                );
                return Err(StorageError::VersionChange {
                    database: target.database,
                    stored,
                });
            }

            if !schema::object_store_exists(&open.conn, &target.object_store)? {
                return Err(StorageError::ObjectStoreNotFound {
                    database: target.database,
                    name: target.object_store,
                });
            }

            let tx = open.conn.transaction()?;
            let result = work(&tx, &table_name(&target.object_store))?;
            if worker_phase
                .compare_exchange(PENDING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("{} on '{}' abandoned; rolling back", operation, target.object_store);
                return Err(StorageError::TaskFailed(format!("{} abandoned", operation)));
            }
            tx.commit()?;
            debug!("{} on '{}' committed", operation, target.object_store);
            Ok(result)
        });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    let abandoned = phase
                        .compare_exchange(PENDING, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok();
                    if abandoned {
                        return Err(StorageError::Timeout {
                            operation,
                            elapsed: limit,
                        });
                    }
                    // Commit already under way
                    handle.await
                }
            },
            None => handle.await,
        };

        joined.map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }
}

impl std::fmt::Debug for IndexedDbAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedDbAdapter")
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Open (creating or upgrading as needed) the database for `target`
fn open_database(target: &Target) -> StorageResult<OpenDatabase> {
    if let Some(parent) = target.path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut conn = Connection::open(&target.path)?;
    schema::init_schema(&conn)?;

    let stored = schema::get_version(&conn)?;
    if target.version < stored {
        return Err(StorageError::VersionError {
            database: target.database.clone(),
            requested: target.version,
            stored,
        });
    }

    if schema::needs_upgrade(&conn, target.version)? {
        let tx = conn.transaction()?;
        schema::upgrade(&tx, target.version, &target.object_store, &target.key_path)?;
        tx.commit()?;
        info!(
            "Database '{}' created / upgraded from version {} to {}",
            target.database, stored, target.version
        );
    } else {
        debug!("Database '{}' opened at version {}", target.database, stored);
    }

    if let Some(stored_key) = schema::object_store_key_path(&conn, &target.object_store)? {
        if stored_key != target.key_path {
            return Err(StorageError::KeyPathMismatch {
                name: target.object_store.clone(),
                stored: stored_key,
                requested: target.key_path.clone(),
            });
        }
    }

    Ok(OpenDatabase {
        conn,
        version: target.version,
    })
}

fn keyed_rows(records: &[Value], key_path: &str) -> StorageResult<Vec<(RecordKey, String)>> {
    records
        .iter()
        .map(|record| {
            let key = RecordKey::from_record(record, key_path)?;
            Ok((key, record.to_string()))
        })
        .collect()
}

fn put_rows(tx: &Transaction<'_>, table: &str, rows: &[(RecordKey, String)]) -> StorageResult<()> {
    let mut stmt = tx.prepare(&format!(
        "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
        table
    ))?;
    for (key, value) in rows {
        stmt.execute(params![key.to_sql(), value])?;
    }
    Ok(())
}
