//! SQLite schema for IndexedDB-style databases
//!
//! Each database file holds:
//!
//! - `database_info` - key/value metadata, including the database version
//! - `object_stores` - registry of object stores and their key paths
//! - one `"store:<name>"` table per object store, with rows keyed by the
//!   record's primary key and a unique index on that key
//!
//! Object stores are only created during a version upgrade, mirroring the
//! `onupgradeneeded` rule of IndexedDB.

use rusqlite::{params, Connection, OptionalExtension, Result, Transaction};

/// Create the metadata tables if missing
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS database_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS object_stores (
            name TEXT PRIMARY KEY,
            key_path TEXT NOT NULL
        );
        "#,
    )
}

/// Get the stored database version (0 for a brand-new database)
pub fn get_version(conn: &Connection) -> Result<u32> {
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM database_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
}

/// Check if opening at `requested` needs an upgrade
pub fn needs_upgrade(conn: &Connection, requested: u32) -> Result<bool> {
    Ok(get_version(conn)? < requested)
}

/// Run the upgrade step: create the object store, then bump the version
pub fn upgrade(tx: &Transaction<'_>, version: u32, store: &str, key_path: &str) -> Result<()> {
    if !object_store_exists(tx, store)? {
        let table = table_name(store);
        let index = quote_ident(&format!("idx:{}:{}", store, key_path));
        tx.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                key PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS {index} ON {table}(key);
            "#
        ))?;
        tx.execute(
            "INSERT INTO object_stores (name, key_path) VALUES (?1, ?2)",
            params![store, key_path],
        )?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO database_info (key, value) VALUES ('version', ?1)",
        [version.to_string()],
    )?;
    Ok(())
}

/// Check if an object store has been created
pub fn object_store_exists(conn: &Connection, store: &str) -> Result<bool> {
    conn.prepare("SELECT 1 FROM object_stores WHERE name = ?1")?
        .exists([store])
}

/// Key path an object store was created with
pub fn object_store_key_path(conn: &Connection, store: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT key_path FROM object_stores WHERE name = ?1",
        [store],
        |row| row.get(0),
    )
    .optional()
}

/// Quoted table name for an object store
pub fn table_name(store: &str) -> String {
    quote_ident(&format!("store:{}", store))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
