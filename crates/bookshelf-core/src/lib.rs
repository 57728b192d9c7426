//! Bookshelf Core Library
//!
//! This crate provides the core functionality for Bookshelf, a small book
//! collection manager whose collection can live in any of four
//! browser-style storage media.
//!
//! # Architecture
//!
//! - **CollectionStore**: sorted, uniquely keyed in-memory collection that
//!   writes through on every mutation
//! - **DataService**: routes a whole collection to the configured backend
//! - **Storage**: cookie jar, localStorage, sessionStorage and an
//!   IndexedDB-style SQLite object database, all hosted by a [`Profile`]
//!
//! # Quick Start
//!
//! ```text
//! let profile = Profile::new("/tmp/bookshelf");
//! let settings = PersistenceSettings::for_backend(BackendKind::LocalStorage);
//! let mut store = CollectionStore::open(profile, settings).await?;
//!
//! store.add(Book::new("Zorba", "Kazantzakis", 400)).await?;
//! let books = store.get_all();
//! ```
//!
//! # Modules
//!
//! - `store`: Collection store (main entry point)
//! - `models`: The `Book` record and mutation `Activity`
//! - `settings`: Persistence settings and backend kinds
//! - `data_service`: Backend dispatch
//! - `storage`: Storage media adapters
//! - `config`: Application configuration

pub mod config;
pub mod data_service;
pub mod error;
pub mod models;
pub mod settings;
pub mod storage;
pub mod store;

pub use config::Config;
pub use data_service::DataService;
pub use error::{Error, Result};
pub use models::{parse_page_count, Activity, Book, MAX_ID, UNASSIGNED_ID};
pub use settings::{BackendKind, OnEmptyLoad, PersistenceSettings, PersistenceSettingsBuilder};
pub use storage::{Profile, ProfileOptions, StorageError};
pub use store::{CollectionStore, LoadOutcome, StoreState};
