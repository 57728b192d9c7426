//! Collection store
//!
//! The `CollectionStore` owns the in-memory list of books and keeps it:
//! - sorted by title (stable, so equal titles keep insertion order)
//! - uniquely keyed by id
//! - flushed to the configured backend after every mutation
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = CollectionStore::open_with_config(&config).await?;
//!
//! let activity = store.add(Book::new("Zorba", "Kazantzakis", 400)).await?;
//! println!("{}", activity.message); // "Zorba has been added."
//!
//! for book in store.get_all() {
//!     println!("{}", book);
//! }
//! ```

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data_service::DataService;
use crate::error::{Error, Result};
use crate::models::{Activity, Book, MAX_ID};
use crate::settings::{OnEmptyLoad, PersistenceSettings};
use crate::storage::Profile;

/// Name given to stores that are not named explicitly
pub const DEFAULT_STORE_NAME: &str = "MyItemStore";

/// Lifecycle of the store's connection to its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// No adapter has been resolved yet
    Uninitialized,
    /// An adapter exists but nothing has been persisted or loaded
    Bound,
    /// At least one persist or load has succeeded
    Ready,
}

/// What `load()` did to the in-memory collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored records replaced memory
    Replaced(usize),
    /// Nothing was stored; memory was left as it was
    KeptEmpty,
    /// Nothing was stored; memory was emptied
    Cleared,
    /// Memory holds changes that were never persisted; nothing was loaded
    KeptUnsaved,
}

/// Hands out increasing ids, never reusing one it has seen
#[derive(Debug, Default)]
struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    fn next(&mut self) -> Result<u64> {
        let id = self
            .last
            .checked_add(1)
            .filter(|id| *id <= MAX_ID)
            .ok_or(Error::IdsExhausted)?;
        self.last = id;
        Ok(id)
    }

    fn observe(&mut self, id: u64) {
        self.last = self.last.max(id);
    }
}

/// Sorted, uniquely keyed collection of books with write-through persistence
#[derive(Debug)]
pub struct CollectionStore {
    name: String,
    books: Vec<Book>,
    ids: IdGenerator,
    /// `None` for memory-only stores
    service: Option<DataService>,
    ready: bool,
    /// Memory holds changes the backend has not accepted
    dirty: bool,
}

impl CollectionStore {
    /// Create a store persisting through `settings` on `profile`
    ///
    /// Nothing is read or written until the first operation.
    pub fn new(profile: Profile, settings: PersistenceSettings) -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            books: Vec::new(),
            ids: IdGenerator::default(),
            service: Some(DataService::new(profile, settings)),
            ready: false,
            dirty: false,
        }
    }

    /// Create a store that never persists
    pub fn in_memory() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            books: Vec::new(),
            ids: IdGenerator::default(),
            service: None,
            ready: false,
            dirty: false,
        }
    }

    /// Open a store for `settings` and load what the backend holds
    pub async fn open(profile: Profile, settings: PersistenceSettings) -> Result<Self> {
        let mut store = Self::new(profile, settings);
        store.bind()?;
        store.load().await?;
        Ok(store)
    }

    /// Open the store described by a configuration
    pub async fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(config.profile(), config.persistence.clone()).await
    }

    /// Set the store's display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Settings used for persistence, if enabled
    pub fn settings(&self) -> Option<&PersistenceSettings> {
        self.service.as_ref().map(DataService::settings)
    }

    pub fn is_persistent(&self) -> bool {
        self.service.is_some()
    }

    pub fn state(&self) -> StoreState {
        match &self.service {
            _ if self.ready => StoreState::Ready,
            Some(service) if service.is_bound() => StoreState::Bound,
            _ => StoreState::Uninitialized,
        }
    }

    /// Whether memory holds changes the backend has not accepted
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Resolve the backend adapter without touching stored data
    pub fn bind(&mut self) -> Result<()> {
        self.service
            .as_mut()
            .ok_or(Error::PersistenceNotEnabled)?
            .bind()
    }

    // ==================== Queries ====================

    /// Get a book by id
    pub fn find_by_id(&self, id: u64) -> Result<&Book> {
        self.books
            .iter()
            .find(|b| b.id == id)
            .ok_or(Error::NotFound { id })
    }

    /// All books, sorted by title
    pub fn get_all(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Sum of the page counts of every book
    pub fn total_pages(&self) -> u64 {
        self.books.iter().map(|b| u64::from(b.total_pages())).sum()
    }

    // ==================== Mutations ====================

    /// Add a book, assigning an id if it has none
    pub async fn add(&mut self, mut book: Book) -> Result<Activity> {
        if book.is_unassigned() {
            book.id = self.ids.next()?;
        } else if book.id > MAX_ID {
            return Err(Error::InvalidId { id: book.id });
        } else if self.position(book.id).is_some() {
            return Err(Error::DuplicateId { id: book.id });
        } else {
            self.ids.observe(book.id);
        }

        let message = format!("{} has been added.", book.title);
        self.insert_sorted(book.clone());
        self.commit(Activity::new(book, message)).await
    }

    /// Replace the stored book that has the same id
    ///
    /// `created_on` is carried over from the stored book and `modified_on`
    /// never moves backwards.
    pub async fn update(&mut self, mut book: Book) -> Result<Activity> {
        if book.is_unassigned() || book.id > MAX_ID {
            return Err(Error::InvalidId { id: book.id });
        }
        let index = self
            .position(book.id)
            .ok_or(Error::NotFound { id: book.id })?;
        let previous = self.books.remove(index);

        book.created_on = previous.created_on;
        book.touch(previous.modified_on);

        let message = format!("{} has been updated.", book.title);
        self.insert_sorted(book.clone());
        self.commit(Activity::new(book, message)).await
    }

    /// Remove a book
    pub async fn remove(&mut self, book: &Book) -> Result<Activity> {
        self.remove_by_id(book.id).await
    }

    /// Remove the book with this id
    pub async fn remove_by_id(&mut self, id: u64) -> Result<Activity> {
        let index = self.position(id).ok_or(Error::NotFound { id })?;
        let book = self.books.remove(index);
        self.sort();

        let message = format!("{} has been removed.", book.title);
        self.commit(Activity::new(book, message)).await
    }

    // ==================== Persistence ====================

    /// Write the whole collection to the backend
    pub async fn persist(&mut self) -> Result<()> {
        if self.service.is_none() {
            return Err(Error::PersistenceNotEnabled);
        }
        self.flush().await
    }

    /// Replace memory with what the backend holds
    ///
    /// Unsaved changes are never overwritten by an older stored snapshot.
    pub async fn load(&mut self) -> Result<LoadOutcome> {
        let service = self.service.as_mut().ok_or(Error::PersistenceNotEnabled)?;

        if self.dirty {
            warn!(
                "'{}' has unsaved changes; skipping load of stored collection",
                self.name
            );
            return Ok(LoadOutcome::KeptUnsaved);
        }

        let policy = service.settings().on_empty_load();
        let loaded: Vec<Book> = service.retrieve(None).await?;
        self.ready = true;

        if loaded.is_empty() {
            return Ok(match policy {
                OnEmptyLoad::Keep => {
                    debug!("Nothing stored for '{}'; keeping {} books", self.name, self.len());
                    LoadOutcome::KeptEmpty
                }
                OnEmptyLoad::Overwrite => {
                    self.books.clear();
                    debug!("Nothing stored for '{}'; collection cleared", self.name);
                    LoadOutcome::Cleared
                }
            });
        }

        let mut books: Vec<Book> = Vec::with_capacity(loaded.len());
        let mut unassigned: Vec<Book> = Vec::new();
        for book in loaded {
            if book.is_unassigned() {
                unassigned.push(book);
                continue;
            }
            if book.id > MAX_ID {
                warn!("Ignoring stored id {} ('{}'): out of range", book.id, book.title);
                continue;
            }
            if books.iter().any(|b| b.id == book.id) {
                warn!("Ignoring duplicate stored id {} ('{}')", book.id, book.title);
                continue;
            }
            self.ids.observe(book.id);
            books.push(book);
        }

        // Ids go to stored records that lack one only after every stored id
        // has been seen
        let reassigned = unassigned.len();
        for mut book in unassigned {
            book.id = self.ids.next()?;
            debug!("Assigned id {} to stored '{}'", book.id, book.title);
            books.push(book);
        }

        self.books = books;
        self.sort();
        info!("Loaded {} books into '{}'", self.books.len(), self.name);

        if reassigned > 0 {
            self.dirty = true;
            if let Err(e) = self.flush().await {
                warn!("Assigned ids to {} stored books but could not save them: {}", reassigned, e);
            }
        }
        Ok(LoadOutcome::Replaced(self.books.len()))
    }

    // ==================== Internals ====================

    fn position(&self, id: u64) -> Option<usize> {
        self.books.iter().position(|b| b.id == id)
    }

    fn sort(&mut self) {
        // `sort_by` is stable
        self.books.sort_by(|a, b| a.title.cmp(&b.title));
    }

    fn insert_sorted(&mut self, book: Book) {
        self.books.push(book);
        self.sort();
    }

    /// Log a mutation and flush it to the backend
    ///
    /// A failed flush leaves the mutation applied and the store dirty.
    async fn commit(&mut self, activity: Activity) -> Result<Activity> {
        info!("{}", activity.message);
        if self.service.is_some() {
            self.dirty = true;
            self.flush().await?;
        }
        Ok(activity)
    }

    async fn flush(&mut self) -> Result<()> {
        let Some(service) = self.service.as_mut() else {
            return Ok(());
        };

        match service.persist(None, &self.books).await {
            Ok(()) => {
                self.dirty = false;
                self.ready = true;
                debug!("Persisted {} books from '{}'", self.books.len(), self.name);
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                warn!("Failed to persist '{}': {}", self.name, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BackendKind;
    use crate::storage::{KeyValueAdapter, ProfileOptions, StorageError, WebStorageAdapter};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn store_for(temp_dir: &TempDir, backend: BackendKind) -> CollectionStore {
        CollectionStore::new(
            Profile::new(temp_dir.path()),
            PersistenceSettings::for_backend(backend),
        )
    }

    fn titles(store: &CollectionStore) -> Vec<&str> {
        store.get_all().iter().map(|b| b.title.as_str()).collect()
    }

    fn assert_sorted(store: &CollectionStore) {
        let all = store.get_all();
        assert!(all.windows(2).all(|w| w[0].title <= w[1].title));
    }

    #[tokio::test]
    async fn test_add_sorts_by_title() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_for(&temp_dir, BackendKind::Cookie);

        let zorba = store.add(Book::new("Zorba", "Kazantzakis", 400)).await.unwrap();
        let farm = store.add(Book::new("Animal Farm", "Orwell", 112)).await.unwrap();

        assert_eq!(titles(&store), vec!["Animal Farm", "Zorba"]);
        assert_eq!(zorba.message, "Zorba has been added.");
        assert_eq!(farm.message, "Animal Farm has been added.");
        assert_ne!(zorba.book.id, farm.book.id);
        assert!(zorba.book.id > 0 && farm.book.id > 0);
    }

    #[tokio::test]
    async fn test_generated_ids_are_distinct() {
        let mut store = CollectionStore::in_memory();
        let mut seen = HashSet::new();

        for i in 0..50 {
            let activity = store
                .add(Book::new(format!("Title {}", i % 7), "Author", i))
                .await
                .unwrap();
            assert!(activity.book.id > 0);
            assert!(seen.insert(activity.book.id));
        }
        assert_eq!(store.len(), 50);
    }

    #[tokio::test]
    async fn test_equal_titles_keep_insertion_order() {
        let mut store = CollectionStore::in_memory();

        let first = store.add(Book::new("Same", "First", 1)).await.unwrap();
        store.add(Book::new("Alpha", "X", 1)).await.unwrap();
        let second = store.add(Book::new("Same", "Second", 2)).await.unwrap();

        let same: Vec<u64> = store
            .get_all()
            .iter()
            .filter(|b| b.title == "Same")
            .map(|b| b.id)
            .collect();
        assert_eq!(same, vec![first.book.id, second.book.id]);
        assert_sorted(&store);
    }

    #[tokio::test]
    async fn test_add_with_existing_id_is_rejected() {
        let mut store = CollectionStore::in_memory();
        store.add(Book::new("A", "X", 1).with_id(5)).await.unwrap();

        let err = store.add(Book::new("B", "Y", 2).with_id(5)).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateId { id: 5 }));
        assert_eq!(store.len(), 1);

        // Generated ids skip past explicit ones
        let next = store.add(Book::new("C", "Z", 3)).await.unwrap();
        assert_eq!(next.book.id, 6);
    }

    #[tokio::test]
    async fn test_ids_beyond_key_range_are_rejected() {
        let mut store = CollectionStore::in_memory();

        let err = store.add(Book::new("Max", "X", 1).with_id(u64::MAX)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidId { id: u64::MAX }));
        let err = store.add(Book::new("Over", "X", 1).with_id(MAX_ID + 1)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
        assert!(store.is_empty());

        let next = store.add(Book::new("Next", "X", 1)).await.unwrap();
        assert_eq!(next.book.id, 1);

        let err = store.update(Book::new("Zero", "X", 1)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidId { id: 0 }));
    }

    #[tokio::test]
    async fn test_id_generator_stops_at_max_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_for(&temp_dir, BackendKind::IndexedDb);

        let max = store.add(Book::new("Max", "X", 1).with_id(MAX_ID)).await.unwrap();
        assert_eq!(max.book.id, MAX_ID);

        let err = store.add(Book::new("Next", "X", 1)).await.unwrap_err();
        assert!(matches!(err, Error::IdsExhausted));
        assert_eq!(store.len(), 1);

        // The largest id still round-trips through the object database
        let mut reopened = store_for(&temp_dir, BackendKind::IndexedDb);
        assert_eq!(reopened.load().await.unwrap(), LoadOutcome::Replaced(1));
        assert_eq!(reopened.find_by_id(MAX_ID).unwrap().title, "Max");
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let mut store = CollectionStore::in_memory();
        let added = store.add(Book::new("Dune", "Herbert", 412)).await.unwrap();

        assert_eq!(store.find_by_id(added.book.id).unwrap().title, "Dune");
        assert!(matches!(store.find_by_id(999), Err(Error::NotFound { id: 999 })));
    }

    #[tokio::test]
    async fn test_update_preserves_created_on() {
        let mut store = CollectionStore::in_memory();
        let added = store.add(Book::new("Zorba", "Kazantzakis", 400)).await.unwrap().book;

        let mut changed = Book::new("Zorba the Greek", "Kazantzakis", 320).with_id(added.id);
        changed.created_on = chrono::Utc::now() + chrono::Duration::days(30);
        changed.modified_on = added.modified_on - chrono::Duration::days(30);

        let activity = store.update(changed).await.unwrap();

        assert_eq!(activity.message, "Zorba the Greek has been updated.");
        assert_eq!(activity.book.created_on, added.created_on);
        assert!(activity.book.modified_on >= added.modified_on);
        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_id(added.id).unwrap().page_count, 320);
    }

    #[tokio::test]
    async fn test_update_resorts() {
        let mut store = CollectionStore::in_memory();
        let a = store.add(Book::new("Alpha", "X", 1)).await.unwrap().book;
        store.add(Book::new("Middle", "Y", 1)).await.unwrap();

        store
            .update(Book::new("Zulu", "X", 1).with_id(a.id))
            .await
            .unwrap();

        assert_eq!(titles(&store), vec!["Middle", "Zulu"]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let mut store = CollectionStore::in_memory();
        let err = store.update(Book::new("Ghost", "Nobody", 1).with_id(42)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { id: 42 }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_id_on_empty_store() {
        let mut store = CollectionStore::in_memory();
        let err = store.remove_by_id(999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_for(&temp_dir, BackendKind::LocalStorage);

        let zorba = store.add(Book::new("Zorba", "Kazantzakis", 400)).await.unwrap().book;
        store.add(Book::new("Animal Farm", "Orwell", 112)).await.unwrap();

        let activity = store.remove(&zorba).await.unwrap();
        assert_eq!(activity.message, "Zorba has been removed.");
        assert_eq!(titles(&store), vec!["Animal Farm"]);

        let err = store.remove(&zorba).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_local_storage_reload() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut store = store_for(&temp_dir, BackendKind::LocalStorage);
            store.add(Book::new("Zorba", "Kazantzakis", 400)).await.unwrap();
            store.add(Book::new("Animal Farm", "Orwell", 112)).await.unwrap();
        }

        let mut reopened = store_for(&temp_dir, BackendKind::LocalStorage);
        assert!(reopened.is_empty());

        let outcome = reopened.load().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Replaced(2));
        assert_eq!(titles(&reopened), vec!["Animal Farm", "Zorba"]);
        assert_eq!(reopened.total_pages(), 512);
    }

    #[tokio::test]
    async fn test_ids_continue_after_reload() {
        let temp_dir = TempDir::new().unwrap();
        let first_ids: Vec<u64> = {
            let mut store = store_for(&temp_dir, BackendKind::IndexedDb);
            let a = store.add(Book::new("A", "X", 1)).await.unwrap().book.id;
            let b = store.add(Book::new("B", "X", 1)).await.unwrap().book.id;
            vec![a, b]
        };

        let mut reopened = store_for(&temp_dir, BackendKind::IndexedDb);
        reopened.load().await.unwrap();
        let c = reopened.add(Book::new("C", "X", 1)).await.unwrap().book.id;

        assert!(!first_ids.contains(&c));
        assert_eq!(reopened.len(), 3);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        for backend in BackendKind::ALL {
            let temp_dir = TempDir::new().unwrap();
            let profile = Profile::new(temp_dir.path());
            let settings = PersistenceSettings::for_backend(backend);

            let mut writer = CollectionStore::new(profile.clone(), settings.clone());
            writer.add(Book::new("Zorba", "Kazantzakis", 400)).await.unwrap();
            writer.add(Book::new("Animal Farm", "Orwell", 112)).await.unwrap();

            let mut reader = CollectionStore::new(profile, settings);
            reader.load().await.unwrap();
            let once = reader.get_all().to_vec();
            reader.load().await.unwrap();

            assert_eq!(reader.get_all(), once.as_slice(), "{}", backend);
            assert_eq!(once, writer.get_all(), "{}", backend);
        }
    }

    #[tokio::test]
    async fn test_empty_load_policy() {
        let profile = Profile::new("/unused");
        let keep = PersistenceSettings::for_backend(BackendKind::SessionStorage);
        let overwrite = PersistenceSettings::builder()
            .backend(BackendKind::SessionStorage)
            .on_empty_load(OnEmptyLoad::Overwrite)
            .build();

        let mut kept = CollectionStore::new(profile.clone(), keep);
        kept.add(Book::new("Kept", "X", 1)).await.unwrap();
        let mut cleared = CollectionStore::new(profile.clone(), overwrite);
        cleared.add(Book::new("Cleared", "X", 1)).await.unwrap();

        // Stored collection disappears behind both stores' backs
        profile.session_area().clear();

        assert_eq!(kept.load().await.unwrap(), LoadOutcome::KeptEmpty);
        assert_eq!(kept.len(), 1);

        assert_eq!(cleared.load().await.unwrap(), LoadOutcome::Cleared);
        assert!(cleared.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_mutation_and_blocks_stale_load() {
        let options = ProfileOptions {
            session_storage_quota: 300,
            ..ProfileOptions::default()
        };
        let profile = Profile::with_options("/unused", options);
        let mut store = CollectionStore::new(
            profile,
            PersistenceSettings::for_backend(BackendKind::SessionStorage),
        );

        store.add(Book::new("Short", "A", 1)).await.unwrap();
        assert!(!store.has_unsaved_changes());

        let err = store
            .add(Book::new("A much longer title that will not fit", "B".repeat(200), 2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(StorageError::QuotaExceeded { .. })));
        assert_eq!(store.len(), 2);
        assert!(store.has_unsaved_changes());

        assert_eq!(store.load().await.unwrap(), LoadOutcome::KeptUnsaved);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_stored_ids_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let profile = Profile::new(temp_dir.path());
        WebStorageAdapter::local(profile.clone())
            .save(
                "ItemStore",
                r#"[{"id":1,"title":"First","author":"A","pageCount":1},
                    {"id":1,"title":"Second","author":"B","pageCount":2}]"#,
            )
            .unwrap();

        let mut store = CollectionStore::new(
            profile,
            PersistenceSettings::for_backend(BackendKind::LocalStorage),
        );
        assert_eq!(store.load().await.unwrap(), LoadOutcome::Replaced(1));
        assert_eq!(store.find_by_id(1).unwrap().title, "First");
    }

    #[tokio::test]
    async fn test_stored_records_without_ids_get_fresh_ids() {
        let temp_dir = TempDir::new().unwrap();
        let profile = Profile::new(temp_dir.path());
        WebStorageAdapter::local(profile.clone())
            .save(
                "ItemStore",
                r#"[{"title":"A","author":"X","pageCount":1},
                    {"id":4,"title":"C","author":"X","pageCount":3},
                    {"title":"B","author":"Y","pageCount":2}]"#,
            )
            .unwrap();
        let settings = PersistenceSettings::for_backend(BackendKind::LocalStorage);

        let mut store = CollectionStore::new(profile.clone(), settings.clone());
        assert_eq!(store.load().await.unwrap(), LoadOutcome::Replaced(3));
        assert_eq!(titles(&store), vec!["A", "B", "C"]);

        let ids: HashSet<u64> = store.get_all().iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&0));
        assert_eq!(store.find_by_id(4).unwrap().title, "C");
        assert!(ids.iter().all(|id| *id >= 4));
        assert!(!store.has_unsaved_changes());

        // Assigned ids were written back, so a second reader sees the same ones
        let mut reader = CollectionStore::new(profile, settings);
        reader.load().await.unwrap();
        assert_eq!(reader.get_all(), store.get_all());
    }

    #[tokio::test]
    async fn test_similar_store_names_do_not_share_data() {
        for backend in [BackendKind::Cookie, BackendKind::IndexedDb] {
            let temp_dir = TempDir::new().unwrap();
            let profile = Profile::new(temp_dir.path());
            let settings = |name: &str| {
                PersistenceSettings::builder()
                    .backend(backend)
                    .store_name(name)
                    .build()
            };

            let mut first = CollectionStore::new(profile.clone(), settings("My Store"));
            first.add(Book::new("Only in A", "X", 1)).await.unwrap();
            let mut second = CollectionStore::new(profile.clone(), settings("My_Store"));
            second.add(Book::new("Only in B", "Y", 2)).await.unwrap();

            let mut reloaded = CollectionStore::new(profile, settings("My Store"));
            reloaded.load().await.unwrap();
            assert_eq!(titles(&reloaded), vec!["Only in A"], "{}", backend);
        }
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_for(&temp_dir, BackendKind::IndexedDb);
        assert_eq!(store.state(), StoreState::Uninitialized);

        store.bind().unwrap();
        assert_eq!(store.state(), StoreState::Bound);

        store.load().await.unwrap();
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[tokio::test]
    async fn test_memory_only_store() {
        let mut store = CollectionStore::in_memory();
        assert_eq!(store.name(), DEFAULT_STORE_NAME);
        assert!(!store.is_persistent());

        store.add(Book::new("Dune", "Herbert", 412)).await.unwrap();
        assert!(!store.has_unsaved_changes());

        assert!(matches!(store.persist().await, Err(Error::PersistenceNotEnabled)));
        assert!(matches!(store.load().await, Err(Error::PersistenceNotEnabled)));
        assert_eq!(store.state(), StoreState::Uninitialized);
    }

    #[tokio::test]
    async fn test_open_loads_existing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let settings = PersistenceSettings::for_backend(BackendKind::Cookie);
        {
            let mut store = CollectionStore::new(Profile::new(temp_dir.path()), settings.clone());
            store.add(Book::new("Emma", "Austen", 474)).await.unwrap();
        }

        let store = CollectionStore::open(Profile::new(temp_dir.path()), settings)
            .await
            .unwrap()
            .with_name("Shelf");
        assert_eq!(store.name(), "Shelf");
        assert_eq!(titles(&store), vec!["Emma"]);
        assert_eq!(store.state(), StoreState::Ready);
    }

    #[tokio::test]
    async fn test_sorted_after_mixed_operations() {
        let mut store = CollectionStore::in_memory();
        let mut ids = Vec::new();
        for title in ["m", "c", "x", "a", "q", "c"] {
            ids.push(store.add(Book::new(title, "X", 1)).await.unwrap().book.id);
            assert_sorted(&store);
        }

        store.remove_by_id(ids[2]).await.unwrap();
        assert_sorted(&store);
        store.update(Book::new("b", "X", 1).with_id(ids[0])).await.unwrap();
        assert_sorted(&store);
        assert_eq!(titles(&store), vec!["a", "b", "c", "c", "q"]);
    }
}
