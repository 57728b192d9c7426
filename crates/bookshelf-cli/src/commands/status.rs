//! Status command handler

use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use bookshelf_core::{BackendKind, CollectionStore, Config, StoreState};

use crate::output::{print_json, Output, OutputFormat};

/// Show status information
pub fn show(store: &CollectionStore, config: &Config, output: &Output) -> Result<()> {
    let settings = &config.persistence;
    let location = storage_location(config);
    let state = match store.state() {
        StoreState::Uninitialized => "uninitialized",
        StoreState::Bound => "bound",
        StoreState::Ready => "ready",
    };

    match output.format {
        OutputFormat::Json => print_json(&json!({
            "store": store.name(),
            "state": state,
            "backend": settings.backend(),
            "store_name": settings.store_name(),
            "location": location,
            "unsaved_changes": store.has_unsaved_changes(),
            "counts": {
                "books": store.len(),
                "pages": store.total_pages()
            }
        })),
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("Bookshelf Status");
            println!("================");
            println!();
            println!("Store:");
            println!("  Name:    {}", store.name());
            println!("  State:   {}", state);
            println!();
            println!("Storage:");
            println!("  Backend:  {}", settings.backend());
            println!("  Key:      {}", settings.store_name());
            match location {
                Some(path) => println!("  Location: {}", path.display()),
                None => println!("  Location: (process memory)"),
            }
            println!();
            println!("Contents:");
            println!("  Books: {}", store.len());
            println!("  Pages: {}", store.total_pages());
        }
    }

    Ok(())
}

/// File backing the configured backend; sessionStorage has none
fn storage_location(config: &Config) -> Option<PathBuf> {
    let profile = config.profile();
    match config.persistence.backend() {
        BackendKind::Cookie => Some(profile.cookie_jar_path()),
        BackendKind::LocalStorage => Some(profile.local_storage_path()),
        BackendKind::SessionStorage => None,
        BackendKind::IndexedDb => Some(profile.indexed_db_path(config.persistence.store_name())),
    }
}
