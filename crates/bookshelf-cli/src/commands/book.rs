//! Book command handlers

use anyhow::{Context, Result};

use bookshelf_core::{parse_page_count, Book, CollectionStore};

use crate::output::Output;

/// Add a new book
pub async fn add(
    store: &mut CollectionStore,
    title: String,
    author: String,
    pages: String,
    output: &Output,
) -> Result<()> {
    let book = Book::from_input(title, author, &pages)?;
    let activity = store.add(book).await.context("Failed to add book")?;

    output.print_activity(&activity);
    Ok(())
}

/// Change fields of an existing book
pub async fn update(
    store: &mut CollectionStore,
    id: u64,
    title: Option<String>,
    author: Option<String>,
    pages: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut book = store.find_by_id(id)?.clone();

    if let Some(title) = title {
        book.title = title;
    }
    if let Some(author) = author {
        book.author = author;
    }
    if let Some(pages) = pages {
        book.page_count = parse_page_count(&pages)?;
    }

    let activity = store.update(book).await.context("Failed to update book")?;

    output.print_activity(&activity);
    Ok(())
}

/// Remove a book
pub async fn remove(store: &mut CollectionStore, id: u64, output: &Output) -> Result<()> {
    let activity = store
        .remove_by_id(id)
        .await
        .with_context(|| format!("Failed to remove book {}", id))?;

    output.print_activity(&activity);
    Ok(())
}

/// Show a single book
pub fn show(store: &CollectionStore, id: u64, output: &Output) -> Result<()> {
    let book = store.find_by_id(id)?;

    output.print_book(book);
    Ok(())
}

/// List all books in title order
pub fn list(store: &CollectionStore, output: &Output) -> Result<()> {
    output.print_books(store.get_all());
    Ok(())
}
