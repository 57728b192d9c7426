//! Data models for Bookshelf
//!
//! A [`Book`] is the single record type kept in a collection. Its JSON
//! form (camelCase fields, RFC 3339 timestamps) is what every storage
//! backend persists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Id value meaning "not yet assigned; generate one on add"
pub const UNASSIGNED_ID: u64 = 0;

/// Largest id a book may carry; ids must fit an IndexedDB integer key
pub const MAX_ID: u64 = i64::MAX as u64;

/// A book in the collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier within a collection, `0` until assigned
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub author: String,
    /// Number of pages
    #[serde(
        default,
        alias = "numberOfPages",
        deserialize_with = "deserialize_page_count"
    )]
    pub page_count: u32,
    /// When this book was first created, never changed afterwards
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    /// When this book was last modified
    #[serde(default = "Utc::now")]
    pub modified_on: DateTime<Utc>,
}

impl Book {
    /// Create a new book with an unassigned id
    pub fn new(title: impl Into<String>, author: impl Into<String>, page_count: u32) -> Self {
        let now = Utc::now();
        Self {
            id: UNASSIGNED_ID,
            title: title.into(),
            author: author.into(),
            page_count,
            created_on: now,
            modified_on: now,
        }
    }

    /// Create a book from loosely typed input, coercing the page count
    ///
    /// Accepts anything that reads as a non-negative number; fractions
    /// are truncated.
    pub fn from_input(
        title: impl Into<String>,
        author: impl Into<String>,
        page_count: &str,
    ) -> Result<Self> {
        let pages = parse_page_count(page_count)?;
        Ok(Self::new(title, author, pages))
    }

    /// Create a book with a specific id (for updates and loading)
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = id;
        self
    }

    /// Whether this book still needs an id
    pub fn is_unassigned(&self) -> bool {
        self.id == UNASSIGNED_ID
    }

    /// One-line description used in activity logs
    pub fn details(&self) -> String {
        self.to_string()
    }

    pub fn total_pages(&self) -> u32 {
        self.page_count
    }

    /// Mark as modified now, never moving the timestamp backwards
    pub(crate) fn touch(&mut self, previous: DateTime<Utc>) {
        self.modified_on = Utc::now().max(previous);
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has {} pages and was written by {}",
            self.title, self.page_count, self.author
        )
    }
}

/// Result of a collection mutation: the affected book and a log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub book: Book,
    pub message: String,
}

impl Activity {
    pub fn new(book: Book, message: impl Into<String>) -> Self {
        Self {
            book,
            message: message.into(),
        }
    }
}

/// Coerce user input to a page count
pub fn parse_page_count(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let invalid = || Error::InvalidPageCount(input.to_string());

    if let Ok(n) = trimmed.parse::<u32>() {
        return Ok(n);
    }

    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(value.trunc() as u32)
}

/// Accept page counts stored as numbers or numeric strings
fn deserialize_page_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => u32::try_from(n).map_err(serde::de::Error::custom),
        Raw::Float(f) => parse_page_count(&f.to_string()).map_err(serde::de::Error::custom),
        Raw::Text(s) => parse_page_count(&s).map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0),
    }
}
