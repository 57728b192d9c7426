//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde_json::json;

use bookshelf_core::{Activity, Book};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single book
    pub fn print_book(&self, book: &Book) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:       {}", book.id);
                println!("Title:    {}", book.title);
                println!("Author:   {}", book.author);
                println!("Pages:    {}", book.page_count);
                println!("Created:  {}", book.created_on.format("%Y-%m-%d %H:%M"));
                println!("Modified: {}", book.modified_on.format("%Y-%m-%d %H:%M"));
            }
            OutputFormat::Json => print_json(&json!(book)),
            OutputFormat::Quiet => println!("{}", book.id),
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[Book]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in books {
                    println!(
                        "{:>4} | {} | {} | {} pages",
                        book.id,
                        truncate(&book.title, 35),
                        truncate(&book.author, 25),
                        book.page_count
                    );
                }
                let pages: u64 = books.iter().map(|b| u64::from(b.page_count)).sum();
                println!("\n{} book(s), {} pages", books.len(), pages);
            }
            OutputFormat::Json => print_json(&json!(books)),
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print the result of a mutation
    pub fn print_activity(&self, activity: &Activity) {
        match self.format {
            OutputFormat::Human => {
                println!("✓ {}", activity.message);
                println!("  {}", activity.book);
            }
            OutputFormat::Json => print_json(&json!({
                "status": "success",
                "message": activity.message,
                "book": activity.book,
            })),
            OutputFormat::Quiet => println!("{}", activity.book.id),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Pretty-print a JSON value to stdout
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render JSON: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
