//! # Catalog Core Types
//!
//! The shared vocabulary of the catalog workspace: authors, books, the
//! authorship relation between them and the book language enum.
//!
//! This is a Layer 0 crate. It knows nothing about databases, HTTP or
//! reporting; every other crate depends on it.

pub mod enums;
pub mod error;
pub mod format;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::Language;
pub use error::CoreError;
pub use format::{authors_display, full_name};
pub use structs::{
    Author, AuthorChanges, AuthorId, Authorship, Book, BookChanges, BookId, NewAuthor, NewBook,
};
