//! # Catalog Database Crate
//!
//! This crate owns persistence for authors, books and the authorship relation
//! between them. It is the system's "permanent archive."
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate is an adapter that encapsulates all database-specific
//!   logic. It provides a clean, abstract API to the rest of the application, hiding
//!   the underlying SQL and database implementation details.
//! - **One Seam, Two Backends:** `CatalogStore` is the only interface callers see.
//!   `DbRepository` implements it on PostgreSQL; `MemoryStore` implements it in memory
//!   for tests and demos.
//! - **Consistent Reads:** Reports are computed from a `CatalogSnapshot` loaded in a single
//!   `REPEATABLE READ` transaction, so one report never mixes two states of the catalog.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `CatalogStore`: The storage trait, with `AuthorEntry`/`BookEntry` results, filters and
//!   whitelisted `SortOrder`s.
//! - `DbRepository` and `MemoryStore`: its two implementations.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::{
    AuthorEntry, AuthorFilter, AuthorOrder, AuthorSortKey, BookEntry, BookFilter, BookOrder,
    BookSortKey, CatalogStore, SortKey, SortOrder,
};
