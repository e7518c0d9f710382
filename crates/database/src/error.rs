use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("A stored row could not be decoded: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DbError {
    pub fn author_not_found(id: core_types::AuthorId) -> Self {
        DbError::NotFound(format!("author {id}"))
    }

    pub fn book_not_found(id: core_types::BookId) -> Self {
        DbError::NotFound(format!("book {id}"))
    }

    /// The error for `authors_ids` that reference no stored author.
    pub fn unknown_authors(ids: &[core_types::AuthorId]) -> Self {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        DbError::Validation(CoreError::InvalidInput(
            "authors_ids".to_string(),
            format!("unknown author ids: {}", ids.join(", ")),
        ))
    }
}
