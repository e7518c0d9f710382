use crate::error::DbError;
use analytics::CatalogSnapshot;
use async_trait::async_trait;
use core_types::{
    Author, AuthorChanges, AuthorId, Book, BookChanges, BookId, CoreError, Language, NewAuthor,
    NewBook,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// A column a listing can be sorted on.
///
/// The SQL for a key comes from this closed set, never from the request.
pub trait SortKey: Copy + Sized + 'static {
    /// Every accepted key with the name clients use for it.
    const KEYS: &'static [(&'static str, Self)];
    /// Ties on the key are broken by this column, ascending.
    const ID_COLUMN: &'static str;

    fn column(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSortKey {
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
}

impl SortKey for AuthorSortKey {
    const KEYS: &'static [(&'static str, Self)] = &[
        ("first_name", AuthorSortKey::FirstName),
        ("last_name", AuthorSortKey::LastName),
        ("created_at", AuthorSortKey::CreatedAt),
        ("updated_at", AuthorSortKey::UpdatedAt),
    ];
    const ID_COLUMN: &'static str = "a.id";

    fn column(self) -> &'static str {
        match self {
            AuthorSortKey::FirstName => "a.first_name",
            AuthorSortKey::LastName => "a.last_name",
            AuthorSortKey::CreatedAt => "a.created_at",
            AuthorSortKey::UpdatedAt => "a.updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSortKey {
    Title,
    PublicationDate,
    PageCount,
    CreatedAt,
}

impl SortKey for BookSortKey {
    const KEYS: &'static [(&'static str, Self)] = &[
        ("title", BookSortKey::Title),
        ("publication_date", BookSortKey::PublicationDate),
        ("page_count", BookSortKey::PageCount),
        ("created_at", BookSortKey::CreatedAt),
    ];
    const ID_COLUMN: &'static str = "b.id";

    fn column(self) -> &'static str {
        match self {
            BookSortKey::Title => "b.title",
            BookSortKey::PublicationDate => "b.publication_date",
            BookSortKey::PageCount => "b.page_count",
            BookSortKey::CreatedAt => "b.created_at",
        }
    }
}

/// A client-chosen listing order, written `key` or `-key` for descending.
///
/// Missing values sort last in either direction and id ascending breaks ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder<K> {
    pub key: K,
    pub descending: bool,
}

pub type AuthorOrder = SortOrder<AuthorSortKey>;
pub type BookOrder = SortOrder<BookSortKey>;

impl<K: SortKey> FromStr for SortOrder<K> {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, s),
        };
        K::KEYS
            .iter()
            .find(|(key_name, _)| *key_name == name)
            .map(|&(_, key)| SortOrder { key, descending })
            .ok_or_else(|| {
                let accepted: Vec<&str> = K::KEYS.iter().map(|(key_name, _)| *key_name).collect();
                CoreError::InvalidInput(
                    "ordering".to_string(),
                    format!("unknown key '{s}', expected one of {}", accepted.join(", ")),
                )
            })
    }
}

impl<'de, K: SortKey> Deserialize<'de> for SortOrder<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl<K: SortKey> SortOrder<K> {
    /// The `ORDER BY` body for this order.
    pub(crate) fn order_by(&self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(
            "{} {direction} NULLS LAST, {}",
            self.key.column(),
            K::ID_COLUMN
        )
    }
}

impl<K> SortOrder<K> {
    fn directed(&self, ordering: Ordering) -> Ordering {
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }

    fn nulls_last<T: Ord>(&self, a: Option<T>, b: Option<T>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => self.directed(a.cmp(&b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl AuthorOrder {
    /// The in-memory counterpart of [`SortOrder::order_by`].
    pub(crate) fn compare(&self, a: &Author, b: &Author) -> Ordering {
        let ordering = match self.key {
            AuthorSortKey::FirstName => a.first_name.cmp(&b.first_name),
            AuthorSortKey::LastName => a.last_name.cmp(&b.last_name),
            AuthorSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            AuthorSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        self.directed(ordering).then(a.id.cmp(&b.id))
    }
}

impl BookOrder {
    pub(crate) fn compare(&self, a: &Book, b: &Book) -> Ordering {
        let ordering = match self.key {
            BookSortKey::Title => self.directed(a.title.cmp(&b.title)),
            BookSortKey::PublicationDate => {
                self.nulls_last(a.publication_date, b.publication_date)
            }
            BookSortKey::PageCount => self.nulls_last(a.page_count, b.page_count),
            BookSortKey::CreatedAt => self.directed(a.created_at.cmp(&b.created_at)),
        };
        ordering.then(a.id.cmp(&b.id))
    }
}

/// Narrows `list_authors`. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorFilter {
    /// Exact nationality match.
    pub nationality: Option<String>,
    /// Case-insensitive substring of first name, last name, nationality or biography.
    pub search: Option<String>,
    /// Replaces the default first name, last name order.
    pub ordering: Option<AuthorOrder>,
}

/// Narrows `list_books`. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookFilter {
    pub language: Option<Language>,
    /// Books credited to this author.
    pub author_id: Option<AuthorId>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Replaces the default title order.
    pub ordering: Option<BookOrder>,
}

/// An author together with the derived fields shown by the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorEntry {
    #[serde(flatten)]
    pub author: Author,
    pub full_name: String,
    pub books_count: usize,
}

impl AuthorEntry {
    pub fn new(author: Author, books_count: usize) -> Self {
        let full_name = author.full_name();
        Self {
            author,
            full_name,
            books_count,
        }
    }
}

/// A book with its full author records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookEntry {
    #[serde(flatten)]
    pub book: Book,
    pub language_display: String,
    /// Ordered by first name, last name, then id.
    pub authors: Vec<AuthorEntry>,
    pub authors_count: usize,
}

impl BookEntry {
    pub fn new(book: Book, mut authors: Vec<AuthorEntry>) -> Self {
        authors.sort_by(|a, b| {
            (&a.author.first_name, &a.author.last_name, a.author.id).cmp(&(
                &b.author.first_name,
                &b.author.last_name,
                b.author.id,
            ))
        });
        Self {
            language_display: book.language.label().to_string(),
            authors_count: authors.len(),
            book,
            authors,
        }
    }
}

/// Persistence for the catalog.
///
/// Every implementation enforces the same rules: payloads are validated before
/// they are written, `authors_ids` must reference existing authors, and deleting
/// an author or a book removes its authorship edges.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Authors in `filter.ordering`, or by first name, last name, then id.
    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<AuthorEntry>, DbError>;
    async fn get_author(&self, id: AuthorId) -> Result<AuthorEntry, DbError>;
    async fn create_author(&self, author: &NewAuthor) -> Result<AuthorEntry, DbError>;
    async fn update_author(
        &self,
        id: AuthorId,
        changes: &AuthorChanges,
    ) -> Result<AuthorEntry, DbError>;
    async fn delete_author(&self, id: AuthorId) -> Result<(), DbError>;

    /// Books in `filter.ordering`, or by title, then id.
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookEntry>, DbError>;
    async fn get_book(&self, id: BookId) -> Result<BookEntry, DbError>;
    async fn create_book(&self, book: &NewBook) -> Result<BookEntry, DbError>;
    async fn update_book(&self, id: BookId, changes: &BookChanges) -> Result<BookEntry, DbError>;
    async fn delete_book(&self, id: BookId) -> Result<(), DbError>;

    /// A consistent read of the whole catalog.
    async fn load_snapshot(&self) -> Result<CatalogSnapshot, DbError>;

    /// A consistent read of one author and their books.
    ///
    /// An unknown author yields an empty snapshot; the report layer decides
    /// whether that is an error.
    async fn load_author_snapshot(&self, id: AuthorId) -> Result<CatalogSnapshot, DbError>;
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `LIKE`.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trims the search term; blank terms match everything.
pub(crate) fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}
