use crate::error::DbError;
use crate::store::{
    AuthorEntry, AuthorFilter, BookEntry, BookFilter, CatalogStore, search_term,
};
use analytics::CatalogSnapshot;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    Author, AuthorChanges, AuthorId, Authorship, Book, BookChanges, BookId, NewAuthor, NewBook,
};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

/// A `CatalogStore` held entirely in memory.
///
/// Used by tests and by `serve --in-memory`. Ids are assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

#[derive(Debug, Default)]
struct Catalog {
    authors: BTreeMap<AuthorId, Author>,
    books: BTreeMap<BookId, Book>,
    // (author_id, book_id), so an author's books form a contiguous range.
    authorships: BTreeSet<(AuthorId, BookId)>,
    last_author_id: AuthorId,
    last_book_id: BookId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Catalog {
    fn book_ids_of(&self, author_id: AuthorId) -> impl Iterator<Item = BookId> + '_ {
        self.authorships
            .range((author_id, BookId::MIN)..=(author_id, BookId::MAX))
            .map(|&(_, book_id)| book_id)
    }

    fn author_ids_of(&self, book_id: BookId) -> impl Iterator<Item = AuthorId> + '_ {
        self.authorships
            .iter()
            .filter(move |&&(_, b)| b == book_id)
            .map(|&(author_id, _)| author_id)
    }

    fn author_entry(&self, author: &Author) -> AuthorEntry {
        AuthorEntry::new(author.clone(), self.book_ids_of(author.id).count())
    }

    fn book_entry(&self, book: &Book) -> BookEntry {
        let authors = self
            .author_ids_of(book.id)
            .filter_map(|id| self.authors.get(&id))
            .map(|author| self.author_entry(author))
            .collect();
        BookEntry::new(book.clone(), authors)
    }

    fn check_authors(&self, ids: &[AuthorId]) -> Result<(), DbError> {
        let unknown: Vec<AuthorId> = ids
            .iter()
            .copied()
            .filter(|id| !self.authors.contains_key(id))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(DbError::unknown_authors(&unknown))
        }
    }

    fn set_authors(&mut self, book_id: BookId, ids: &[AuthorId]) {
        self.authorships.retain(|&(_, b)| b != book_id);
        self.authorships
            .extend(ids.iter().map(|&author_id| (author_id, book_id)));
    }

    fn edges(&self) -> impl Iterator<Item = Authorship> + '_ {
        self.authorships
            .iter()
            .map(|&(author_id, book_id)| Authorship { author_id, book_id })
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<AuthorEntry>, DbError> {
        let catalog = self.catalog.read().await;
        let search = search_term(filter.search.as_deref()).map(str::to_lowercase);

        let mut entries: Vec<AuthorEntry> = catalog
            .authors
            .values()
            .filter(|a| {
                filter
                    .nationality
                    .as_deref()
                    .is_none_or(|n| a.nationality == n)
            })
            .filter(|a| {
                search.as_deref().is_none_or(|s| {
                    contains_ci(&a.first_name, s)
                        || contains_ci(&a.last_name, s)
                        || contains_ci(&a.nationality, s)
                        || contains_ci(&a.biography, s)
                })
            })
            .map(|a| catalog.author_entry(a))
            .collect();

        match filter.ordering {
            Some(order) => entries.sort_by(|a, b| order.compare(&a.author, &b.author)),
            None => entries.sort_by(|a, b| {
                (&a.author.first_name, &a.author.last_name, a.author.id).cmp(&(
                    &b.author.first_name,
                    &b.author.last_name,
                    b.author.id,
                ))
            }),
        }
        Ok(entries)
    }

    async fn get_author(&self, id: AuthorId) -> Result<AuthorEntry, DbError> {
        let catalog = self.catalog.read().await;
        catalog
            .authors
            .get(&id)
            .map(|a| catalog.author_entry(a))
            .ok_or_else(|| DbError::author_not_found(id))
    }

    async fn create_author(&self, author: &NewAuthor) -> Result<AuthorEntry, DbError> {
        author.validate()?;
        let mut catalog = self.catalog.write().await;

        catalog.last_author_id += 1;
        let now = Utc::now();
        let stored = Author {
            id: catalog.last_author_id,
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            birth_date: author.birth_date,
            nationality: author.nationality.clone(),
            biography: author.biography.clone(),
            created_at: now,
            updated_at: now,
        };
        catalog.authors.insert(stored.id, stored.clone());
        Ok(AuthorEntry::new(stored, 0))
    }

    async fn update_author(
        &self,
        id: AuthorId,
        changes: &AuthorChanges,
    ) -> Result<AuthorEntry, DbError> {
        changes.validate()?;
        let mut catalog = self.catalog.write().await;

        let author = catalog
            .authors
            .get_mut(&id)
            .ok_or_else(|| DbError::author_not_found(id))?;
        changes.apply_to(author);
        author.updated_at = Utc::now();
        let author = author.clone();
        Ok(catalog.author_entry(&author))
    }

    async fn delete_author(&self, id: AuthorId) -> Result<(), DbError> {
        let mut catalog = self.catalog.write().await;
        catalog
            .authors
            .remove(&id)
            .ok_or_else(|| DbError::author_not_found(id))?;
        catalog.authorships.retain(|&(a, _)| a != id);
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookEntry>, DbError> {
        let catalog = self.catalog.read().await;
        let search = search_term(filter.search.as_deref()).map(str::to_lowercase);

        let mut entries: Vec<BookEntry> = catalog
            .books
            .values()
            .filter(|b| filter.language.is_none_or(|l| b.language == l))
            .filter(|b| {
                filter
                    .author_id
                    .is_none_or(|a| catalog.authorships.contains(&(a, b.id)))
            })
            .filter(|b| {
                search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&b.title, s) || contains_ci(&b.description, s))
            })
            .map(|b| catalog.book_entry(b))
            .collect();

        match filter.ordering {
            Some(order) => entries.sort_by(|a, b| order.compare(&a.book, &b.book)),
            None => entries
                .sort_by(|a, b| (&a.book.title, a.book.id).cmp(&(&b.book.title, b.book.id))),
        }
        Ok(entries)
    }

    async fn get_book(&self, id: BookId) -> Result<BookEntry, DbError> {
        let catalog = self.catalog.read().await;
        catalog
            .books
            .get(&id)
            .map(|b| catalog.book_entry(b))
            .ok_or_else(|| DbError::book_not_found(id))
    }

    async fn create_book(&self, book: &NewBook) -> Result<BookEntry, DbError> {
        book.validate()?;
        let mut catalog = self.catalog.write().await;
        catalog.check_authors(&book.authors_ids)?;

        catalog.last_book_id += 1;
        let now = Utc::now();
        let stored = Book {
            id: catalog.last_book_id,
            title: book.title.clone(),
            publication_date: book.publication_date,
            description: book.description.clone(),
            page_count: book.page_count,
            language: book.language,
            created_at: now,
            updated_at: now,
        };
        catalog.set_authors(stored.id, &book.authors_ids);
        catalog.books.insert(stored.id, stored.clone());
        Ok(catalog.book_entry(&stored))
    }

    async fn update_book(&self, id: BookId, changes: &BookChanges) -> Result<BookEntry, DbError> {
        changes.validate()?;
        let mut catalog = self.catalog.write().await;
        if !catalog.books.contains_key(&id) {
            return Err(DbError::book_not_found(id));
        }
        if let Some(ids) = &changes.authors_ids {
            catalog.check_authors(ids)?;
            catalog.set_authors(id, ids);
        }

        let book = catalog
            .books
            .get_mut(&id)
            .ok_or_else(|| DbError::book_not_found(id))?;
        changes.apply_to(book);
        book.updated_at = Utc::now();
        let book = book.clone();
        Ok(catalog.book_entry(&book))
    }

    async fn delete_book(&self, id: BookId) -> Result<(), DbError> {
        let mut catalog = self.catalog.write().await;
        catalog
            .books
            .remove(&id)
            .ok_or_else(|| DbError::book_not_found(id))?;
        catalog.authorships.retain(|&(_, b)| b != id);
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<CatalogSnapshot, DbError> {
        let catalog = self.catalog.read().await;
        Ok(CatalogSnapshot::new(
            catalog.authors.values().cloned().collect(),
            catalog.books.values().cloned().collect(),
            catalog.edges(),
        ))
    }

    async fn load_author_snapshot(&self, id: AuthorId) -> Result<CatalogSnapshot, DbError> {
        let catalog = self.catalog.read().await;
        let Some(author) = catalog.authors.get(&id) else {
            return Ok(CatalogSnapshot::new(Vec::new(), Vec::new(), Vec::<Authorship>::new()));
        };

        let book_ids: Vec<BookId> = catalog.book_ids_of(id).collect();
        let books = book_ids
            .iter()
            .filter_map(|book_id| catalog.books.get(book_id))
            .cloned()
            .collect();
        let edges = book_ids.iter().map(|&book_id| Authorship {
            author_id: id,
            book_id,
        });
        Ok(CatalogSnapshot::new(vec![author.clone()], books, edges))
    }
}
