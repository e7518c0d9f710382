use core_types::{Author, AuthorId, Authorship, Book, BookId};
use std::collections::{HashMap, HashSet};

/// A fully materialized, read-only view of the catalog at one point in time.
///
/// The many-to-many relation is held as two independent indexes (author to
/// books, book to authors) keyed by id. Entities never point at each other.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    authors: Vec<Author>,
    books: Vec<Book>,
    author_positions: HashMap<AuthorId, usize>,
    book_positions: HashMap<BookId, usize>,
    books_by_author: HashMap<AuthorId, Vec<BookId>>,
    authors_by_book: HashMap<BookId, Vec<AuthorId>>,
}

/// One author joined with their books, as consumed by author-level aggregations.
#[derive(Debug, Clone)]
pub struct AuthorBooks<'a> {
    pub author: &'a Author,
    pub books: Vec<&'a Book>,
}

impl CatalogSnapshot {
    /// Builds the snapshot and its indexes.
    ///
    /// Duplicate authorship edges are collapsed and edges that reference an
    /// author or book missing from the snapshot are dropped. Index lists are
    /// sorted by id.
    pub fn new<I>(authors: Vec<Author>, books: Vec<Book>, authorships: I) -> Self
    where
        I: IntoIterator<Item = Authorship>,
    {
        let author_positions: HashMap<AuthorId, usize> = authors
            .iter()
            .enumerate()
            .map(|(position, author)| (author.id, position))
            .collect();
        let book_positions: HashMap<BookId, usize> = books
            .iter()
            .enumerate()
            .map(|(position, book)| (book.id, position))
            .collect();

        let mut books_by_author: HashMap<AuthorId, Vec<BookId>> = HashMap::new();
        let mut authors_by_book: HashMap<BookId, Vec<AuthorId>> = HashMap::new();
        let mut seen = HashSet::new();

        for edge in authorships {
            if !author_positions.contains_key(&edge.author_id)
                || !book_positions.contains_key(&edge.book_id)
                || !seen.insert(edge)
            {
                continue;
            }
            books_by_author
                .entry(edge.author_id)
                .or_default()
                .push(edge.book_id);
            authors_by_book
                .entry(edge.book_id)
                .or_default()
                .push(edge.author_id);
        }

        books_by_author.values_mut().for_each(|ids| ids.sort_unstable());
        authors_by_book.values_mut().for_each(|ids| ids.sort_unstable());

        Self {
            authors,
            books,
            author_positions,
            book_positions,
            books_by_author,
            authors_by_book,
        }
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty() && self.books.is_empty()
    }

    pub fn author(&self, id: AuthorId) -> Option<&Author> {
        self.author_positions.get(&id).map(|&i| &self.authors[i])
    }

    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.book_positions.get(&id).map(|&i| &self.books[i])
    }

    pub fn book_ids_of(&self, author_id: AuthorId) -> &[BookId] {
        self.books_by_author
            .get(&author_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn author_ids_of(&self, book_id: BookId) -> &[AuthorId] {
        self.authors_by_book
            .get(&book_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The books credited to `author_id`, ordered by book id.
    pub fn books_of(&self, author_id: AuthorId) -> Vec<&Book> {
        self.book_ids_of(author_id)
            .iter()
            .filter_map(|&id| self.book(id))
            .collect()
    }

    /// Every author joined with their books, in snapshot order.
    pub fn author_books(&self) -> impl Iterator<Item = AuthorBooks<'_>> + '_ {
        self.authors.iter().map(|author| AuthorBooks {
            author,
            books: self.books_of(author.id),
        })
    }
}
