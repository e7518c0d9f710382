use crate::error::DbError;
use crate::store::{
    AuthorEntry, AuthorFilter, BookEntry, BookFilter, CatalogStore, like_pattern, search_term,
};
use analytics::CatalogSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{
    Author, AuthorChanges, AuthorId, Authorship, Book, BookChanges, BookId, NewAuthor, NewBook,
};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, Transaction};
use std::collections::{BTreeSet, HashMap};

macro_rules! author_columns {
    () => {
        "a.id, a.first_name, a.last_name, a.birth_date, a.nationality, a.biography, \
         a.created_at, a.updated_at"
    };
}

macro_rules! books_count {
    () => {
        "(SELECT COUNT(*) FROM book_authors AS c WHERE c.author_id = a.id) AS books_count"
    };
}

macro_rules! book_columns {
    () => {
        "b.id, b.title, b.publication_date, b.description, b.page_count, b.language, \
         b.created_at, b.updated_at"
    };
}

/// The `DbRepository` provides the PostgreSQL implementation of [`CatalogStore`].
/// It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

/// A row of the `authors` table.
#[derive(Debug, Clone, FromRow)]
struct AuthorRow {
    id: i64,
    first_name: String,
    last_name: String,
    birth_date: Option<NaiveDate>,
    nationality: String,
    biography: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            birth_date: row.birth_date,
            nationality: row.nationality,
            biography: row.biography,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AuthorCountRow {
    #[sqlx(flatten)]
    author: AuthorRow,
    books_count: i64,
}

impl From<AuthorCountRow> for AuthorEntry {
    fn from(row: AuthorCountRow) -> Self {
        AuthorEntry::new(row.author.into(), row.books_count.max(0) as usize)
    }
}

/// An author joined through `book_authors`, tagged with the book it was reached from.
#[derive(Debug, Clone, FromRow)]
struct BookAuthorRow {
    book_id: i64,
    #[sqlx(flatten)]
    author: AuthorCountRow,
}

/// A row of the `books` table. `language` holds the short code.
#[derive(Debug, Clone, FromRow)]
struct BookRow {
    id: i64,
    title: String,
    publication_date: Option<NaiveDate>,
    description: String,
    page_count: Option<i32>,
    language: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = DbError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let language = row
            .language
            .parse()
            .map_err(|e| DbError::InvalidData(format!("book {}: {e}", row.id)))?;
        let page_count = row
            .page_count
            .map(u32::try_from)
            .transpose()
            .map_err(|_| DbError::InvalidData(format!("book {}: negative page_count", row.id)))?;

        Ok(Book {
            id: row.id,
            title: row.title,
            publication_date: row.publication_date,
            description: row.description,
            page_count,
            language,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_books(rows: Vec<BookRow>) -> Result<Vec<Book>, DbError> {
    rows.into_iter().map(Book::try_from).collect()
}

fn page_count_column(page_count: Option<u32>) -> Result<Option<i32>, DbError> {
    page_count
        .map(i32::try_from)
        .transpose()
        .map_err(|_| DbError::InvalidData("page_count does not fit the column".to_string()))
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attaches full author records to each book, preserving the row order.
    async fn book_entries(&self, books: Vec<Book>) -> Result<Vec<BookEntry>, DbError> {
        if books.is_empty() {
            return Ok(Vec::new());
        }
        let book_ids: Vec<i64> = books.iter().map(|b| b.id).collect();

        let rows = sqlx::query_as::<_, BookAuthorRow>(concat!(
            "SELECT ba.book_id, ",
            author_columns!(),
            ", ",
            books_count!(),
            " FROM book_authors AS ba JOIN authors AS a ON a.id = ba.author_id",
            " WHERE ba.book_id = ANY($1)"
        ))
        .bind(&book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut authors_by_book: HashMap<BookId, Vec<AuthorEntry>> = HashMap::new();
        for row in rows {
            authors_by_book
                .entry(row.book_id)
                .or_default()
                .push(row.author.into());
        }

        Ok(books
            .into_iter()
            .map(|book| {
                let authors = authors_by_book.remove(&book.id).unwrap_or_default();
                BookEntry::new(book, authors)
            })
            .collect())
    }
}

/// Fails with a validation error when any id has no author row.
async fn ensure_authors_exist(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[AuthorId],
) -> Result<(), DbError> {
    if ids.is_empty() {
        return Ok(());
    }
    // FOR SHARE keeps the authors from being deleted before the edges are written.
    let found: BTreeSet<i64> =
        sqlx::query_scalar::<_, i64>("SELECT id FROM authors WHERE id = ANY($1) FOR SHARE")
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .collect();

    let unknown: BTreeSet<AuthorId> = ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(DbError::unknown_authors(
            &unknown.into_iter().collect::<Vec<_>>(),
        ))
    }
}

/// Replaces the authors of `book_id` with `ids`.
async fn link_authors(
    tx: &mut Transaction<'_, Postgres>,
    book_id: BookId,
    ids: &[AuthorId],
) -> Result<(), DbError> {
    sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
        .bind(book_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "INSERT INTO book_authors (book_id, author_id) \
         SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
    )
    .bind(book_id)
    .bind(ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Opens a transaction in which every read sees the same committed state.
async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

#[async_trait]
impl CatalogStore for DbRepository {
    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<AuthorEntry>, DbError> {
        let search = search_term(filter.search.as_deref()).map(like_pattern);

        let order_by = filter.ordering.map_or_else(
            || "a.first_name, a.last_name, a.id".to_string(),
            |order| order.order_by(),
        );
        let sql = format!(
            concat!(
                "SELECT ",
                author_columns!(),
                ", ",
                books_count!(),
                " FROM authors AS a",
                " WHERE ($1::TEXT IS NULL OR a.nationality = $1)",
                " AND ($2::TEXT IS NULL OR a.first_name ILIKE $2 OR a.last_name ILIKE $2",
                " OR a.nationality ILIKE $2 OR a.biography ILIKE $2)",
                " ORDER BY {}"
            ),
            order_by
        );

        let rows = sqlx::query_as::<_, AuthorCountRow>(&sql)
            .bind(filter.nationality.as_deref())
            .bind(search)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(AuthorEntry::from).collect())
    }

    async fn get_author(&self, id: AuthorId) -> Result<AuthorEntry, DbError> {
        let row = sqlx::query_as::<_, AuthorCountRow>(concat!(
            "SELECT ",
            author_columns!(),
            ", ",
            books_count!(),
            " FROM authors AS a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::author_not_found(id))?;

        Ok(row.into())
    }

    async fn create_author(&self, author: &NewAuthor) -> Result<AuthorEntry, DbError> {
        author.validate()?;

        let row = sqlx::query_as::<_, AuthorRow>(
            r#"
            INSERT INTO authors (first_name, last_name, birth_date, nationality, biography)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, first_name, last_name, birth_date, nationality, biography,
                      created_at, updated_at
            "#,
        )
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .bind(&author.biography)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(author_id = row.id, "Created author");
        Ok(AuthorEntry::new(row.into(), 0))
    }

    async fn update_author(
        &self,
        id: AuthorId,
        changes: &AuthorChanges,
    ) -> Result<AuthorEntry, DbError> {
        changes.validate()?;
        let mut tx = self.pool.begin().await?;

        let mut author: Author = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors AS a WHERE a.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::author_not_found(id))?
        .into();
        changes.apply_to(&mut author);

        sqlx::query(
            r#"
            UPDATE authors
            SET first_name = $2, last_name = $3, birth_date = $4, nationality = $5,
                biography = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&author.first_name)
        .bind(&author.last_name)
        .bind(author.birth_date)
        .bind(&author.nationality)
        .bind(&author.biography)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::debug!(author_id = id, "Updated author");
        self.get_author(id).await
    }

    async fn delete_author(&self, id: AuthorId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::author_not_found(id));
        }
        tracing::debug!(author_id = id, "Deleted author");
        Ok(())
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<BookEntry>, DbError> {
        let search = search_term(filter.search.as_deref()).map(like_pattern);

        let order_by = filter
            .ordering
            .map_or_else(|| "b.title, b.id".to_string(), |order| order.order_by());
        let sql = format!(
            concat!(
                "SELECT ",
                book_columns!(),
                " FROM books AS b",
                " WHERE ($1::TEXT IS NULL OR b.language = $1)",
                " AND ($2::BIGINT IS NULL OR EXISTS (",
                "SELECT 1 FROM book_authors AS f WHERE f.book_id = b.id AND f.author_id = $2))",
                " AND ($3::TEXT IS NULL OR b.title ILIKE $3 OR b.description ILIKE $3)",
                " ORDER BY {}"
            ),
            order_by
        );

        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .bind(filter.language.map(|l| l.code()))
            .bind(filter.author_id)
            .bind(search)
            .fetch_all(&self.pool)
            .await?;

        self.book_entries(into_books(rows)?).await
    }

    async fn get_book(&self, id: BookId) -> Result<BookEntry, DbError> {
        let row = sqlx::query_as::<_, BookRow>(concat!(
            "SELECT ",
            book_columns!(),
            " FROM books AS b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::book_not_found(id))?;

        let mut entries = self.book_entries(vec![row.try_into()?]).await?;
        entries.pop().ok_or_else(|| DbError::book_not_found(id))
    }

    async fn create_book(&self, book: &NewBook) -> Result<BookEntry, DbError> {
        book.validate()?;
        let page_count = page_count_column(book.page_count)?;
        let mut tx = self.pool.begin().await?;
        ensure_authors_exist(&mut tx, &book.authors_ids).await?;

        let id: BookId = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, publication_date, description, page_count, language)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(book.publication_date)
        .bind(&book.description)
        .bind(page_count)
        .bind(book.language.code())
        .fetch_one(&mut *tx)
        .await?;

        link_authors(&mut tx, id, &book.authors_ids).await?;
        tx.commit().await?;

        tracing::debug!(book_id = id, authors = book.authors_ids.len(), "Created book");
        self.get_book(id).await
    }

    async fn update_book(&self, id: BookId, changes: &BookChanges) -> Result<BookEntry, DbError> {
        changes.validate()?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(concat!(
            "SELECT ",
            book_columns!(),
            " FROM books AS b WHERE b.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::book_not_found(id))?;
        let mut book = Book::try_from(row)?;
        changes.apply_to(&mut book);

        sqlx::query(
            r#"
            UPDATE books
            SET title = $2, publication_date = $3, description = $4, page_count = $5,
                language = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(book.publication_date)
        .bind(&book.description)
        .bind(page_count_column(book.page_count)?)
        .bind(book.language.code())
        .execute(&mut *tx)
        .await?;

        if let Some(ids) = &changes.authors_ids {
            ensure_authors_exist(&mut tx, ids).await?;
            link_authors(&mut tx, id, ids).await?;
        }
        tx.commit().await?;

        tracing::debug!(book_id = id, "Updated book");
        self.get_book(id).await
    }

    async fn delete_book(&self, id: BookId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::book_not_found(id));
        }
        tracing::debug!(book_id = id, "Deleted book");
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<CatalogSnapshot, DbError> {
        let mut tx = begin_snapshot(&self.pool).await?;

        let authors = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors AS a ORDER BY a.id"
        ))
        .fetch_all(&mut *tx)
        .await?;
        let books = sqlx::query_as::<_, BookRow>(concat!(
            "SELECT ",
            book_columns!(),
            " FROM books AS b ORDER BY b.id"
        ))
        .fetch_all(&mut *tx)
        .await?;
        let edges = sqlx::query_as::<_, (i64, i64)>("SELECT author_id, book_id FROM book_authors")
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(
            authors = authors.len(),
            books = books.len(),
            authorships = edges.len(),
            "Loaded catalog snapshot"
        );
        Ok(CatalogSnapshot::new(
            authors.into_iter().map(Author::from).collect(),
            into_books(books)?,
            edges
                .into_iter()
                .map(|(author_id, book_id)| Authorship { author_id, book_id }),
        ))
    }

    async fn load_author_snapshot(&self, id: AuthorId) -> Result<CatalogSnapshot, DbError> {
        let mut tx = begin_snapshot(&self.pool).await?;

        let author = sqlx::query_as::<_, AuthorRow>(concat!(
            "SELECT ",
            author_columns!(),
            " FROM authors AS a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(author) = author else {
            tx.commit().await?;
            return Ok(CatalogSnapshot::new(
                Vec::new(),
                Vec::new(),
                Vec::<Authorship>::new(),
            ));
        };

        let books = sqlx::query_as::<_, BookRow>(concat!(
            "SELECT ",
            book_columns!(),
            " FROM books AS b JOIN book_authors AS ba ON ba.book_id = b.id",
            " WHERE ba.author_id = $1 ORDER BY b.id"
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let books = into_books(books)?;
        let edges: Vec<Authorship> = books
            .iter()
            .map(|book| Authorship {
                author_id: id,
                book_id: book.id,
            })
            .collect();
        Ok(CatalogSnapshot::new(vec![author.into()], books, edges))
    }
}
