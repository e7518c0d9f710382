use crate::enums::Language;
use crate::error::CoreError;
use crate::format;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type AuthorId = i64;
pub type BookId = i64;

const MAX_NAME_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 250;
// Page counts are stored in a signed 32-bit column.
const MAX_PAGE_COUNT: u32 = i32::MAX as u32;

/// A person credited on one or more books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: String,
    pub biography: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    pub fn full_name(&self) -> String {
        format::full_name(&self.first_name, &self.last_name)
    }
}

/// A catalogued book. Its authors live in the [`Authorship`] relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub publication_date: Option<NaiveDate>,
    pub description: String,
    pub page_count: Option<u32>,
    pub language: Language,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One edge of the many-to-many relation between authors and books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authorship {
    pub author_id: AuthorId,
    pub book_id: BookId,
}

/// The payload for creating (or fully replacing) an author.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub biography: String,
}

impl NewAuthor {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_name("first_name", &self.first_name)?;
        validate_name("last_name", &self.last_name)?;
        validate_max_chars("nationality", &self.nationality, MAX_NAME_CHARS)
    }
}

/// A partial update of an author. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorChanges {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
}

impl AuthorChanges {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(first_name) = &self.first_name {
            validate_name("first_name", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            validate_name("last_name", last_name)?;
        }
        if let Some(nationality) = &self.nationality {
            validate_max_chars("nationality", nationality, MAX_NAME_CHARS)?;
        }
        Ok(())
    }

    /// Writes the changed fields onto `author`. Timestamps are left to the store.
    pub fn apply_to(&self, author: &mut Author) {
        if let Some(first_name) = &self.first_name {
            author.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            author.last_name = last_name.clone();
        }
        if let Some(birth_date) = self.birth_date {
            author.birth_date = birth_date;
        }
        if let Some(nationality) = &self.nationality {
            author.nationality = nationality.clone();
        }
        if let Some(biography) = &self.biography {
            author.biography = biography.clone();
        }
    }
}

impl From<NewAuthor> for AuthorChanges {
    fn from(author: NewAuthor) -> Self {
        Self {
            first_name: Some(author.first_name),
            last_name: Some(author.last_name),
            birth_date: Some(author.birth_date),
            nationality: Some(author.nationality),
            biography: Some(author.biography),
        }
    }
}

/// The payload for creating (or fully replacing) a book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub authors_ids: Vec<AuthorId>,
}

impl NewBook {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_title(&self.title)?;
        validate_page_count(self.page_count)
    }
}

/// A partial update of a book. `authors_ids`, when present, replaces the
/// whole set of authors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub publication_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub page_count: Option<Option<u32>>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub authors_ids: Option<Vec<AuthorId>>,
}

impl BookChanges {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(page_count) = self.page_count {
            validate_page_count(page_count)?;
        }
        Ok(())
    }

    /// Writes the changed scalar fields onto `book`. Authors are handled by the store.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(title) = &self.title {
            book.title = title.clone();
        }
        if let Some(publication_date) = self.publication_date {
            book.publication_date = publication_date;
        }
        if let Some(description) = &self.description {
            book.description = description.clone();
        }
        if let Some(page_count) = self.page_count {
            book.page_count = page_count;
        }
        if let Some(language) = self.language {
            book.language = language;
        }
    }
}

impl From<NewBook> for BookChanges {
    fn from(book: NewBook) -> Self {
        Self {
            title: Some(book.title),
            publication_date: Some(book.publication_date),
            description: Some(book.description),
            page_count: Some(book.page_count),
            language: Some(book.language),
            authors_ids: Some(book.authors_ids),
        }
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing field (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_name(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid(field, "must not be blank"));
    }
    validate_max_chars(field, value, MAX_NAME_CHARS)
}

fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::invalid("title", "must not be blank"));
    }
    validate_max_chars("title", title, MAX_TITLE_CHARS)
}

fn validate_max_chars(field: &str, value: &str, max: usize) -> Result<(), CoreError> {
    let chars = value.chars().count();
    if chars > max {
        return Err(CoreError::invalid(
            field,
            format!("must be at most {max} characters (got {chars})"),
        ));
    }
    Ok(())
}

fn validate_page_count(page_count: Option<u32>) -> Result<(), CoreError> {
    match page_count {
        Some(pages) if pages > MAX_PAGE_COUNT => Err(CoreError::invalid(
            "page_count",
            format!("must be at most {MAX_PAGE_COUNT}"),
        )),
        _ => Ok(()),
    }
}
