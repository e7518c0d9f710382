use crate::{AppState, error::AppError};
use analytics::{AuthorDetail, AuthorStatisticsReport, BookStatisticsReport, TrendsReport};
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use core_types::{AuthorChanges, AuthorId, BookChanges, BookId, NewAuthor, NewBook};
use database::{AuthorEntry, AuthorFilter, BookEntry, BookFilter};
use serde::Deserialize;
use std::sync::Arc;

/// `axum::Json` with rejections rendered as our JSON error body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with rejections rendered as our JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` with rejections rendered as our JSON error body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    /// The day the emerging-author window ends on. Defaults to today (UTC).
    pub as_of: Option<NaiveDate>,
}

// --- Authors ---

/// # GET /api/authors
pub async fn list_authors(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<AuthorFilter>,
) -> Result<Json<Vec<AuthorEntry>>, AppError> {
    let authors = state.store.list_authors(&filter).await?;
    Ok(Json(authors))
}

/// # POST /api/authors
pub async fn create_author(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<NewAuthor>,
) -> Result<(StatusCode, Json<AuthorEntry>), AppError> {
    let author = state.store.create_author(&payload).await?;
    tracing::info!(author_id = author.author.id, "Author created");
    Ok((StatusCode::CREATED, Json(author)))
}

/// # GET /api/authors/:id
/// The author with their first books, ordered by title.
pub async fn get_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<AuthorId>,
) -> Result<Json<AuthorDetail>, AppError> {
    let snapshot = state.store.load_author_snapshot(id).await?;
    let detail = state.assembler.author_detail(&snapshot, id)?;
    Ok(Json(detail))
}

/// # PUT /api/authors/:id
pub async fn replace_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<AuthorId>,
    ApiJson(payload): ApiJson<NewAuthor>,
) -> Result<Json<AuthorEntry>, AppError> {
    let author = state
        .store
        .update_author(id, &AuthorChanges::from(payload))
        .await?;
    Ok(Json(author))
}

/// # PATCH /api/authors/:id
pub async fn update_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<AuthorId>,
    ApiJson(changes): ApiJson<AuthorChanges>,
) -> Result<Json<AuthorEntry>, AppError> {
    let author = state.store.update_author(id, &changes).await?;
    Ok(Json(author))
}

/// # DELETE /api/authors/:id
pub async fn delete_author(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<AuthorId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_author(id).await?;
    tracing::info!(author_id = id, "Author deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// # GET /api/authors/:id/statistics
pub async fn author_statistics(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<AuthorId>,
) -> Result<Json<AuthorStatisticsReport>, AppError> {
    let snapshot = state.store.load_author_snapshot(id).await?;
    let report = state.assembler.author_statistics(&snapshot, id)?;
    Ok(Json(report))
}

// --- Books ---

/// # GET /api/books
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    ApiQuery(filter): ApiQuery<BookFilter>,
) -> Result<Json<Vec<BookEntry>>, AppError> {
    let books = state.store.list_books(&filter).await?;
    Ok(Json(books))
}

/// # POST /api/books
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<NewBook>,
) -> Result<(StatusCode, Json<BookEntry>), AppError> {
    let book = state.store.create_book(&payload).await?;
    tracing::info!(book_id = book.book.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// # GET /api/books/:id
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Json<BookEntry>, AppError> {
    let book = state.store.get_book(id).await?;
    Ok(Json(book))
}

/// # PUT /api/books/:id
/// Replaces every field, including the author list.
pub async fn replace_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(payload): ApiJson<NewBook>,
) -> Result<Json<BookEntry>, AppError> {
    let book = state
        .store
        .update_book(id, &BookChanges::from(payload))
        .await?;
    Ok(Json(book))
}

/// # PATCH /api/books/:id
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(changes): ApiJson<BookChanges>,
) -> Result<Json<BookEntry>, AppError> {
    let book = state.store.update_book(id, &changes).await?;
    Ok(Json(book))
}

/// # DELETE /api/books/:id
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<StatusCode, AppError> {
    state.store.delete_book(id).await?;
    tracing::info!(book_id = id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- Reports ---

/// # GET /api/books/statistics
pub async fn book_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BookStatisticsReport>, AppError> {
    let snapshot = state.store.load_snapshot().await?;
    Ok(Json(state.assembler.book_statistics(&snapshot)))
}

/// # GET /api/books/trends
pub async fn trends(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<TrendsParams>,
) -> Result<Json<TrendsReport>, AppError> {
    let today = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let snapshot = state.store.load_snapshot().await?;
    let report = state.assembler.trends(&snapshot, today)?;
    Ok(Json(report))
}
