//! # Catalog Web Server
//!
//! The JSON HTTP API over the catalog: CRUD for authors and books plus the
//! statistics and trends reports.
//!
//! ## Public API
//!
//! - `AppState`: the storage backend and the report assembler shared by all handlers.
//! - `build_router`: every route with its middleware, ready to serve or to test.
//! - `run_server`: binds the address and serves until Ctrl-C.

use analytics::{ReportAssembler, ReportLimits};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use database::CatalogStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

use error::AppError;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub assembler: ReportAssembler,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, limits: ReportLimits) -> Result<Self, AppError> {
        Ok(Self {
            store,
            assembler: ReportAssembler::new(limits)?,
        })
    }
}

/// Builds the application router with CORS, request tracing and a body limit.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/authors",
            get(handlers::list_authors).post(handlers::create_author),
        )
        .route(
            "/api/authors/:id",
            get(handlers::get_author)
                .put(handlers::replace_author)
                .patch(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route(
            "/api/authors/:id/statistics",
            get(handlers::author_statistics),
        )
        .route(
            "/api/books",
            get(handlers::list_books).post(handlers::create_book),
        )
        .route("/api/books/statistics", get(handlers::book_statistics))
        .route("/api/books/trends", get(handlers::trends))
        .route(
            "/api/books/:id",
            get(handlers::get_book)
                .put(handlers::replace_book)
                .patch(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .with_state(Arc::new(state))
        .layer(cors)
        // This middleware will automatically log information about every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024)) // Set a 1MB body limit
}

/// The main function to configure and run the web server.
///
/// Tracing is expected to be initialized by the caller.
pub async fn run_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
