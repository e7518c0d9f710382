use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL comes from `settings.url` when set, otherwise from `DATABASE_URL`
/// (a `.env` file is read if present).
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    let database_url = database_url(settings)?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(&database_url)
        .await?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to the catalog database"
    );
    Ok(pool)
}

fn database_url(settings: &DatabaseSettings) -> Result<String, DbError> {
    if let Some(url) = &settings.url {
        return Ok(url.clone());
    }

    // A missing .env file is fine; the variable may already be in the environment.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "No .env file loaded");
    }

    env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))
}

/// Applies the embedded migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations are up to date");
    Ok(())
}
