use analytics::ReportLimits;
use anyhow::Context;
use database::DbRepository;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use web_server::AppState;

// This main function is the entry point when running `cargo run -p web-server`.
// It serves the PostgreSQL-backed catalog with settings from `config.toml`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = configuration::load_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    FmtSubscriber::builder().with_env_filter(filter).init();

    let pool = database::connect(&config.database)
        .await
        .context("connecting to the catalog database")?;
    database::run_migrations(&pool)
        .await
        .context("applying database migrations")?;

    let limits: ReportLimits = config.reports;
    let state = AppState::new(Arc::new(DbRepository::new(pool)), limits)?;
    web_server::run_server(config.server.socket_addr()?, state).await
}
