use analytics::ReportAssembler;
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use configuration::{Config, LogFormat};
use core_types::{AuthorId, Language};
use database::{BookFilter, BookOrder, CatalogStore, DbRepository, MemoryStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use web_server::AppState;

mod render;
mod telemetry;

/// The entry point for the catalog service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let _log_guard = telemetry::init(&config.logging, cli.log_format)?;

    // Execute the appropriate command
    let result = match cli.command {
        Commands::Serve(args) => handle_serve(&config, args).await,
        Commands::Migrate => handle_migrate(&config).await,
        Commands::Report(args) => handle_report(&config, args).await,
        Commands::Books(args) => handle_books(&config, args).await,
    };
    if let Err(e) = &result {
        tracing::error!(error = ?e, "Command failed");
    }
    result
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A catalog of authors and books with statistics and publication trends.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides `logging.format` from the configuration.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON HTTP API.
    Serve(ServeArgs),
    /// Apply pending database migrations and exit.
    Migrate,
    /// Print one of the catalog reports.
    Report(ReportArgs),
    /// List books with their authors.
    Books(BooksArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Keep the catalog in memory instead of PostgreSQL. Data is lost on exit.
    #[arg(long)]
    in_memory: bool,
}

#[derive(Parser)]
struct ReportArgs {
    #[command(subcommand)]
    kind: ReportKind,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Parser)]
struct BooksArgs {
    /// Language code, e.g. `es`.
    #[arg(long)]
    language: Option<Language>,

    /// Only books credited to this author.
    #[arg(long)]
    author_id: Option<AuthorId>,

    /// Case-insensitive substring of title or description.
    #[arg(long)]
    search: Option<String>,

    /// `title`, `publication_date`, `page_count` or `created_at`; prefix `-` to reverse.
    #[arg(long, allow_hyphen_values = true)]
    ordering: Option<BookOrder>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum ReportKind {
    /// Statistics over the whole catalog.
    BookStatistics,
    /// Publication trends by decade and emerging authors.
    Trends {
        /// The day the emerging-author window ends on (format: YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Statistics over one author's books.
    AuthorStatistics {
        #[arg(long)]
        id: AuthorId,
    },
    /// One author with their books.
    Author {
        #[arg(long)]
        id: AuthorId,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn connect_store(config: &Config) -> anyhow::Result<DbRepository> {
    let pool = database::connect(&config.database)
        .await
        .context("connecting to the catalog database")?;
    database::run_migrations(&pool)
        .await
        .context("applying database migrations")?;
    Ok(DbRepository::new(pool))
}

async fn handle_serve(config: &Config, args: ServeArgs) -> anyhow::Result<()> {
    let mut addr = config.server.socket_addr()?;
    if let Some(port) = args.port {
        addr.set_port(port);
    }

    let store: Arc<dyn CatalogStore> = if args.in_memory {
        tracing::warn!("Serving an in-memory catalog; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(connect_store(config).await?)
    };

    let state = AppState::new(store, config.reports)?;
    web_server::run_server(addr, state).await
}

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    connect_store(config).await?;
    println!("Database migrations applied.");
    Ok(())
}

async fn handle_report(config: &Config, args: ReportArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let assembler = ReportAssembler::new(config.reports)?;

    let output = match args.kind {
        ReportKind::BookStatistics => {
            let snapshot = store.load_snapshot().await?;
            let report = assembler.book_statistics(&snapshot);
            format_output(args.format, &report, render::book_statistics)?
        }
        ReportKind::Trends { as_of } => {
            let today = as_of.unwrap_or_else(|| Utc::now().date_naive());
            let snapshot = store.load_snapshot().await?;
            let report = assembler.trends(&snapshot, today)?;
            format_output(args.format, &report, render::trends)?
        }
        ReportKind::AuthorStatistics { id } => {
            let snapshot = store.load_author_snapshot(id).await?;
            let report = assembler.author_statistics(&snapshot, id)?;
            format_output(args.format, &report, render::author_statistics)?
        }
        ReportKind::Author { id } => {
            let snapshot = store.load_author_snapshot(id).await?;
            let detail = assembler.author_detail(&snapshot, id)?;
            format_output(args.format, &detail, render::author_detail)?
        }
    };

    println!("{output}");
    Ok(())
}

async fn handle_books(config: &Config, args: BooksArgs) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let filter = BookFilter {
        language: args.language,
        author_id: args.author_id,
        search: args.search,
        ordering: args.ordering,
    };
    let books = store.list_books(&filter).await?;

    println!("{}", format_output(args.format, books.as_slice(), render::books)?);
    Ok(())
}

fn format_output<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    table: fn(&T) -> String,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Table => table(value),
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
    })
}
