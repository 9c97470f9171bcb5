use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use bookshelf_app::app;
use bookshelf_app::modules::books::models::BookInput;
use bookshelf_app::{BookError, BookService};
use bookshelf_db::Database;
use bookshelf_kernel::settings::Settings;

/// Operate the bookshelf service and its catalogue
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until interrupted
    Serve,
    /// Print the number of books per author as JSON
    Authors {
        /// Only list authors with at least this many books
        #[arg(long, default_value_t = 1)]
        min_books: i64,
    },
    /// Create every book in a JSON array file, all or nothing
    Import {
        /// Path to a JSON array of `{title, author, description?}` objects
        file: PathBuf,
    },
    /// Print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => app::run(settings).await,
        Command::Authors { min_books } => {
            with_service(&settings, |service| async move {
                let counts = service.authors_with_book_count(min_books).await?;
                println!("{}", serde_json::to_string_pretty(&counts)?);
                Ok(())
            })
            .await
        }
        Command::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let inputs: Vec<BookInput> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of books", file.display()))?;

            with_service(&settings, |service| async move {
                let created = service.bulk_create(inputs).await?;
                tracing::info!(count = created.len(), file = %file.display(), "import finished");
                println!("{}", json!({ "imported": created.len() }));
                Ok(())
            })
            .await
        }
        Command::CheckConfig => {
            let summary = json!({
                "environment": format!("{:?}", settings.environment).to_lowercase(),
                "server": {
                    "host": settings.server.host,
                    "port": settings.server.port,
                    "request_timeout_ms": settings.server.request_timeout_ms,
                    "api_prefix": settings.server.api_prefix,
                },
                "database": {
                    "url": settings.database.url,
                    "max_connections": settings.database.max_connections,
                    "create_if_missing": settings.database.create_if_missing,
                },
                "telemetry": {
                    "log_format": format!("{:?}", settings.telemetry.log_format).to_lowercase(),
                    "filter": settings.telemetry.filter,
                },
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

/// Run one command against a bootstrapped store, then shut it down cleanly.
async fn with_service<F, Fut>(settings: &Settings, command: F) -> anyhow::Result<()>
where
    F: FnOnce(BookService) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let db = Database::connect(&settings.database).await?;
    let registry = app::bootstrap(&db, settings).await?;

    let result = command(BookService::new(db.clone())).await;
    if let Some(err) = result.as_ref().err().and_then(|e| e.downcast_ref::<BookError>()) {
        tracing::error!(kind = err.kind(), error = %err, "command failed");
    }

    registry.stop_modules().await?;
    db.close().await;
    result
}
