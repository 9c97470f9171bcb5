//! Application bootstrap shared by the server binary and the CLI.

use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::settings::Settings;
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;

/// Register every module, apply their schemas and start them.
pub async fn bootstrap(db: &Database, settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, db);

    let ctx = InitCtx { settings };
    registry.init_modules(&ctx).await?;
    db.apply_schemas(&registry.collect_schemas())
        .await
        .context("failed to apply module schemas")?;
    registry.start_modules(&ctx).await?;

    tracing::info!(modules = registry.len(), "bookshelf bootstrap complete");
    Ok(registry)
}

/// Connect, bootstrap and serve HTTP until a shutdown signal arrives.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookshelf-app starting"
    );

    let db = Database::connect(&settings.database).await?;
    let registry = bootstrap(&db, &settings).await?;

    let served = bookshelf_http::start_server(
        &registry,
        &settings,
        bookshelf_http::shutdown_signal(),
    )
    .await;

    let stopped = registry.stop_modules().await;
    db.close().await;

    served?;
    stopped
}
