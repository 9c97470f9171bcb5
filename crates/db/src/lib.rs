//! SQLite connection pool, schema bootstrap and shared store helpers.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use bookshelf_kernel::settings::DatabaseSettings;
use bookshelf_kernel::SchemaDefinition;

pub mod pagination;

/// Database wrapper providing connection pool access
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a connection pool described by the settings.
    ///
    /// In-memory URLs are pinned to a single long-lived connection, otherwise
    /// every pooled connection would see its own empty database.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .with_context(|| format!("invalid database url '{}'", settings.url))?
            .create_if_missing(settings.create_if_missing)
            .foreign_keys(true);

        let pool_options = if is_in_memory(&settings.url) {
            single_connection_pool()
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("failed to connect to '{}'", settings.url))?;

        tracing::info!(
            target: "bookshelf-db",
            url = %settings.url,
            max_connections = settings.max_connections,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests and one-off tooling.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .with_context(|| "invalid in-memory database url")?
            .foreign_keys(true);
        let pool = single_connection_pool()
            .connect_with(options)
            .await
            .with_context(|| "failed to open in-memory database")?;
        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .with_context(|| "database ping failed")?;
        Ok(())
    }

    /// Apply module schema definitions in order.
    pub async fn apply_schemas(&self, schemas: &[(String, SchemaDefinition)]) -> anyhow::Result<()> {
        for (module, schema) in schemas {
            tracing::info!(
                target: "bookshelf-db",
                module = %module,
                schema = schema.id,
                "applying schema"
            );
            sqlx::raw_sql(schema.ddl)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to apply schema '{}/{}'", module, schema.id))?;
        }
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn single_connection_pool() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Whether the error is the store rejecting a write on a unique constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: SchemaDefinition = SchemaDefinition {
        id: "001_widgets",
        ddl: r#"
            CREATE TABLE IF NOT EXISTS widgets (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                CONSTRAINT uq_widget_name UNIQUE (name)
            );
            CREATE INDEX IF NOT EXISTS ix_widgets_name ON widgets (name);
        "#,
    };

    #[test]
    fn detects_in_memory_urls() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file.db?mode=memory"));
        assert!(!is_in_memory("sqlite://bookshelf.db"));
    }

    #[tokio::test]
    async fn schemas_apply_idempotently() {
        let db = Database::in_memory().await.unwrap();
        let schemas = vec![("widgets".to_string(), SCHEMA)];

        db.apply_schemas(&schemas).await.unwrap();
        db.apply_schemas(&schemas).await.unwrap();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn classifies_unique_violations() {
        let db = Database::in_memory().await.unwrap();
        db.apply_schemas(&[("widgets".to_string(), SCHEMA)])
            .await
            .unwrap();

        sqlx::query("INSERT INTO widgets (name) VALUES (?)")
            .bind("gear")
            .execute(db.pool())
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO widgets (name) VALUES (?)")
            .bind("gear")
            .execute(db.pool())
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        let err = sqlx::query("SELECT * FROM missing_table")
            .execute(db.pool())
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }

    #[tokio::test]
    async fn in_memory_url_shares_one_database() {
        let settings = DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
            create_if_missing: true,
        };
        let db = Database::connect(&settings).await.unwrap();
        db.apply_schemas(&[("widgets".to_string(), SCHEMA)])
            .await
            .unwrap();

        for name in ["a", "b", "c"] {
            sqlx::query("INSERT INTO widgets (name) VALUES (?)")
                .bind(name)
                .execute(db.pool())
                .await
                .unwrap();
        }
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM widgets")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 3);
    }
}
