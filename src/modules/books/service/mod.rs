//! Book service: validation, transactions and error classification on top of
//! the raw store functions.

mod mutations;
mod queries;

use chrono::{DateTime, Duration, Utc};
use sqlx::{Sqlite, Transaction};

use bookshelf_db::{is_unique_violation, Database};

use super::error::BookError;

/// Entry point for every book operation. Cheap to clone.
#[derive(Clone, Debug)]
pub struct BookService {
    db: Database,
}

impl BookService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, BookError> {
        self.db
            .pool()
            .begin()
            .await
            .map_err(BookError::storage("begin transaction"))
    }
}

/// Commit on success, roll back on failure. The original error wins over a
/// failed rollback.
async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: Result<T, BookError>,
) -> Result<T, BookError> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(BookError::storage("commit"))?;
            Ok(value)
        }
        Err(err) => {
            tracing::debug!(kind = err.kind(), "rolling back transaction");
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

/// Reclassify a failed write: a unique violation means the title is taken.
fn write_error(operation: &'static str, title: &str) -> impl FnOnce(sqlx::Error) -> BookError {
    let title = title.to_string();
    move |err| {
        if is_unique_violation(&err) {
            let err = BookError::Conflict { title };
            tracing::warn!(operation, kind = err.kind(), "{}", err);
            err
        } else {
            tracing::error!(operation, kind = "storage", error = %err, "book write failed");
            BookError::Storage {
                operation,
                source: err,
            }
        }
    }
}

/// `updated_at` for a row last touched at `previous`; always strictly later.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}
