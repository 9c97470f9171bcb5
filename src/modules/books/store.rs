//! SQL for the `books` table.
//!
//! Every function takes a bare connection so callers decide the transaction
//! boundary.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use bookshelf_kernel::SchemaDefinition;

use super::models::{AuthorBookCount, Book, NewBook};

pub const SCHEMA: SchemaDefinition = SchemaDefinition {
    id: "001_books",
    ddl: r#"
        CREATE TABLE IF NOT EXISTS books (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       VARCHAR(200) NOT NULL,
            description VARCHAR(1000),
            author      VARCHAR(100) NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            CONSTRAINT uq_book_title UNIQUE (title)
        );
        CREATE INDEX IF NOT EXISTS ix_books_author ON books (author);
    "#,
};

const COLUMNS: &str = "id, title, description, author, created_at, updated_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    book: &NewBook,
    now: DateTime<Utc>,
) -> Result<Book, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "INSERT INTO books (title, description, author, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    ))
    .bind(&book.title)
    .bind(&book.description)
    .bind(&book.author)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!("SELECT {COLUMNS} FROM books WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Read a row for update.
///
/// The no-op write takes the database write lock up front, so a concurrent
/// writer waits on the busy timeout instead of failing when a read lock would
/// otherwise need upgrading mid-transaction.
pub async fn claim(conn: &mut SqliteConnection, id: i64) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "UPDATE books SET id = id WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Overwrite every mutable column. Returns `None` when the row is gone.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    book: &NewBook,
    updated_at: DateTime<Utc>,
) -> Result<Option<Book>, sqlx::Error> {
    sqlx::query_as::<_, Book>(&format!(
        "UPDATE books SET title = ?, description = ?, author = ?, updated_at = ? \
         WHERE id = ? RETURNING {COLUMNS}"
    ))
    .bind(&book.title)
    .bind(&book.description)
    .bind(&book.author)
    .bind(updated_at)
    .bind(id)
    .fetch_optional(conn)
    .await
}

/// Returns whether a row was removed.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM books WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(conn: &mut SqliteConnection, author: Option<&str>) -> Result<i64, sqlx::Error> {
    let pattern = author.map(like_pattern);
    sqlx::query_scalar::<_, i64>(
        r"SELECT COUNT(*) FROM books WHERE (? IS NULL OR author LIKE ? ESCAPE '\')",
    )
    .bind(&pattern)
    .bind(&pattern)
    .fetch_one(conn)
    .await
}

/// One window of books in ascending id order.
pub async fn page(
    conn: &mut SqliteConnection,
    author: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Book>, sqlx::Error> {
    let pattern = author.map(like_pattern);
    sqlx::query_as::<_, Book>(&format!(
        r"SELECT {COLUMNS} FROM books
          WHERE (? IS NULL OR author LIKE ? ESCAPE '\')
          ORDER BY id
          LIMIT ? OFFSET ?"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await
}

pub async fn author_counts(
    conn: &mut SqliteConnection,
    min_books: i64,
) -> Result<Vec<AuthorBookCount>, sqlx::Error> {
    sqlx::query_as::<_, AuthorBookCount>(
        "SELECT author, COUNT(id) AS book_count FROM books
         GROUP BY author
         HAVING COUNT(id) >= ?
         ORDER BY book_count DESC, author ASC",
    )
    .bind(min_books)
    .fetch_all(conn)
    .await
}

/// Substring pattern for `LIKE`, with the filter's own wildcards matched literally.
///
/// SQLite's `LIKE` folds case for ASCII letters only.
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);
    pattern.push('%');
    for c in filter.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
