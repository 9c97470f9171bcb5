use bookshelf_db::pagination::PageError;
use bookshelf_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::validation::ValidationError;

/// Failures reported by the book service.
#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Book with id {0} not found")]
    NotFound(i64),

    #[error("Book with title '{title}' already exists")]
    Conflict { title: String },

    #[error(transparent)]
    InvalidArgument(#[from] PageError),

    #[error("storage failure during {operation}")]
    Storage {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl BookError {
    pub(crate) fn storage(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Storage { operation, source }
    }

    /// Short, stable classification attached to log events.
    pub fn kind(&self) -> &'static str {
        match self {
            BookError::Validation(_) => "validation",
            BookError::NotFound(_) => "not_found",
            BookError::Conflict { .. } => "already_exists",
            BookError::InvalidArgument(_) => "invalid_argument",
            BookError::Storage { .. } => "storage",
        }
    }
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation(validation) => {
                let message = validation.to_string();
                let details = validation
                    .fields
                    .into_iter()
                    .map(|field| json!({ "field": field.field, "error": field.error }))
                    .collect();
                AppError::validation(details, message)
            }
            BookError::NotFound(_) => AppError::not_found(err.to_string()),
            BookError::Conflict { ref title } => AppError::conflict(
                vec![json!({ "field": "title", "error": format!("'{}' is already taken", title) })],
                err.to_string(),
            ),
            BookError::InvalidArgument(page) => AppError::invalid_field(page.field(), page.to_string()),
            BookError::Storage { .. } => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}
