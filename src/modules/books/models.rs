use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A persisted book. Values handed out by the service are detached copies of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    /// Store-assigned identifier, never reused
    pub id: i64,
    /// Unique across all books
    pub title: String,
    pub description: Option<String>,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book payload as received from a client.
///
/// Every field is optional so that presence is decided by validation rather
/// than by deserialization. `description` distinguishes an absent key (`None`)
/// from an explicit `null` (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub author: Option<String>,
}

impl BookInput {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
            author: Some(author.into()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Validated field set for a new row or a full overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub description: Option<String>,
    pub author: String,
}

/// Validated subset of fields to overwrite on a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub author: Option<String>,
}

impl BookPatch {
    /// Overlay the patch on an existing book, yielding the full field set to store.
    pub fn apply_to(self, current: &Book) -> NewBook {
        NewBook {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            description: match self.description {
                Some(description) => description,
                None => current.description.clone(),
            },
            author: self.author.unwrap_or_else(|| current.author.clone()),
        }
    }
}

/// One row of the books-per-author aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthorBookCount {
    pub author: String,
    pub book_count: i64,
}
