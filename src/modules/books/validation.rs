//! Field constraints shared by create, update and bulk import.
//!
//! Title and author are trimmed before their length is checked and are stored
//! trimmed. Lengths count Unicode scalar values, not bytes.

use serde::Serialize;
use thiserror::Error;

use super::models::{BookInput, BookPatch, NewBook};

pub const TITLE_MAX_CHARS: usize = 200;
pub const AUTHOR_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// Every field that failed validation, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fields: {}", field_names(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Qualify every field name, e.g. `title` becomes `items[3].title`.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self {
            fields: self
                .fields
                .into_iter()
                .map(|field| FieldError {
                    field: format!("{}.{}", prefix, field.field),
                    error: field.error,
                })
                .collect(),
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.field == name)
    }
}

fn field_names(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|field| field.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, field: &str, error: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            error: error.into(),
        });
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationError> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(ValidationError { fields: self.0 })
        }
    }

    fn required(&mut self, field: &str, value: Option<String>, max: usize) -> Option<String> {
        match value {
            Some(value) => self.text(field, &value, max),
            None => {
                self.push(field, "field required");
                None
            }
        }
    }

    fn text(&mut self, field: &str, value: &str, max: usize) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, "must not be empty");
            return None;
        }
        self.within(field, trimmed, max).then(|| trimmed.to_string())
    }

    fn within(&mut self, field: &str, value: &str, max: usize) -> bool {
        let chars = value.chars().count();
        if chars > max {
            self.push(
                field,
                format!("must be at most {} characters, got {}", max, chars),
            );
            return false;
        }
        true
    }

    fn description(&mut self, value: Option<String>) -> Option<String> {
        value.filter(|description| self.within("description", description, DESCRIPTION_MAX_CHARS))
    }
}

/// Validate a complete field set: title and author are required, an omitted
/// description is stored as null.
pub fn validate_new(input: BookInput) -> Result<NewBook, ValidationError> {
    let mut errors = Errors::default();

    let title = errors.required("title", input.title, TITLE_MAX_CHARS);
    let description = errors.description(input.description.flatten());
    let author = errors.required("author", input.author, AUTHOR_MAX_CHARS);

    errors.finish(|| NewBook {
        title: title.unwrap_or_default(),
        description,
        author: author.unwrap_or_default(),
    })
}

/// Validate only the fields present in the payload.
pub fn validate_patch(input: BookInput) -> Result<BookPatch, ValidationError> {
    let mut errors = Errors::default();

    let title = input
        .title
        .and_then(|title| errors.text("title", &title, TITLE_MAX_CHARS));
    let description = input
        .description
        .map(|description| errors.description(description));
    let author = input
        .author
        .and_then(|author| errors.text("author", &author, AUTHOR_MAX_CHARS));

    errors.finish(|| BookPatch {
        title,
        description,
        author,
    })
}
