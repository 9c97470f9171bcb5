pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validation;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_db::Database;
use bookshelf_kernel::{InitCtx, Module, SchemaDefinition};
use serde_json::json;

pub use error::BookError;
pub use service::BookService;

/// Book catalogue: CRUD over the `books` table plus bulk import and the
/// books-per-author report.
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(db: Database) -> Self {
        Self {
            service: BookService::new(db),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    fn schemas(&self) -> Vec<SchemaDefinition> {
        vec![store::SCHEMA]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.service.database().ping().await?;
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn book_body() -> serde_json::Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    })
}

fn id_param() -> serde_json::Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book = json!({ "$ref": "#/components/schemas/Book" });
    let books = json!({ "type": "array", "items": book });

    let collection = json!({
        "post": {
            "summary": "Create a book",
            "tags": ["Books"],
            "requestBody": book_body(),
            "responses": {
                "201": json_response("Book created", book.clone()),
                "400": error_response("A book with this title already exists"),
                "422": error_response("Validation error")
            }
        },
        "get": {
            "summary": "List books",
            "tags": ["Books"],
            "parameters": [
                { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                { "name": "page_size", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 } },
                { "name": "author", "in": "query", "schema": { "type": "string" } }
            ],
            "responses": {
                "200": json_response("One page of books", json!({ "$ref": "#/components/schemas/BookPage" })),
                "422": error_response("Invalid paging parameters")
            }
        }
    });

    let bulk = json!({
        "post": {
            "summary": "Create several books in one transaction",
            "tags": ["Books"],
            "requestBody": {
                "required": true,
                "content": {
                    "application/json": {
                        "schema": { "type": "array", "items": { "$ref": "#/components/schemas/BookInput" } }
                    }
                }
            },
            "responses": {
                "201": json_response("Books created", books.clone()),
                "400": error_response("A title already exists; nothing was created"),
                "422": error_response("Validation error")
            }
        }
    });

    let item = json!({
        "get": {
            "summary": "Get a book",
            "tags": ["Books"],
            "parameters": [id_param()],
            "responses": {
                "200": json_response("The book", book.clone()),
                "404": error_response("Book not found")
            }
        },
        "put": {
            "summary": "Replace a book",
            "tags": ["Books"],
            "parameters": [id_param()],
            "requestBody": book_body(),
            "responses": {
                "200": json_response("Book updated", book.clone()),
                "400": error_response("A book with this title already exists"),
                "404": error_response("Book not found"),
                "422": error_response("Validation error")
            }
        },
        "patch": {
            "summary": "Update some fields of a book",
            "tags": ["Books"],
            "parameters": [id_param()],
            "requestBody": book_body(),
            "responses": {
                "200": json_response("Book updated", book),
                "400": error_response("A book with this title already exists"),
                "404": error_response("Book not found"),
                "422": error_response("Validation error")
            }
        },
        "delete": {
            "summary": "Delete a book",
            "tags": ["Books"],
            "parameters": [id_param()],
            "responses": {
                "204": { "description": "Book deleted" },
                "404": error_response("Book not found")
            }
        }
    });

    let authors = json!({
        "get": {
            "summary": "Count books per author",
            "tags": ["Books"],
            "parameters": [
                { "name": "min_books", "in": "query", "schema": { "type": "integer", "default": 1 } }
            ],
            "responses": {
                "200": json_response(
                    "Authors ordered by book count, then name",
                    json!({ "type": "array", "items": { "$ref": "#/components/schemas/AuthorBookCount" } })
                )
            }
        }
    });

    let schemas = json!({
        "Book": {
            "type": "object",
            "properties": {
                "id": { "type": "integer", "format": "int64" },
                "title": { "type": "string", "maxLength": 200 },
                "description": { "type": ["string", "null"], "maxLength": 1000 },
                "author": { "type": "string", "maxLength": 100 },
                "created_at": { "type": "string", "format": "date-time" },
                "updated_at": { "type": "string", "format": "date-time" }
            },
            "required": ["id", "title", "description", "author", "created_at", "updated_at"]
        },
        "BookInput": {
            "type": "object",
            "properties": {
                "title": { "type": "string", "minLength": 1, "maxLength": 200 },
                "description": { "type": ["string", "null"], "maxLength": 1000 },
                "author": { "type": "string", "minLength": 1, "maxLength": 100 }
            }
        },
        "BookPage": {
            "type": "object",
            "properties": {
                "items": books,
                "total": { "type": "integer" },
                "page": { "type": "integer" },
                "page_size": { "type": "integer" },
                "total_pages": { "type": "integer" }
            },
            "required": ["items", "total", "page", "page_size", "total_pages"]
        },
        "AuthorBookCount": {
            "type": "object",
            "properties": {
                "author": { "type": "string" },
                "book_count": { "type": "integer" }
            },
            "required": ["author", "book_count"]
        }
    });

    json!({
        "paths": {
            "/items/": collection,
            "/items/bulk": bulk,
            "/items/{id}": item,
            "/authors": authors
        },
        "components": { "schemas": schemas }
    })
}

/// Create the books module backed by `db`
pub fn create_module(db: Database) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(db))
}
