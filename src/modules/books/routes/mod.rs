//! HTTP handlers for the books module.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use bookshelf_db::pagination::{Page, DEFAULT_PAGE_SIZE};
use bookshelf_http::error::AppError;

use super::models::{AuthorBookCount, Book, BookInput};
use super::service::BookService;

/// Query string accepted by the list endpoint
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorParams {
    pub min_books: Option<i64>,
}

type ApiResult<T> = Result<T, AppError>;

pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/items", post(create_book).get(list_books))
        .route("/items/", post(create_book).get(list_books))
        .route("/items/bulk", post(bulk_create_books))
        .route(
            "/items/{id}",
            get(get_book)
                .put(update_book)
                .patch(patch_book)
                .delete(delete_book),
        )
        .route("/authors", get(authors_with_book_count))
        .with_state(service)
}

async fn create_book(
    State(service): State<BookService>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let Json(input) = payload?;
    let book = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(service): State<BookService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Page<Book>>> {
    let Query(params) = params?;
    let page = service
        .list(
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(i64::from(DEFAULT_PAGE_SIZE)),
            params.author.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

async fn get_book(
    State(service): State<BookService>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Book>> {
    let Path(id) = id?;
    Ok(Json(service.get_by_id(id).await?))
}

async fn update_book(
    State(service): State<BookService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<Json<Book>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(service.full_update(id, input).await?))
}

async fn patch_book(
    State(service): State<BookService>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> ApiResult<Json<Book>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(service.partial_update(id, input).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn bulk_create_books(
    State(service): State<BookService>,
    payload: Result<Json<Vec<BookInput>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<Book>>)> {
    let Json(inputs) = payload?;
    let books = service.bulk_create(inputs).await?;
    Ok((StatusCode::CREATED, Json(books)))
}

async fn authors_with_book_count(
    State(service): State<BookService>,
    params: Result<Query<AuthorParams>, QueryRejection>,
) -> ApiResult<Json<Vec<AuthorBookCount>>> {
    let Query(params) = params?;
    let counts = service
        .authors_with_book_count(params.min_books.unwrap_or(1))
        .await?;
    Ok(Json(counts))
}
