//! HTTP endpoints for the catalog.
//!
//! Every precondition (existence, duplicate title) is its own lookup before
//! the write it guards; two requests racing on one title can both pass.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use bookstore_http::error::AppError;
use bookstore_kernel::settings::CatalogSettings;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, OpenApi};

use super::models::{rank_by_popularity, Book, BookPayload};
use super::service::CatalogService;
use crate::utils;

#[derive(Clone)]
pub struct BooksState {
    pub catalog: Arc<CatalogService>,
    pub paging: CatalogSettings,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/getEveryBook", get(list_titles))
        .route("/getAllBooks", get(list_all_books))
        .route("/getBookPopularity/{title}", get(get_popularity))
        .route("/getBookByTitle/{title}", get(get_book))
        .route("/addBook", post(add_book))
        .route("/addBooksBulk", post(add_books_bulk))
        .route("/updateBook/{title}", put(update_book))
        .route("/deleteByTitle/{title}", delete(delete_book))
        .route("/bulkDelete", delete(delete_books_bulk))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_titles,
        list_all_books,
        get_popularity,
        get_book,
        add_book,
        add_books_bulk,
        update_book,
        delete_book,
        delete_books_bulk
    ),
    components(schemas(BookPayload)),
    tags((name = "Books", description = "Catalog CRUD keyed by title"))
)]
pub struct BooksApi;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Books per page, capped by configuration
    pub page_size: Option<i64>,
}

/// Titles of one page of books, most popular first.
///
/// The page is cut in storage order and only then sorted, so ranking holds
/// within a page but not across pages.
#[utoipa::path(
    get,
    path = "/getEveryBook",
    tag = "Books",
    params(PageQuery),
    responses(
        (status = 200, description = "Titles ordered by popularity", body = Vec<String>),
        (status = 400, description = "page or pageSize below 1")
    )
)]
async fn list_titles(
    State(state): State<BooksState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<String>>, AppError> {
    let Query(query) = query.map_err(|rejection| {
        AppError::bad_request_with(
            vec![json!({ "query": rejection.body_text() })],
            "invalid paging parameters",
        )
    })?;
    let page = query.page.unwrap_or(i64::from(state.paging.default_page));
    let page_size = query
        .page_size
        .unwrap_or(i64::from(state.paging.default_page_size));

    let mut details = Vec::new();
    if page < 1 {
        details.push(json!({ "field": "page", "error": "must be at least 1" }));
    }
    if page_size < 1 {
        details.push(json!({ "field": "pageSize", "error": "must be at least 1" }));
    }
    if !details.is_empty() {
        return Err(AppError::bad_request_with(
            details,
            "invalid paging parameters",
        ));
    }
    let page_size = page_size.min(i64::from(state.paging.max_page_size));

    let mut books = state
        .catalog
        .list_page(page as u64, page_size as u64)
        .await?;
    rank_by_popularity(&mut books, utils::current_year());

    Ok(Json(books.into_iter().map(|book| book.title).collect()))
}

/// Every stored book, soft-deleted ones included.
#[utoipa::path(
    get,
    path = "/getAllBooks",
    tag = "Books",
    responses((status = 200, description = "All stored books", body = Vec<BookPayload>))
)]
async fn list_all_books(
    State(state): State<BooksState>,
) -> Result<Json<Vec<BookPayload>>, AppError> {
    let books = state.catalog.list_everything().await?;
    Ok(Json(books.into_iter().map(BookPayload::from).collect()))
}

#[utoipa::path(
    get,
    path = "/getBookPopularity/{title}",
    tag = "Books",
    params(("title" = String, Path, description = "Title of the book")),
    responses(
        (status = 200, description = "Popularity score", body = f64),
        (status = 404, description = "No such book, or it was deleted")
    )
)]
async fn get_popularity(
    State(state): State<BooksState>,
    Path(title): Path<String>,
) -> Result<Json<f64>, AppError> {
    let book = find_live(&state, &title).await?;
    Ok(Json(book.popularity()))
}

/// Returns the book and counts the read as a view.
///
/// The body reflects the record as read, before this view is counted.
#[utoipa::path(
    get,
    path = "/getBookByTitle/{title}",
    tag = "Books",
    params(("title" = String, Path, description = "Title of the book")),
    responses(
        (status = 200, description = "The book", body = BookPayload),
        (status = 404, description = "No such book, or it was deleted")
    )
)]
async fn get_book(
    State(state): State<BooksState>,
    Path(title): Path<String>,
) -> Result<Json<BookPayload>, AppError> {
    let book = find_live(&state, &title).await?;
    state.catalog.record_view(&book.title).await?;
    Ok(Json(book.into()))
}

#[utoipa::path(
    post,
    path = "/addBook",
    tag = "Books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = BookPayload),
        (status = 400, description = "Missing body or the title is taken")
    )
)]
async fn add_book(
    State(state): State<BooksState>,
    payload: Result<Json<Option<BookPayload>>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = require_body(payload)?;

    if state.catalog.get_by_title(&payload.title).await?.is_some() {
        return Err(title_taken(&payload.title));
    }

    state.catalog.create(&Book::from(payload.clone())).await?;

    let location = format!("/getBookByTitle/{}", urlencoding::encode(&payload.title));
    let mut response = (StatusCode::CREATED, Json(payload)).into_response();
    if let Ok(location) = HeaderValue::from_str(&location) {
        response.headers_mut().insert(header::LOCATION, location);
    }
    Ok(response)
}

/// Adds each book whose title is new; repeats and taken titles are skipped.
#[utoipa::path(
    post,
    path = "/addBooksBulk",
    tag = "Books",
    request_body = Vec<BookPayload>,
    responses(
        (status = 201, description = "Accepted books were created"),
        (status = 400, description = "Malformed body")
    )
)]
async fn add_books_bulk(
    State(state): State<BooksState>,
    payload: Result<Json<Vec<BookPayload>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(books) = payload?;

    let mut seen = HashSet::new();
    for book in books {
        if !seen.insert(book.title.clone()) {
            continue;
        }
        if state.catalog.get_by_title(&book.title).await?.is_some() {
            tracing::debug!(title = %book.title, "bulk add skipped existing title");
            continue;
        }
        state.catalog.create(&Book::from(book)).await?;
    }

    Ok(StatusCode::CREATED)
}

/// Replaces every field of the book, including its title and view count.
#[utoipa::path(
    put,
    path = "/updateBook/{title}",
    tag = "Books",
    params(("title" = String, Path, description = "Current title of the book")),
    request_body = BookPayload,
    responses(
        (status = 204, description = "Book replaced"),
        (status = 400, description = "Missing body or the new title is taken"),
        (status = 404, description = "No such book, or it was deleted")
    )
)]
async fn update_book(
    State(state): State<BooksState>,
    Path(title): Path<String>,
    payload: Result<Json<Option<BookPayload>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    find_live(&state, &title).await?;
    let replacement = require_body(payload)?;

    if replacement.title != title
        && state
            .catalog
            .get_by_title(&replacement.title)
            .await?
            .is_some()
    {
        return Err(title_taken(&replacement.title));
    }

    state
        .catalog
        .update_by_title(&title, &Book::from(replacement))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft delete: the record stays in storage with `isDeleted` set.
#[utoipa::path(
    delete,
    path = "/deleteByTitle/{title}",
    tag = "Books",
    params(("title" = String, Path, description = "Title of the book")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "No such book, or it was already deleted")
    )
)]
async fn delete_book(
    State(state): State<BooksState>,
    Path(title): Path<String>,
) -> Result<StatusCode, AppError> {
    find_live(&state, &title).await?;
    state.catalog.soft_delete_by_title(&title).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Soft-deletes every listed title that exists; unknown titles are skipped.
#[utoipa::path(
    delete,
    path = "/bulkDelete",
    tag = "Books",
    request_body = Vec<String>,
    responses(
        (status = 204, description = "Existing books deleted"),
        (status = 400, description = "Malformed body")
    )
)]
async fn delete_books_bulk(
    State(state): State<BooksState>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(titles) = payload?;

    for title in titles {
        if state.catalog.get_by_title(&title).await?.is_none() {
            tracing::debug!(%title, "bulk delete skipped missing title");
            continue;
        }
        state.catalog.soft_delete_by_title(&title).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn find_live(state: &BooksState, title: &str) -> Result<Book, AppError> {
    state
        .catalog
        .get_by_title(title)
        .await?
        .ok_or_else(|| AppError::not_found(format!("book '{}' not found", title)))
}

/// A body that is absent, malformed, or JSON `null` is a bad request.
fn require_body(
    payload: Result<Json<Option<BookPayload>>, JsonRejection>,
) -> Result<BookPayload, AppError> {
    let Json(body) = payload?;
    body.ok_or_else(|| AppError::bad_request("request body must not be null"))
}

fn title_taken(title: &str) -> AppError {
    AppError::bad_request_with(
        vec![json!({ "field": "title", "error": "already exists" })],
        format!("a book titled '{}' already exists", title),
    )
}
