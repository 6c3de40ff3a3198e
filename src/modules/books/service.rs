use bookstore_db::DbResult;

use super::models::Book;
use super::repository::BookRepository;

/// Book lifecycle operations used by the HTTP layer.
///
/// Pure pass-through to the gateway: title uniqueness and existence are
/// checked by callers, in separate round trips from the writes they guard.
#[derive(Clone)]
pub struct CatalogService {
    books: BookRepository,
}

impl CatalogService {
    pub fn new(books: BookRepository) -> Self {
        Self { books }
    }

    pub async fn list_page(&self, page: u64, page_size: u64) -> DbResult<Vec<Book>> {
        self.books.find_all_paginated(page, page_size).await
    }

    pub async fn list_everything(&self) -> DbResult<Vec<Book>> {
        self.books.find_all().await
    }

    /// Book with this title that has not been soft-deleted.
    pub async fn get_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        self.books.find_live_by_title(title).await
    }

    /// Raw stored record, soft-deleted or not.
    pub async fn get_stored_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        self.books.find_by_title(title).await
    }

    pub async fn create(&self, book: &Book) -> DbResult<()> {
        let id = self.books.insert_one(book).await?;
        tracing::info!(title = %book.title, %id, "book created");
        Ok(())
    }

    pub async fn update_by_title(&self, title: &str, book: &Book) -> DbResult<bool> {
        let result = self.books.replace_one_by_title(title, book).await?;
        tracing::info!(title, new_title = %book.title, matched = result.matched, "book replaced");
        Ok(result.matched > 0)
    }

    pub async fn soft_delete_by_title(&self, title: &str) -> DbResult<bool> {
        let result = self.books.set_deleted_flag_by_title(title).await?;
        tracing::info!(title, matched = result.matched, "book soft-deleted");
        Ok(result.matched > 0)
    }

    pub async fn record_view(&self, title: &str) -> DbResult<()> {
        let result = self.books.increment_view_count_by_title(title).await?;
        tracing::debug!(title, matched = result.matched, "view recorded");
        Ok(())
    }
}
