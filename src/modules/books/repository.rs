//! Persistence gateway between the catalog and the books collection.
//!
//! Each call is a single round trip. Lookups and writes keyed by title only
//! ever see books that are not soft-deleted, except [`BookRepository::find_by_title`]
//! and [`BookRepository::find_all`], which look at raw storage.

use std::sync::Arc;

use bookstore_db::{
    document::{from_document, to_document},
    Collection, DbResult, Filter, FindOptions, Update, UpdateResult,
};

use super::models::Book;

const TITLE: &str = "title";
const VIEW_COUNT: &str = "viewCount";
const IS_DELETED: &str = "isDeleted";

fn not_deleted() -> Filter {
    Filter::ne(IS_DELETED, true)
}

fn live_title(title: &str) -> Filter {
    Filter::eq(TITLE, title).and(not_deleted())
}

#[derive(Clone)]
pub struct BookRepository {
    collection: Arc<dyn Collection>,
}

impl BookRepository {
    pub fn new(collection: Arc<dyn Collection>) -> Self {
        Self { collection }
    }

    /// Page `page` (1-based) of books that are not deleted, in storage order.
    pub async fn find_all_paginated(&self, page: u64, page_size: u64) -> DbResult<Vec<Book>> {
        let options = FindOptions::default()
            .skip(page.saturating_sub(1).saturating_mul(page_size))
            .limit(page_size);
        self.find(&not_deleted(), options).await
    }

    /// Every stored record, soft-deleted ones included.
    pub async fn find_all(&self) -> DbResult<Vec<Book>> {
        self.find(&Filter::All, FindOptions::default()).await
    }

    /// First record with this title, deleted or not.
    pub async fn find_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        self.find_one(&Filter::eq(TITLE, title)).await
    }

    /// First record with this title that is not soft-deleted.
    pub async fn find_live_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        self.find_one(&live_title(title)).await
    }

    /// Append a record. Titles are not checked for uniqueness here.
    pub async fn insert_one(&self, book: &Book) -> DbResult<String> {
        let record = Book {
            id: None,
            is_deleted: false,
            ..book.clone()
        };
        self.collection.insert_one(to_document(&record)?).await
    }

    /// Replace every field of the live record except its id.
    pub async fn replace_one_by_title(&self, title: &str, book: &Book) -> DbResult<UpdateResult> {
        let replacement = Book {
            id: None,
            is_deleted: false,
            ..book.clone()
        };
        self.collection
            .replace_one(&live_title(title), to_document(&replacement)?)
            .await
    }

    pub async fn set_deleted_flag_by_title(&self, title: &str) -> DbResult<UpdateResult> {
        self.collection
            .update_one(&live_title(title), &[Update::set(IS_DELETED, true)])
            .await
    }

    /// `viewCount += 1`, applied atomically by the store.
    pub async fn increment_view_count_by_title(&self, title: &str) -> DbResult<UpdateResult> {
        self.collection
            .update_one(&live_title(title), &[Update::inc(VIEW_COUNT, 1)])
            .await
    }

    async fn find(&self, filter: &Filter, options: FindOptions) -> DbResult<Vec<Book>> {
        self.collection
            .find(filter, options)
            .await?
            .into_iter()
            .map(from_document::<Book>)
            .collect()
    }

    async fn find_one(&self, filter: &Filter) -> DbResult<Option<Book>> {
        self.collection
            .find_one(filter)
            .await?
            .map(from_document::<Book>)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_db::Database;

    fn repository() -> BookRepository {
        let database = Database::open("memory://", "BookStore").unwrap();
        BookRepository::new(database.collection("Books").unwrap())
    }

    async fn seed(repository: &BookRepository, titles: &[&str]) {
        for title in titles {
            repository
                .insert_one(&Book::new(*title, "Author", 2000))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn inserted_books_get_an_identifier() {
        let repository = repository();
        seed(&repository, &["Dune"]).await;

        let stored = repository.find_by_title("Dune").await.unwrap().unwrap();
        assert!(stored.id.is_some());
        assert_eq!(stored.view_count, 0);
        assert!(!stored.is_deleted);
    }

    #[tokio::test]
    async fn pagination_skips_deleted_books() {
        let repository = repository();
        seed(&repository, &["a", "b", "c", "d", "e"]).await;
        repository.set_deleted_flag_by_title("b").await.unwrap();

        let first = repository.find_all_paginated(1, 2).await.unwrap();
        let second = repository.find_all_paginated(2, 2).await.unwrap();
        let third = repository.find_all_paginated(3, 2).await.unwrap();

        let titles = |books: Vec<Book>| books.into_iter().map(|b| b.title).collect::<Vec<_>>();
        assert_eq!(titles(first), vec!["a", "c"]);
        assert_eq!(titles(second), vec!["d", "e"]);
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn find_all_includes_deleted_books() {
        let repository = repository();
        seed(&repository, &["a", "b"]).await;
        repository.set_deleted_flag_by_title("a").await.unwrap();

        let everything = repository.find_all().await.unwrap();
        assert_eq!(everything.len(), 2);
        assert!(everything[0].is_deleted);
    }

    #[tokio::test]
    async fn soft_delete_keeps_the_record() {
        let repository = repository();
        seed(&repository, &["Dune"]).await;

        let result = repository.set_deleted_flag_by_title("Dune").await.unwrap();
        assert_eq!(result.matched, 1);

        assert!(repository.find_live_by_title("Dune").await.unwrap().is_none());
        let raw = repository.find_by_title("Dune").await.unwrap().unwrap();
        assert!(raw.is_deleted);

        let again = repository.set_deleted_flag_by_title("Dune").await.unwrap();
        assert_eq!(again.matched, 0);
    }

    #[tokio::test]
    async fn increment_targets_only_the_live_title() {
        let repository = repository();
        seed(&repository, &["Dune", "Emma"]).await;
        repository.set_deleted_flag_by_title("Dune").await.unwrap();
        seed(&repository, &["Dune"]).await;

        repository.increment_view_count_by_title("Dune").await.unwrap();

        let everything = repository.find_all().await.unwrap();
        let counts: Vec<_> = everything
            .iter()
            .map(|b| (b.title.as_str(), b.is_deleted, b.view_count))
            .collect();
        assert_eq!(
            counts,
            vec![("Dune", true, 0), ("Emma", false, 0), ("Dune", false, 1)]
        );
    }

    #[tokio::test]
    async fn replace_keeps_identity_and_live_flag() {
        let repository = repository();
        seed(&repository, &["Draft"]).await;
        let before = repository.find_by_title("Draft").await.unwrap().unwrap();

        let replacement = Book {
            view_count: 9,
            is_deleted: true,
            ..Book::new("Final", "Someone Else", 1999)
        };
        let result = repository
            .replace_one_by_title("Draft", &replacement)
            .await
            .unwrap();
        assert_eq!(result.matched, 1);

        let after = repository.find_live_by_title("Final").await.unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.author_name, "Someone Else");
        assert_eq!(after.view_count, 9);
        assert!(!after.is_deleted);
        assert!(repository.find_by_title("Draft").await.unwrap().is_none());
    }
}
