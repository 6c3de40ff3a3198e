use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils;

/// A catalog entry as stored in the books collection.
///
/// `title` is the business key. `id` is assigned by the store and never
/// leaves the server, and `is_deleted` marks a soft-deleted record that is
/// kept forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub author_name: String,
    pub publication_year: i32,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author_name: impl Into<String>,
        publication_year: i32,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author_name: author_name.into(),
            publication_year,
            view_count: 0,
            is_deleted: false,
        }
    }

    /// Popularity as of the current calendar year.
    pub fn popularity(&self) -> f64 {
        self.popularity_in(utils::current_year())
    }

    /// `0.5 * viewCount + 2 * (year - publicationYear)`
    pub fn popularity_in(&self, year: i32) -> f64 {
        0.5 * self.view_count as f64 + 2.0 * (f64::from(year) - f64::from(self.publication_year))
    }
}

/// Order books from most to least popular. Ties keep their incoming order.
pub fn rank_by_popularity(books: &mut [Book], year: i32) {
    books.sort_by(|a, b| b.popularity_in(year).total_cmp(&a.popularity_in(year)));
}

/// Book as it appears on the wire: no identifier, no soft-delete flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    /// Title of the book, unique among books that are not deleted
    #[schema(example = "Dune")]
    pub title: String,
    /// Author of the book
    #[schema(example = "Frank Herbert")]
    pub author_name: String,
    /// Year the book was first published
    #[schema(example = 1965)]
    pub publication_year: i32,
    /// Number of times the book was fetched by title
    #[serde(default)]
    pub view_count: u64,
}

impl From<Book> for BookPayload {
    fn from(book: Book) -> Self {
        Self {
            title: book.title,
            author_name: book.author_name,
            publication_year: book.publication_year,
            view_count: book.view_count,
        }
    }
}

impl From<BookPayload> for Book {
    fn from(payload: BookPayload) -> Self {
        Self {
            id: None,
            title: payload.title,
            author_name: payload.author_name,
            publication_year: payload.publication_year,
            view_count: payload.view_count,
            is_deleted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(view_count: u64, publication_year: i32) -> Book {
        Book {
            view_count,
            ..Book::new("t", "a", publication_year)
        }
    }

    #[test]
    fn popularity_formula() {
        assert_eq!(book(0, 1965).popularity_in(2025), 120.0);
        assert_eq!(book(3, 2025).popularity_in(2025), 1.5);
        assert_eq!(book(1, 1965).popularity_in(2025), 120.5);
    }

    #[test]
    fn popularity_grows_with_views_and_age() {
        let year = 2025;
        for views in 0..20 {
            assert!(book(views + 1, 2000).popularity_in(year) > book(views, 2000).popularity_in(year));
        }
        for published in 1900..year {
            assert!(book(5, published).popularity_in(year) > book(5, published + 1).popularity_in(year));
        }
    }

    #[test]
    fn popularity_uses_the_current_year() {
        let dune = book(0, 1965);
        assert_eq!(dune.popularity(), dune.popularity_in(utils::current_year()));
    }

    #[test]
    fn extreme_years_do_not_overflow() {
        let ancient = book(0, i32::MIN);
        assert!(ancient.popularity_in(i32::MAX).is_finite());
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut books = vec![
            Book::new("new", "a", 2024),
            Book::new("old", "a", 1900),
            Book::new("tie-first", "a", 2000),
            Book::new("tie-second", "a", 2000),
        ];
        rank_by_popularity(&mut books, 2025);
        let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["old", "tie-first", "tie-second", "new"]);
    }

    #[test]
    fn wire_format_hides_identity_and_deletion() {
        let stored = Book {
            id: Some("0193".to_string()),
            is_deleted: true,
            view_count: 4,
            ..Book::new("Dune", "Herrick", 1965)
        };
        let wire = serde_json::to_value(BookPayload::from(stored)).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "title": "Dune",
                "authorName": "Herrick",
                "publicationYear": 1965,
                "viewCount": 4
            })
        );
    }

    #[test]
    fn view_count_defaults_to_zero_on_input() {
        let payload: BookPayload = serde_json::from_value(serde_json::json!({
            "title": "Dune",
            "authorName": "Herrick",
            "publicationYear": 1965
        }))
        .unwrap();
        assert_eq!(payload.view_count, 0);
        assert!(!Book::from(payload).is_deleted);
    }

    #[test]
    fn negative_view_count_is_rejected() {
        let parsed = serde_json::from_value::<BookPayload>(serde_json::json!({
            "title": "Dune",
            "authorName": "Herrick",
            "publicationYear": 1965,
            "viewCount": -1
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn stored_document_uses_store_field_names() {
        let document = serde_json::to_value(Book::new("Dune", "Herrick", 1965)).unwrap();
        assert_eq!(document["isDeleted"], false);
        assert_eq!(document["viewCount"], 0);
        assert!(document.get("_id").is_none());
    }
}
