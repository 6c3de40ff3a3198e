pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookstore_db::Database;
use bookstore_kernel::{settings::Settings, InitCtx, Module};
use utoipa::OpenApi;

use repository::BookRepository;
use routes::{BooksApi, BooksState};
use service::CatalogService;

/// Catalog of books, served at the server root.
pub struct BooksModule {
    state: BooksState,
}

impl BooksModule {
    pub fn new(catalog: CatalogService, settings: &Settings) -> Self {
        Self {
            state: BooksState {
                catalog: Arc::new(catalog),
                paging: settings.catalog.clone(),
            },
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
            collection = %ctx.settings.database.books_collection_name,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Option<Router> {
        Some(routes::router(self.state.clone()))
    }

    fn base_path(&self) -> String {
        String::new()
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApi::openapi()).ok()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Wire the books module to its collection in `database`.
pub fn create_module(database: &Database, settings: &Settings) -> anyhow::Result<Arc<dyn Module>> {
    let collection_name = &settings.database.books_collection_name;
    let collection = database
        .collection(collection_name)
        .with_context(|| format!("failed to open collection '{}'", collection_name))?;
    let catalog = CatalogService::new(BookRepository::new(collection));
    Ok(Arc::new(BooksModule::new(catalog, settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn books_are_mounted_at_the_root() {
        let database = Database::open("memory://", "BookStore").unwrap();
        let module = create_module(&database, &Settings::default()).unwrap();

        assert_eq!(module.name(), "books");
        assert_eq!(module.base_path(), "");
        assert!(module.routes().is_some());
    }

    #[test]
    fn openapi_lists_every_endpoint() {
        let database = Database::open("memory://", "BookStore").unwrap();
        let module = create_module(&database, &Settings::default()).unwrap();
        let spec = module.openapi().unwrap();

        for path in [
            "/getEveryBook",
            "/getAllBooks",
            "/getBookPopularity/{title}",
            "/getBookByTitle/{title}",
            "/addBook",
            "/addBooksBulk",
            "/updateBook/{title}",
            "/deleteByTitle/{title}",
            "/bulkDelete",
        ] {
            assert!(spec["paths"].get(path).is_some(), "missing {path}");
        }
        assert!(spec["components"]["schemas"].get("BookPayload").is_some());
    }
}
