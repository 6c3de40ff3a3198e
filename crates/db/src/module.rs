use async_trait::async_trait;
use bookstore_kernel::{InitCtx, Module};

use crate::database::Database;

/// Core module owning the shared [`Database`] handle.
pub struct DatabaseModule {
    database: Database,
}

impl DatabaseModule {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.database.ping().await?;
        tracing::info!(
            module = self.name(),
            backend = self.database.backend_kind(),
            database = self.database.name(),
            collection = %ctx.settings.database.books_collection_name,
            "document store reachable"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "document store released");
        Ok(())
    }
}
