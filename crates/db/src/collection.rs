use async_trait::async_trait;

use crate::document::{Document, Filter, FindOptions, Update, UpdateResult};
use crate::error::DbResult;

/// A named set of documents. Every write touches at most one document and is
/// atomic for that document; nothing spans documents.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Matching documents in insertion order, windowed by `options`.
    async fn find(&self, filter: &Filter, options: FindOptions) -> DbResult<Vec<Document>>;

    /// First matching document in insertion order.
    async fn find_one(&self, filter: &Filter) -> DbResult<Option<Document>> {
        let mut found = self.find(filter, FindOptions::default().limit(1)).await?;
        Ok(found.pop())
    }

    /// Append a document, returning its `_id`.
    async fn insert_one(&self, document: Document) -> DbResult<String>;

    /// Replace the first match wholesale, keeping its `_id`.
    async fn replace_one(&self, filter: &Filter, replacement: Document)
        -> DbResult<UpdateResult>;

    /// Apply `updates` to the first match.
    async fn update_one(&self, filter: &Filter, updates: &[Update]) -> DbResult<UpdateResult>;
}
