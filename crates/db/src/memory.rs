//! Process-local collection. Contents vanish with the process.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::collection::Collection;
use crate::document::{
    assign_id, replace_keeping_id, Document, Filter, FindOptions, Update, UpdateResult,
};
use crate::error::DbResult;

pub struct MemoryCollection {
    name: String,
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, filter: &Filter, options: FindOptions) -> DbResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut found = Vec::new();
        for document in documents
            .iter()
            .filter(|document| filter.matches(document))
            .skip(options.skip as usize)
        {
            if options.is_full(found.len()) {
                break;
            }
            found.push(document.clone());
        }
        Ok(found)
    }

    async fn insert_one(&self, document: Document) -> DbResult<String> {
        let (id, document) = assign_id(document);
        self.documents.write().await.push(document);
        Ok(id)
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
    ) -> DbResult<UpdateResult> {
        let mut documents = self.documents.write().await;
        let Some(slot) = documents.iter_mut().find(|document| filter.matches(document)) else {
            return Ok(UpdateResult::default());
        };
        *slot = replace_keeping_id(slot, replacement);
        Ok(UpdateResult { matched: 1 })
    }

    async fn update_one(&self, filter: &Filter, updates: &[Update]) -> DbResult<UpdateResult> {
        let mut documents = self.documents.write().await;
        let Some(slot) = documents.iter_mut().find(|document| filter.matches(document)) else {
            return Ok(UpdateResult::default());
        };
        // Apply to a copy so a failing update leaves the stored document intact.
        let mut updated = slot.clone();
        for update in updates {
            update.apply(&mut updated)?;
        }
        *slot = updated;
        Ok(UpdateResult { matched: 1 })
    }
}
