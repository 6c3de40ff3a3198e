//! Collection persisted in a redb file.
//!
//! Each collection is one table keyed by a monotonically increasing
//! sequence number, so iteration order is insertion order. Documents are
//! stored as JSON bytes. redb is synchronous, so every call runs on the
//! blocking pool; a write transaction covers each read-modify-write.

use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use crate::collection::Collection;
use crate::document::{
    assign_id, replace_keeping_id, Document, Filter, FindOptions, Update, UpdateResult,
};
use crate::error::{redb_err, DbResult};

fn table(name: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(name)
}

pub struct DurableCollection {
    db: Arc<Database>,
    table_name: String,
}

impl DurableCollection {
    /// Bind to `table_name`, creating the table if it does not exist yet.
    pub fn open(db: Arc<Database>, table_name: impl Into<String>) -> DbResult<Self> {
        let table_name = table_name.into();
        let txn = db.begin_write().map_err(redb_err)?;
        txn.open_table(table(&table_name)).map_err(redb_err)?;
        txn.commit().map_err(redb_err)?;
        Ok(Self { db, table_name })
    }

    /// Locate the first match inside an open write transaction.
    fn first_match(
        table: &redb::Table<'_, u64, &'static [u8]>,
        filter: &Filter,
    ) -> DbResult<Option<(u64, Document)>> {
        for entry in table.iter().map_err(redb_err)? {
            let (key, value) = entry.map_err(redb_err)?;
            let document: Document = serde_json::from_slice(value.value())?;
            if filter.matches(&document) {
                return Ok(Some((key.value(), document)));
            }
        }
        Ok(None)
    }

    /// Run `mutate` on the first match and store its result in one transaction.
    async fn write_first_match<F>(&self, filter: &Filter, mutate: F) -> DbResult<UpdateResult>
    where
        F: FnOnce(Document) -> DbResult<Document> + Send + 'static,
    {
        let db = self.db.clone();
        let table_name = self.table_name.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || -> DbResult<UpdateResult> {
            let txn = db.begin_write().map_err(redb_err)?;
            let matched = {
                let mut documents = txn.open_table(table(&table_name)).map_err(redb_err)?;
                match Self::first_match(&documents, &filter)? {
                    Some((key, document)) => {
                        let bytes = serde_json::to_vec(&mutate(document)?)?;
                        documents
                            .insert(key, bytes.as_slice())
                            .map_err(redb_err)?;
                        1
                    }
                    None => 0,
                }
            };
            txn.commit().map_err(redb_err)?;
            Ok(UpdateResult { matched })
        })
        .await?
    }
}

#[async_trait]
impl Collection for DurableCollection {
    fn name(&self) -> &str {
        &self.table_name
    }

    async fn find(&self, filter: &Filter, options: FindOptions) -> DbResult<Vec<Document>> {
        let db = self.db.clone();
        let table_name = self.table_name.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || -> DbResult<Vec<Document>> {
            let txn = db.begin_read().map_err(redb_err)?;
            let documents = txn.open_table(table(&table_name)).map_err(redb_err)?;

            let mut found = Vec::new();
            let mut skipped = 0;
            for entry in documents.iter().map_err(redb_err)? {
                if options.is_full(found.len()) {
                    break;
                }
                let (_, value) = entry.map_err(redb_err)?;
                let document: Document = serde_json::from_slice(value.value())?;
                if !filter.matches(&document) {
                    continue;
                }
                if skipped < options.skip {
                    skipped += 1;
                    continue;
                }
                found.push(document);
            }
            Ok(found)
        })
        .await?
    }

    async fn insert_one(&self, document: Document) -> DbResult<String> {
        let db = self.db.clone();
        let table_name = self.table_name.clone();
        let (id, document) = assign_id(document);
        let bytes = serde_json::to_vec(&document)?;

        tokio::task::spawn_blocking(move || -> DbResult<String> {
            let txn = db.begin_write().map_err(redb_err)?;
            {
                let mut documents = txn.open_table(table(&table_name)).map_err(redb_err)?;
                let next = documents
                    .last()
                    .map_err(redb_err)?
                    .map(|(key, _)| key.value() + 1)
                    .unwrap_or(0);
                documents
                    .insert(next, bytes.as_slice())
                    .map_err(redb_err)?;
            }
            txn.commit().map_err(redb_err)?;
            Ok(id)
        })
        .await?
    }

    async fn replace_one(
        &self,
        filter: &Filter,
        replacement: Document,
    ) -> DbResult<UpdateResult> {
        self.write_first_match(filter, move |existing| {
            Ok(replace_keeping_id(&existing, replacement))
        })
        .await
    }

    async fn update_one(&self, filter: &Filter, updates: &[Update]) -> DbResult<UpdateResult> {
        let updates = updates.to_vec();
        self.write_first_match(filter, move |mut document| {
            for update in &updates {
                update.apply(&mut document)?;
            }
            Ok(document)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn open(dir: &TempDir) -> DurableCollection {
        let db = Database::create(dir.path().join("store.redb")).unwrap();
        DurableCollection::open(Arc::new(db), "BookStore.Books").unwrap()
    }

    #[tokio::test]
    async fn insert_find_update_round() {
        let dir = TempDir::new().unwrap();
        let collection = open(&dir);

        for title in ["a", "b", "c"] {
            collection
                .insert_one(doc(json!({"title": title, "viewCount": 0})))
                .await
                .unwrap();
        }

        let page = collection
            .find(&Filter::All, FindOptions::default().skip(1).limit(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["title"], json!("b"));

        let result = collection
            .update_one(&Filter::eq("title", "c"), &[Update::inc("viewCount", 1)])
            .await
            .unwrap();
        assert_eq!(result.matched, 1);

        let stored = collection
            .find_one(&Filter::eq("title", "c"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["viewCount"], json!(1));
    }

    #[tokio::test]
    async fn replace_keeps_identifier() {
        let dir = TempDir::new().unwrap();
        let collection = open(&dir);

        let id = collection
            .insert_one(doc(json!({"title": "Old"})))
            .await
            .unwrap();
        collection
            .replace_one(&Filter::eq("title", "Old"), doc(json!({"title": "New"})))
            .await
            .unwrap();

        let stored = collection.find_one(&Filter::All).await.unwrap().unwrap();
        assert_eq!(stored["title"], json!("New"));
        assert_eq!(stored["_id"], json!(id));
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let collection = open(&dir);
            collection
                .insert_one(doc(json!({"title": "Dune"})))
                .await
                .unwrap();
        }

        let collection = open(&dir);
        let stored = collection
            .find_one(&Filter::eq("title", "Dune"))
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn missing_match_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let collection = open(&dir);
        let result = collection
            .update_one(&Filter::eq("title", "ghost"), &[Update::set("isDeleted", true)])
            .await
            .unwrap();
        assert_eq!(result.matched, 0);
    }
}
