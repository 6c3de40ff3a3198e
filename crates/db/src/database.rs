use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bookstore_kernel::settings::DatabaseSettings;

use crate::collection::Collection;
use crate::durable::DurableCollection;
use crate::error::{redb_err, DbError, DbResult};
use crate::memory::MemoryCollection;

const MEMORY_SCHEME: &str = "memory://";
const REDB_SCHEME: &str = "redb://";

/// Process-wide handle on one logical database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    name: String,
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<Mutex<HashMap<String, Arc<MemoryCollection>>>>),
    Redb {
        path: PathBuf,
        db: Arc<redb::Database>,
    },
}

impl Database {
    /// Open the store described by the settings.
    pub fn connect(settings: &DatabaseSettings) -> DbResult<Self> {
        Self::open(&settings.connection_string, &settings.database_name)
    }

    /// Open `connection_string` (`memory://` or `redb://<path>`) as database `name`.
    pub fn open(connection_string: &str, name: &str) -> DbResult<Self> {
        let backend = if connection_string == MEMORY_SCHEME {
            Backend::Memory(Arc::default())
        } else if let Some(path) = connection_string.strip_prefix(REDB_SCHEME) {
            if path.is_empty() {
                return Err(DbError::InvalidConnectionString(
                    connection_string.to_string(),
                ));
            }
            let path = PathBuf::from(path);
            Backend::Redb {
                db: Arc::new(open_redb(&path)?),
                path,
            }
        } else {
            return Err(DbError::InvalidConnectionString(
                connection_string.to_string(),
            ));
        };

        tracing::info!(
            target: "bookstore-db",
            database = name,
            backend = backend.kind(),
            "document store opened"
        );

        Ok(Self {
            name: name.to_string(),
            backend,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short backend label for logs.
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Handle on a named collection, created on first use.
    pub fn collection(&self, name: &str) -> DbResult<Arc<dyn Collection>> {
        let qualified = format!("{}.{}", self.name, name);
        match &self.backend {
            Backend::Memory(collections) => {
                let mut collections = collections
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let collection: Arc<dyn Collection> = collections
                    .entry(qualified)
                    .or_insert_with_key(|key| Arc::new(MemoryCollection::new(key.clone())))
                    .clone();
                Ok(collection)
            }
            Backend::Redb { db, .. } => Ok(Arc::new(DurableCollection::open(
                db.clone(),
                qualified,
            )?)),
        }
    }

    /// Verify the backend answers a read.
    pub async fn ping(&self) -> DbResult<()> {
        match &self.backend {
            Backend::Memory(_) => Ok(()),
            Backend::Redb { db, path } => {
                let db = db.clone();
                let path = path.clone();
                tokio::task::spawn_blocking(move || -> DbResult<()> {
                    db.begin_read().map_err(redb_err)?;
                    tracing::debug!(target: "bookstore-db", path = %path.display(), "redb ping ok");
                    Ok(())
                })
                .await?
            }
        }
    }
}

impl Backend {
    fn kind(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::Redb { .. } => "redb",
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("backend", &self.backend.kind())
            .finish()
    }
}

fn open_redb(path: &Path) -> DbResult<redb::Database> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    redb::Database::create(path).map_err(redb_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Filter, FindOptions};
    use serde_json::json;

    #[test]
    fn rejects_unknown_scheme() {
        let err = Database::open("mongodb://localhost:27017", "BookStore").unwrap_err();
        assert!(matches!(err, DbError::InvalidConnectionString(_)));

        let err = Database::open("redb://", "BookStore").unwrap_err();
        assert!(matches!(err, DbError::InvalidConnectionString(_)));
    }

    #[tokio::test]
    async fn memory_collections_are_shared_by_name() {
        let db = Database::open("memory://", "BookStore").unwrap();
        let first = db.collection("Books").unwrap();
        let second = db.collection("Books").unwrap();

        let mut record = serde_json::Map::new();
        record.insert("title".into(), json!("Dune"));
        first.insert_one(record).await.unwrap();

        let seen = second
            .find(&Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(second.name(), "BookStore.Books");
    }

    #[tokio::test]
    async fn redb_backend_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("books.redb");
        let db = Database::open(&format!("redb://{}", path.display()), "BookStore").unwrap();

        assert_eq!(db.backend_kind(), "redb");
        db.ping().await.unwrap();
        db.collection("Books").unwrap();
        assert!(path.exists());
    }
}
