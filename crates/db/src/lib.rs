//! Document store for the bookstore service.
//!
//! A [`Database`] hands out named [`Collection`]s of JSON documents. Queries
//! are field-equality [`Filter`]s, writes are whole-document replaces or
//! partial [`Update`]s, and every write touches exactly one document.
//!
//! Backends are picked by connection string:
//! - `memory://` keeps collections in process memory.
//! - `redb://<path>` persists them in a redb file.

pub mod collection;
pub mod database;
pub mod document;
pub mod durable;
pub mod error;
pub mod memory;
pub mod module;

pub use collection::Collection;
pub use database::Database;
pub use document::{Document, Filter, FindOptions, Update, UpdateResult, ID_FIELD};
pub use error::{DbError, DbResult};
pub use module::DatabaseModule;
