use thiserror::Error;

/// Failures raised by the document store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("unsupported connection string '{0}'; expected memory:// or redb://<path>")]
    InvalidConnectionString(String),

    #[error("redb: {0}")]
    Redb(#[from] redb::Error),

    #[error("document (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document must be a JSON object")]
    NotAnObject,

    #[error("field '{field}' is not numeric and cannot be incremented")]
    NotNumeric { field: String },

    #[error("the '_id' field is immutable")]
    ImmutableId,

    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Lift any of redb's per-operation errors into [`DbError`].
pub(crate) fn redb_err<E: Into<redb::Error>>(err: E) -> DbError {
    DbError::Redb(err.into())
}
