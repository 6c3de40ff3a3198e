//! Documents and the filter/update expressions evaluated against them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Field holding the identifier the store assigns on insert.
pub const ID_FIELD: &str = "_id";

/// A stored record: a JSON object.
pub type Document = Map<String, Value>;

/// Serialize a typed record into a document.
pub fn to_document<T: Serialize>(value: &T) -> DbResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(DbError::NotAnObject),
    }
}

/// Deserialize a document back into a typed record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> DbResult<T> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Field-equality predicate over documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field is present and equal to the value.
    Eq(String, Value),
    /// Field is absent or differs from the value.
    Ne(String, Value),
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Ne(field.into(), value.into())
    }

    /// Conjunction with another filter, flattening nested `And`s.
    pub fn and(self, other: Filter) -> Self {
        let mut clauses = match self {
            Filter::All => return other,
            Filter::And(clauses) => clauses,
            single => vec![single],
        };
        match other {
            Filter::All => {}
            Filter::And(more) => clauses.extend(more),
            single => clauses.push(single),
        }
        Filter::And(clauses)
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => document.get(field) == Some(value),
            Filter::Ne(field, value) => document.get(field) != Some(value),
            Filter::And(clauses) => clauses.iter().all(|clause| clause.matches(document)),
        }
    }
}

/// Partial modification applied to a single matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Overwrite (or create) one field.
    Set(String, Value),
    /// Add to a numeric field; an absent field starts from zero.
    Inc(String, i64),
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Update::Set(field.into(), value.into())
    }

    pub fn inc(field: impl Into<String>, delta: i64) -> Self {
        Update::Inc(field.into(), delta)
    }

    pub fn apply(&self, document: &mut Document) -> DbResult<()> {
        match self {
            Update::Set(field, _) | Update::Inc(field, _) if field == ID_FIELD => {
                Err(DbError::ImmutableId)
            }
            Update::Set(field, value) => {
                document.insert(field.clone(), value.clone());
                Ok(())
            }
            Update::Inc(field, delta) => {
                let next = match document.get(field) {
                    None | Some(Value::Null) => Value::from(*delta),
                    Some(Value::Number(current)) => increment(current, *delta),
                    Some(_) => {
                        return Err(DbError::NotNumeric {
                            field: field.clone(),
                        })
                    }
                };
                document.insert(field.clone(), next);
                Ok(())
            }
        }
    }
}

fn increment(current: &serde_json::Number, delta: i64) -> Value {
    if let Some(unsigned) = current.as_u64() {
        if delta >= 0 {
            if let Some(sum) = unsigned.checked_add(delta.unsigned_abs()) {
                return Value::from(sum);
            }
        }
    }
    if let Some(signed) = current.as_i64() {
        if let Some(sum) = signed.checked_add(delta) {
            return Value::from(sum);
        }
    }
    Value::from(current.as_f64().unwrap_or_default() + delta as f64)
}

/// Skip/limit window for `find`. No ordering is applied beyond the store's
/// natural insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `taken` results already fill the window.
    pub(crate) fn is_full(&self, taken: usize) -> bool {
        self.limit.is_some_and(|limit| taken as u64 >= limit)
    }
}

/// Outcome of a single-document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
}

/// Assign a fresh `_id` unless the caller supplied one.
pub(crate) fn assign_id(mut document: Document) -> (String, Document) {
    let id = match document.get(ID_FIELD).and_then(Value::as_str) {
        Some(existing) => existing.to_string(),
        None => {
            let generated = Uuid::now_v7().to_string();
            document.insert(ID_FIELD.to_string(), Value::from(generated.clone()));
            generated
        }
    };
    (id, document)
}

/// Full replacement that keeps the stored identifier.
pub(crate) fn replace_keeping_id(existing: &Document, mut replacement: Document) -> Document {
    match existing.get(ID_FIELD) {
        Some(id) => {
            replacement.insert(ID_FIELD.to_string(), id.clone());
        }
        None => {
            replacement.remove(ID_FIELD);
        }
    }
    replacement
}
