//! Storage layer for persisting habit documents
//!
//! Habits live in a single schema-flexible document collection. This module
//! defines the store interface the rest of the crate talks to, the filter and
//! sort options it understands, and a shared handle for async callers.

pub mod handle;
pub mod memory;
pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use handle::StoreHandle;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::cmp::Ordering;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::HabitId;

/// A stored document: field name to value
pub type Document = Map<String, Value>;

/// Field every document carries its identifier in
pub const ID_FIELD: &str = "_id";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid field path '{0}'")]
    InvalidFieldPath(String),

    #[error("Unsupported filter value for '{field}': only scalars can be matched")]
    UnsupportedFilter { field: String },

    #[error("Corrupt document {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Equality conditions on document fields
///
/// Field paths may be dotted to reach into nested records
/// (`creator.email`). An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    /// A filter that matches every document
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Check a document against every condition
    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            match (lookup_path(document, field), expected) {
                (None, Value::Null) => true,
                (Some(actual), expected) => actual == expected,
                (None, _) => false,
            }
        })
    }
}

/// Sort and limit for `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Field to sort on, descending
    pub sort_desc: Option<String>,
    pub limit: Option<u32>,
}

impl FindOptions {
    /// Sort by `createdAt`, newest first
    pub fn newest_first() -> Self {
        Self {
            sort_desc: Some("createdAt".to_string()),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Trait defining the document store interface
///
/// Implementations assign `_id` on insert and include it in every document
/// they return. `update_one` has top-level `$set` semantics: listed fields
/// are replaced, the rest are left alone.
pub trait DocumentStore {
    /// Find documents matching a filter, optionally sorted and limited
    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StorageError>;

    /// Get a document by ID
    fn find_one(&self, id: &HabitId) -> Result<Option<Document>, StorageError>;

    /// Insert a document and return the ID assigned to it
    fn insert_one(&self, document: Document) -> Result<HabitId, StorageError>;

    /// Set fields on a document; returns whether the ID matched
    fn update_one(&self, id: &HabitId, set: Document) -> Result<bool, StorageError>;

    /// Atomically read, modify and write back a document
    ///
    /// `modify` returns whether it changed the document; unchanged documents
    /// are not written. Returns the resulting document, or `None` if the ID
    /// has no match.
    fn modify_one(
        &self,
        id: &HabitId,
        modify: &mut dyn FnMut(&mut Document) -> Result<bool, StorageError>,
    ) -> Result<Option<Document>, StorageError>;

    /// Delete a document; returns whether one was deleted
    fn delete_one(&self, id: &HabitId) -> Result<bool, StorageError>;
}

/// Check that a field path only uses letters, digits, `_` and `.`
pub fn validate_field_path(path: &str) -> Result<(), StorageError> {
    let valid = !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidFieldPath(path.to_string()))
    }
}

/// Resolve a dotted field path inside a document
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Order two field values the way the SQLite store does: missing and null
/// first, then numbers, then strings
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) | Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }

    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 1 && rank(b) == 1 => {
            let x = x.as_f64().unwrap_or_else(|| f64::from(u8::from(x.as_bool() == Some(true))));
            let y = y.as_f64().unwrap_or_else(|| f64::from(u8::from(y.as_bool() == Some(true))));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Apply top-level `$set` semantics; the ID is never overwritten
pub fn apply_set(document: &mut Document, set: Document) {
    for (field, value) in set {
        if field != ID_FIELD {
            document.insert(field, value);
        }
    }
}
