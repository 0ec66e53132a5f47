//! In-process document store
//!
//! Keeps documents in a vector guarded by a mutex. Useful for tests and for
//! running the server without a database file; it follows the same filter,
//! sort and `$set` rules as the SQLite store.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::domain::HabitId;
use crate::storage::{
    apply_set, compare_values, lookup_path, validate_field_path, Document, DocumentStore, Filter,
    FindOptions, StorageError, ID_FIELD,
};

#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<(HabitId, Document)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<(HabitId, Document)>>, StorageError> {
        self.documents
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    fn with_id(id: &HabitId, document: &Document) -> Document {
        let mut document = document.clone();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        document
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StorageError> {
        for (field, _) in filter.conditions() {
            validate_field_path(field)?;
        }

        let documents = self.lock()?;
        let mut found: Vec<Document> = documents
            .iter()
            .filter(|(_, document)| filter.matches(document))
            .map(|(id, document)| Self::with_id(id, document))
            .collect();

        if let Some(field) = &options.sort_desc {
            validate_field_path(field)?;
            // Newest insert first among equal keys, as the SQLite store does
            found.reverse();
            found.sort_by(|a, b| compare_values(lookup_path(b, field), lookup_path(a, field)));
        }

        if let Some(limit) = options.limit {
            found.truncate(limit as usize);
        }

        Ok(found)
    }

    fn find_one(&self, id: &HabitId) -> Result<Option<Document>, StorageError> {
        let documents = self.lock()?;
        Ok(documents
            .iter()
            .find(|(doc_id, _)| doc_id == id)
            .map(|(doc_id, document)| Self::with_id(doc_id, document)))
    }

    fn insert_one(&self, mut document: Document) -> Result<HabitId, StorageError> {
        let id = HabitId::new();
        document.remove(ID_FIELD);
        self.lock()?.push((id, document));
        Ok(id)
    }

    fn update_one(&self, id: &HabitId, set: Document) -> Result<bool, StorageError> {
        let mut documents = self.lock()?;
        match documents.iter_mut().find(|(doc_id, _)| doc_id == id) {
            Some((_, document)) => {
                apply_set(document, set);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn modify_one(
        &self,
        id: &HabitId,
        modify: &mut dyn FnMut(&mut Document) -> Result<bool, StorageError>,
    ) -> Result<Option<Document>, StorageError> {
        let mut documents = self.lock()?;
        let Some((doc_id, stored)) = documents.iter_mut().find(|(doc_id, _)| doc_id == id) else {
            return Ok(None);
        };

        let mut working = Self::with_id(doc_id, stored);
        if modify(&mut working)? {
            let mut body = working.clone();
            body.remove(ID_FIELD);
            *stored = body;
        }

        Ok(Some(working))
    }

    fn delete_one(&self, id: &HabitId) -> Result<bool, StorageError> {
        let mut documents = self.lock()?;
        let before = documents.len();
        documents.retain(|(doc_id, _)| doc_id != id);
        Ok(documents.len() < before)
    }
}
