//! SQLite implementation of the document store
//!
//! Each document is a JSON body keyed by its ID. Filters and sorts go through
//! `json_extract`, so any field of the document can be queried without a
//! schema change.

use std::path::PathBuf;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;

use crate::domain::HabitId;
use crate::storage::{
    apply_set, migrations, validate_field_path, Document, DocumentStore, Filter, FindOptions,
    StorageError, ID_FIELD,
};

/// SQLite-based document store
///
/// This struct holds a connection to the SQLite database and implements
/// all the operations defined in the DocumentStore trait.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and bring its schema up to date
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let store = Self::from_connection(conn)?;
        tracing::info!("SQLite store initialized at: {:?}", db_path);
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            StorageError::Connection(format!("Failed to open in-memory database: {}", e))
        })?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| StorageError::Connection(format!("Failed to set busy timeout: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn })
    }

    /// Load a document body, with `_id` filled in
    fn load(&self, id: &HabitId) -> Result<Option<Document>, StorageError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM habit_cards WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| Self::decode(&id.to_string(), &body)).transpose()
    }

    /// Write a document body back, dropping `_id` (it lives in its own column)
    fn store(&self, id: &HabitId, document: &Document) -> Result<(), StorageError> {
        let mut body = document.clone();
        body.remove(ID_FIELD);

        self.conn.execute(
            "UPDATE habit_cards SET body = ?2 WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(&body)?],
        )?;
        Ok(())
    }

    fn decode(id: &str, body: &str) -> Result<Document, StorageError> {
        let value: Value = serde_json::from_str(body)?;
        match value {
            Value::Object(mut document) => {
                document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
                Ok(document)
            }
            other => Err(StorageError::Corrupt {
                id: id.to_string(),
                reason: format!("expected an object, found {}", other),
            }),
        }
    }

    /// Convert a filter value into something SQLite compares equal to what
    /// `json_extract` returns for it
    fn filter_value(field: &str, value: &Value) -> Result<Option<SqlValue>, StorageError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(SqlValue::Integer(i64::from(*b)))),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(Some(SqlValue::Integer(i))),
                (None, Some(f)) => Ok(Some(SqlValue::Real(f))),
                (None, None) => Err(StorageError::UnsupportedFilter {
                    field: field.to_string(),
                }),
            },
            Value::String(s) => Ok(Some(SqlValue::Text(s.clone()))),
            Value::Array(_) | Value::Object(_) => Err(StorageError::UnsupportedFilter {
                field: field.to_string(),
            }),
        }
    }
}

impl DocumentStore for SqliteStore {
    fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Document>, StorageError> {
        let mut sql = "SELECT id, body FROM habit_cards".to_string();
        let mut values: Vec<SqlValue> = Vec::new();
        let mut clauses: Vec<String> = Vec::new();

        // Field paths are validated, so they can be inlined; this keeps the
        // expression indexes usable.
        for (field, expected) in filter.conditions() {
            validate_field_path(field)?;
            match Self::filter_value(field, expected)? {
                None => clauses.push(format!("json_extract(body, '$.{}') IS NULL", field)),
                Some(value) => {
                    values.push(value);
                    clauses.push(format!("json_extract(body, '$.{}') = ?{}", field, values.len()));
                }
            }
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        match &options.sort_desc {
            Some(field) => {
                validate_field_path(field)?;
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, '$.{}') DESC, rowid DESC",
                    field
                ));
            }
            None => sql.push_str(" ORDER BY rowid"),
        }

        if let Some(limit) = options.limit {
            values.push(SqlValue::Integer(i64::from(limit)));
            sql.push_str(&format!(" LIMIT ?{}", values.len()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(Self::decode(&id, &body)?);
        }

        Ok(documents)
    }

    fn find_one(&self, id: &HabitId) -> Result<Option<Document>, StorageError> {
        self.load(id)
    }

    fn insert_one(&self, mut document: Document) -> Result<HabitId, StorageError> {
        let id = HabitId::new();
        document.remove(ID_FIELD);

        self.conn.execute(
            "INSERT INTO habit_cards (id, body) VALUES (?1, ?2)",
            params![id.to_string(), serde_json::to_string(&document)?],
        )?;

        tracing::debug!("Inserted habit document {}", id);
        Ok(id)
    }

    fn update_one(&self, id: &HabitId, set: Document) -> Result<bool, StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        let Some(mut document) = self.load(id)? else {
            return Ok(false);
        };
        apply_set(&mut document, set);
        self.store(id, &document)?;

        tx.commit()?;
        tracing::debug!("Updated habit document {}", id);
        Ok(true)
    }

    fn modify_one(
        &self,
        id: &HabitId,
        modify: &mut dyn FnMut(&mut Document) -> Result<bool, StorageError>,
    ) -> Result<Option<Document>, StorageError> {
        let tx = self.conn.unchecked_transaction()?;

        let Some(mut document) = self.load(id)? else {
            return Ok(None);
        };

        if modify(&mut document)? {
            self.store(id, &document)?;
            tracing::debug!("Modified habit document {}", id);
        }

        tx.commit()?;
        Ok(Some(document))
    }

    fn delete_one(&self, id: &HabitId) -> Result<bool, StorageError> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM habit_cards WHERE id = ?1", params![id.to_string()])?;

        if rows_affected > 0 {
            tracing::debug!("Deleted habit document {}", id);
        }
        Ok(rows_affected > 0)
    }
}
