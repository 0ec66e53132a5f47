//! Database migration management
//!
//! This module creates and updates the SQLite schema that backs the document
//! store: one table per collection, JSON bodies, expression indexes on the
//! fields the service filters and sorts by.

use rusqlite::Connection;

use crate::storage::StorageError;

/// Current database schema version
///
/// Increment this when you add new migrations
const CURRENT_VERSION: i32 = 1;

/// Initialize the database schema
///
/// Creates the version table, then runs every migration newer than the
/// recorded version inside one transaction.
pub fn initialize_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let current_version = get_current_version(conn)?;

    if current_version < CURRENT_VERSION {
        let tx = conn.unchecked_transaction()?;
        run_migrations(&tx, current_version)?;
        set_version(&tx, CURRENT_VERSION)?;
        tx.commit()?;
    } else if current_version > CURRENT_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, CURRENT_VERSION
        )));
    }

    Ok(())
}

/// Get the current database schema version
fn get_current_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get::<_, i32>(0)
        })
        .unwrap_or(0); // No version row yet means a fresh database

    Ok(version)
}

/// Set the database schema version
fn set_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Run database migrations from the current version to the latest
fn run_migrations(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    if from_version < 1 {
        migration_v1(conn)?;
    }

    Ok(())
}

/// Migration to version 1: the habit collection
fn migration_v1(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS habit_cards (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL CHECK (json_valid(body))
        )",
        [],
    )
    .map_err(|e| StorageError::Migration(format!("failed to create habit_cards: {}", e)))?;

    create_indexes_v1(conn)?;

    tracing::info!("Applied migration v1: created habit_cards collection");
    Ok(())
}

/// Create database indexes for version 1
fn create_indexes_v1(conn: &Connection) -> Result<(), StorageError> {
    // Every listing sorts newest first
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_cards_created_at
         ON habit_cards (json_extract(body, '$.createdAt'))",
        [],
    )?;

    // "My habits"
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_habit_cards_creator_email
         ON habit_cards (json_extract(body, '$.creator.email'))",
        [],
    )?;

    tracing::debug!("Created database indexes for v1");
    Ok(())
}
