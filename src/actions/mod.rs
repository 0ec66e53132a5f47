//! Habit operations
//!
//! One module per operation the HTTP layer exposes. Every action is a plain
//! synchronous function over a document store, and every action that depends
//! on the date takes "today" from its caller.

pub mod complete;
pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod update;

// Re-export action functions for easy access
pub use complete::*;
pub use create::*;
pub use delete::*;
pub use get::*;
pub use list::*;
pub use update::*;

use thiserror::Error;

use crate::domain::{DomainError, Habit, HabitId};
use crate::storage::{Document, StorageError};

/// Errors returned by habit operations
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Habit not found: {habit_id}")]
    NotFound { habit_id: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ActionError {
    fn not_found(id: &HabitId) -> Self {
        Self::NotFound {
            habit_id: id.to_string(),
        }
    }
}

/// Turn a stored document into a habit with an up-to-date streak
fn load_habit(document: Document, today: chrono::NaiveDate) -> Result<Habit, ActionError> {
    let mut habit = Habit::from_document(document)?;
    habit.refresh_streak(today);
    Ok(habit)
}
