//! Fetching a single habit

use chrono::NaiveDate;

use crate::actions::{load_habit, ActionError};
use crate::domain::{Habit, HabitId};
use crate::storage::DocumentStore;

/// Get a habit by ID, with its streak recomputed for `today`
pub fn get_habit<S: DocumentStore + ?Sized>(
    store: &S,
    habit_id: &str,
    today: NaiveDate,
) -> Result<Habit, ActionError> {
    let habit_id = HabitId::parse(habit_id)?;

    let document = store
        .find_one(&habit_id)?
        .ok_or_else(|| ActionError::not_found(&habit_id))?;

    load_habit(document, today)
}
