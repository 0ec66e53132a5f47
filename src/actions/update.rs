//! Updating habit fields

use chrono::NaiveDate;

use crate::actions::{load_habit, ActionError};
use crate::domain::{Habit, HabitId, HabitPatch};
use crate::storage::DocumentStore;

/// Apply a partial update and return the updated habit
///
/// Only the fields present in `patch` are written. An empty patch is a plain
/// fetch.
pub fn update_habit<S: DocumentStore + ?Sized>(
    store: &S,
    habit_id: &str,
    patch: HabitPatch,
    today: NaiveDate,
) -> Result<Habit, ActionError> {
    let habit_id = HabitId::parse(habit_id)?;
    let set = patch.into_set()?;

    if !set.is_empty() && !store.update_one(&habit_id, set)? {
        return Err(ActionError::not_found(&habit_id));
    }

    let document = store
        .find_one(&habit_id)?
        .ok_or_else(|| ActionError::not_found(&habit_id))?;

    tracing::info!("Updated habit {}", habit_id);
    load_habit(document, today)
}
