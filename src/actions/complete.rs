//! Marking a habit complete for a day

use chrono::NaiveDate;

use crate::actions::{load_habit, ActionError};
use crate::domain::{completion_date, Habit, HabitId};
use crate::storage::{apply_set, DocumentStore, StorageError};

/// Record a completion and recompute the streak
///
/// `date` defaults to `today`. Marking a date that is already in the history
/// changes nothing. The read, the history update and the write happen in one
/// `modify_one` call, so concurrent calls for the same habit cannot drop each
/// other's dates.
pub fn mark_complete<S: DocumentStore + ?Sized>(
    store: &S,
    habit_id: &str,
    date: Option<&str>,
    today: NaiveDate,
) -> Result<Habit, ActionError> {
    let habit_id = HabitId::parse(habit_id)?;
    let date = completion_date(date, today)?;

    let document = store
        .modify_one(&habit_id, &mut |document| {
            let mut habit = Habit::from_document(document.clone()).map_err(|e| {
                StorageError::Corrupt {
                    id: habit_id.to_string(),
                    reason: e.to_string(),
                }
            })?;

            if !habit.mark_complete(date, today) {
                return Ok(false);
            }

            apply_set(document, habit.completion_fields());
            Ok(true)
        })?
        .ok_or_else(|| ActionError::not_found(&habit_id))?;

    let habit = load_habit(document, today)?;
    tracing::info!(
        "Marked habit {} complete for {}; current streak {}",
        habit_id,
        date,
        habit.current_streak
    );
    Ok(habit)
}
