//! Creating habits

use chrono::{DateTime, Utc};

use crate::actions::ActionError;
use crate::domain::{HabitId, NewHabit};
use crate::storage::DocumentStore;

/// Create a new habit and return the ID the store assigned
///
/// `now` becomes the habit's `createdAt`.
pub fn create_habit<S: DocumentStore + ?Sized>(
    store: &S,
    params: NewHabit,
    now: DateTime<Utc>,
) -> Result<HabitId, ActionError> {
    let document = params.into_document(now)?;
    let habit_id = store.insert_one(document)?;

    tracing::info!("Created habit {}", habit_id);
    Ok(habit_id)
}
