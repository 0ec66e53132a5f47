//! Deleting habits

use crate::actions::ActionError;
use crate::domain::HabitId;
use crate::storage::DocumentStore;

/// Delete a habit permanently
pub fn delete_habit<S: DocumentStore + ?Sized>(store: &S, habit_id: &str) -> Result<(), ActionError> {
    let habit_id = HabitId::parse(habit_id)?;

    if !store.delete_one(&habit_id)? {
        return Err(ActionError::not_found(&habit_id));
    }

    tracing::info!("Deleted habit {}", habit_id);
    Ok(())
}
