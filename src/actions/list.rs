//! Listing habits
//!
//! All listings are newest first by `createdAt` and carry streaks recomputed
//! for the caller's "today".

use chrono::NaiveDate;

use crate::actions::{load_habit, ActionError};
use crate::domain::Habit;
use crate::storage::{DocumentStore, Filter, FindOptions};

/// How many habits the home page shows
pub const LATEST_HABITS_LIMIT: u32 = 6;

/// The most recently created habits
pub fn list_latest_habits<S: DocumentStore + ?Sized>(
    store: &S,
    limit: u32,
    today: NaiveDate,
) -> Result<Vec<Habit>, ActionError> {
    find_habits(store, &Filter::all(), &FindOptions::newest_first().limit(limit), today)
}

/// Every habit
pub fn list_public_habits<S: DocumentStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<Vec<Habit>, ActionError> {
    find_habits(store, &Filter::all(), &FindOptions::newest_first(), today)
}

/// Habits owned by the creator with this email
pub fn list_habits_by_creator<S: DocumentStore + ?Sized>(
    store: &S,
    email: &str,
    today: NaiveDate,
) -> Result<Vec<Habit>, ActionError> {
    let filter = Filter::all().eq("creator.email", email);
    find_habits(store, &filter, &FindOptions::newest_first(), today)
}

fn find_habits<S: DocumentStore + ?Sized>(
    store: &S,
    filter: &Filter,
    options: &FindOptions,
    today: NaiveDate,
) -> Result<Vec<Habit>, ActionError> {
    let documents = store.find(filter, options)?;
    tracing::debug!("Found {} habits", documents.len());

    documents
        .into_iter()
        .map(|document| load_habit(document, today))
        .collect()
}
