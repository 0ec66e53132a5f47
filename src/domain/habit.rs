//! Habit entity and related functionality
//!
//! This module defines the Habit document, the input record used to create
//! one, the partial update applied by clients and the completion bookkeeping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    calculate_streak, format_timestamp, parse_completion_date, timestamp, DomainError, HabitId,
};

const UNKNOWN_CREATOR: &str = "Unknown";
const MAX_TITLE_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_SHORT_FIELD_LEN: usize = 100;

/// The user who owns a habit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    /// Used to list "my habits"
    pub email: String,
}

impl Default for Creator {
    fn default() -> Self {
        Self {
            name: UNKNOWN_CREATOR.to_string(),
            email: UNKNOWN_CREATOR.to_string(),
        }
    }
}

/// A habit the user wants to do regularly
///
/// This is the shape of every document in the habit collection. Field names
/// are camelCase on the wire and in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    /// Assigned by the store, immutable
    #[serde(rename = "_id")]
    pub id: HabitId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub creator: Creator,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Days the habit was completed; unique and sorted ascending
    #[serde(default)]
    pub completion_history: Vec<NaiveDate>,
    /// Derived from `completion_history`, never set by clients
    #[serde(default)]
    pub current_streak: u32,
}

impl Habit {
    /// Load a habit from a store document
    pub fn from_document(document: Map<String, Value>) -> Result<Self, DomainError> {
        serde_json::from_value(Value::Object(document))
            .map_err(|e| DomainError::MalformedDocument(e.to_string()))
    }

    /// Record a completion for `date`
    ///
    /// Returns `false` without touching anything if the date is already in the
    /// history. Otherwise the date is inserted, the history re-sorted and the
    /// streak recomputed against `today`.
    pub fn mark_complete(&mut self, date: NaiveDate, today: NaiveDate) -> bool {
        if self.completion_history.contains(&date) {
            return false;
        }

        self.completion_history.push(date);
        self.completion_history.sort_unstable();
        self.current_streak = calculate_streak(&self.completion_history, today);
        true
    }

    /// Recompute the streak for a read
    ///
    /// The stored value only changes when a completion is marked, so it goes
    /// stale once the day rolls over.
    pub fn refresh_streak(&mut self, today: NaiveDate) {
        self.current_streak = calculate_streak(&self.completion_history, today);
    }

    /// Fields written back to the store after a completion is marked
    pub fn completion_fields(&self) -> Map<String, Value> {
        let mut set = Map::new();
        set.insert(
            "completionHistory".to_string(),
            Value::Array(
                self.completion_history
                    .iter()
                    .map(|d| Value::String(d.to_string()))
                    .collect(),
            ),
        );
        set.insert("currentStreak".to_string(), Value::from(self.current_streak));
        set
    }
}

/// Input for creating a habit
///
/// Accepts the field names the web client sends; `creatorName` and
/// `creatorEmail` are older aliases of `userName` and `userEmail`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default, alias = "creatorEmail")]
    pub user_email: Option<String>,
    #[serde(default, alias = "creatorName")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_private: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewHabit {
    /// Parse the request fields of a create call
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, DomainError> {
        serde_json::from_value(Value::Object(fields)).map_err(|e| DomainError::Validation {
            message: e.to_string(),
        })
    }

    /// Validate and build the document to insert
    ///
    /// The store assigns `_id`; history starts empty and the streak at 0.
    pub fn into_document(self, now: DateTime<Utc>) -> Result<Map<String, Value>, DomainError> {
        validate_title(self.title.as_deref())?;
        validate_len("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        validate_len("category", self.category.as_deref(), MAX_SHORT_FIELD_LEN)?;
        validate_len("reminderTime", self.reminder_time.as_deref(), MAX_SHORT_FIELD_LEN)?;

        let creator = Creator {
            name: non_blank(self.user_name).unwrap_or_else(|| UNKNOWN_CREATOR.to_string()),
            email: non_blank(self.user_email).unwrap_or_else(|| UNKNOWN_CREATOR.to_string()),
        };

        let mut document = Map::new();
        document.insert("title".to_string(), optional_string(self.title));
        document.insert("description".to_string(), optional_string(self.description));
        document.insert("category".to_string(), optional_string(self.category));
        document.insert("reminderTime".to_string(), optional_string(self.reminder_time));
        document.insert(
            "creator".to_string(),
            serde_json::json!({ "name": creator.name, "email": creator.email }),
        );
        document.insert("isPrivate".to_string(), Value::Bool(self.is_private));
        document.insert("imageUrl".to_string(), optional_string(self.image_url));
        document.insert("createdAt".to_string(), Value::String(format_timestamp(&now)));
        document.insert("completionHistory".to_string(), Value::Array(Vec::new()));
        document.insert("currentStreak".to_string(), Value::from(0u32));
        Ok(document)
    }
}

/// Partial update of a habit
///
/// Only fields present in the request are written; everything else, the
/// completion data in particular, is left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reminder_time: Option<String>,
    /// Set only from a newly uploaded image, never from request fields
    #[serde(skip_deserializing)]
    pub image_url: Option<String>,
}

impl HabitPatch {
    /// Parse the request fields of an update call, ignoring unknown fields
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, DomainError> {
        serde_json::from_value(Value::Object(fields)).map_err(|e| DomainError::Validation {
            message: e.to_string(),
        })
    }

    /// Check if the patch changes anything
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.reminder_time.is_none()
            && self.image_url.is_none()
    }

    /// Validate and build the `$set` document
    pub fn into_set(self) -> Result<Map<String, Value>, DomainError> {
        validate_title(self.title.as_deref())?;
        validate_len("description", self.description.as_deref(), MAX_DESCRIPTION_LEN)?;
        validate_len("category", self.category.as_deref(), MAX_SHORT_FIELD_LEN)?;
        validate_len("reminderTime", self.reminder_time.as_deref(), MAX_SHORT_FIELD_LEN)?;

        let mut set = Map::new();
        let fields = [
            ("title", self.title),
            ("description", self.description),
            ("category", self.category),
            ("reminderTime", self.reminder_time),
            ("imageUrl", self.image_url),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                set.insert(name.to_string(), Value::String(value));
            }
        }
        Ok(set)
    }
}

/// Parse the `date` of a mark-complete request, defaulting to today
pub fn completion_date(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate, DomainError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_completion_date(raw),
        _ => Ok(today),
    }
}

// Validation helper functions

fn validate_title(title: Option<&str>) -> Result<(), DomainError> {
    if let Some(title) = title {
        if title.trim().chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::InvalidHabitTitle(format!(
                "Habit title cannot be longer than {} characters",
                MAX_TITLE_LEN
            )));
        }
    }
    Ok(())
}

fn validate_len(field: &str, value: Option<&str>, max: usize) -> Result<(), DomainError> {
    if let Some(value) = value {
        if value.chars().count() > max {
            return Err(DomainError::Validation {
                message: format!("{} cannot be longer than {} characters", field, max),
            });
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn optional_string(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

/// Multipart forms carry text only, so `isPrivate` may arrive as "true"
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" => Ok(true),
            "false" | "off" | "0" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid boolean '{}'", other))),
        },
        other => Err(serde::de::Error::custom(format!("invalid boolean {}", other))),
    }
}
