//! Core types used throughout the domain layer
//!
//! This module defines the habit identifier, the creation timestamp format and
//! the parsing rules for completion dates.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a habit document
///
/// The store assigns it on insert. Wrapping the UUID keeps raw strings from
/// path segments out of store calls until they have been parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID coming from a request path or a stored document
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| DomainError::InvalidHabitId {
                id: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for HabitId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Format a timestamp the way `createdAt` is stored: UTC, millisecond precision.
///
/// Every stored timestamp has the same width, so sorting the strings sorts
/// the instants.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for `createdAt`
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Parse a completion date, dropping any time-of-day component
///
/// Accepts plain `YYYY-MM-DD`, RFC 3339 timestamps (the calendar date is taken
/// in the timestamp's own offset) and naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// timestamps.
pub fn parse_completion_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(at.date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(at.date());
        }
    }

    Err(DomainError::InvalidDate(format!(
        "'{}' is not a calendar date (expected YYYY-MM-DD)",
        raw
    )))
}
