//! Domain module containing core business logic and data types
//!
//! This module defines the Habit document, its identifier, completion date
//! parsing and the streak calculation. Nothing here touches storage or the
//! system clock.

pub mod habit;
pub mod streak;
pub mod types;

// Re-export public types for easy access
pub use habit::*;
pub use streak::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit id '{id}': {reason}")]
    InvalidHabitId { id: String, reason: String },

    #[error("Invalid habit title: {0}")]
    InvalidHabitTitle(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Stored habit is malformed: {0}")]
    MalformedDocument(String),
}
