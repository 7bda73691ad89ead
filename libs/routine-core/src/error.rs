//! Error types for the routine core library

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for routine operations
pub type Result<T> = std::result::Result<T, RoutineError>;

/// Main error type for routine operations
#[derive(Error, Debug)]
pub enum RoutineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {id}")]
    TaskNotFound { id: Uuid },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Away period not found: {id}")]
    AwayPeriodNotFound { id: Uuid },

    #[error("Gym progress entry not found: {id}")]
    GymEntryNotFound { id: Uuid },

    #[error("Calendar event not found: {id}")]
    EventNotFound { id: String },

    #[error("User {user_id} has not authorized calendar access")]
    CalendarNotAuthorized { user_id: Uuid },

    #[error("Away period overlaps with existing period (id: {conflicting_id})")]
    Conflict { conflicting_id: Uuid },

    #[error("Invalid date range: end date {end} is before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Calendar error: {message}")]
    Calendar { message: String },

    #[error("Unknown error: {message}")]
    Unknown { message: String },
}

impl RoutineError {
    /// Create a database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a calendar collaborator error
    pub fn calendar(message: impl Into<String>) -> Self {
        Self::Calendar {
            message: message.into(),
        }
    }

    /// Create an unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Whether this error reports a missing record
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound { .. }
                | Self::UserNotFound { .. }
                | Self::AwayPeriodNotFound { .. }
                | Self::GymEntryNotFound { .. }
                | Self::EventNotFound { .. }
        )
    }
}

impl From<serde_yaml::Error> for RoutineError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::configuration(format!("Invalid YAML: {e}"))
    }
}
