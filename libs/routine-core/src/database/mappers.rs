//! Row mapping utilities for converting database rows to domain models
//!
//! Enums are stored by their `as_str` names and ids as hyphenated UUID text.
//! Malformed rows surface as `RoutineError::Database` instead of panicking.

use crate::{
    error::{Result, RoutineError},
    models::{AwayPeriod, GymProgress, Streak, Task, User},
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};
use std::str::FromStr;
use uuid::Uuid;

/// Read one typed column
///
/// # Errors
///
/// Returns an error if the column is missing or has an incompatible type
pub fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RoutineError::database(format!("Failed to read column {name}: {e}")))
}

/// Parse a UUID stored as text
///
/// # Errors
///
/// Returns an error if the text is not a UUID
pub fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| RoutineError::database(format!("Invalid UUID in database '{value}': {e}")))
}

fn uuid_column(row: &SqliteRow, name: &str) -> Result<Uuid> {
    let text: String = column(row, name)?;
    parse_uuid(&text)
}

fn enum_column<T>(row: &SqliteRow, name: &str) -> Result<T>
where
    T: FromStr<Err = RoutineError>,
{
    let text: String = column(row, name)?;
    text.parse()
        .map_err(|e| RoutineError::database(format!("Invalid {name} in database: {e}")))
}

/// Map a `tasks` row
///
/// # Errors
///
/// Returns an error if required fields are missing or cannot be converted
pub fn map_task_row(row: &SqliteRow) -> Result<Task> {
    Ok(Task {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        kind: enum_column(row, "kind")?,
        recurrence: column(row, "recurrence")?,
        status: enum_column(row, "status")?,
        is_recurring: column(row, "is_recurring")?,
        recurrence_time: column(row, "recurrence_time")?,
        recurrence_day_of_week: column(row, "recurrence_day_of_week")?,
        recurrence_day_of_month: column(row, "recurrence_day_of_month")?,
        due_date: column(row, "due_date")?,
        completed_at: column(row, "completed_at")?,
        last_reset_date: column(row, "last_reset_date")?,
        pause_on_away: column(row, "pause_on_away")?,
        external_event_ref: column(row, "external_event_ref")?,
        created_at: column(row, "created_at")?,
    })
}

/// Map a `streaks` row
///
/// # Errors
///
/// Returns an error if required fields are missing or cannot be converted
pub fn map_streak_row(row: &SqliteRow) -> Result<Streak> {
    Ok(Streak {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        task_id: uuid_column(row, "task_id")?,
        current_streak: column(row, "current_streak")?,
        longest_streak: column(row, "longest_streak")?,
        last_completed_date: column(row, "last_completed_date")?,
        visual_theme: enum_column(row, "visual_theme")?,
    })
}

/// Map an `away_periods` row
///
/// # Errors
///
/// Returns an error if required fields are missing or cannot be converted
pub fn map_away_period_row(row: &SqliteRow) -> Result<AwayPeriod> {
    Ok(AwayPeriod {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        start_date: column(row, "start_date")?,
        end_date: column(row, "end_date")?,
        is_active: column(row, "is_active")?,
    })
}

/// Map a `gym_progress` row
///
/// # Errors
///
/// Returns an error if required fields are missing or cannot be converted
pub fn map_gym_progress_row(row: &SqliteRow) -> Result<GymProgress> {
    Ok(GymProgress {
        id: uuid_column(row, "id")?,
        owner_id: uuid_column(row, "owner_id")?,
        date: column(row, "date")?,
        bodyweight: column(row, "bodyweight")?,
        squat_1rm: column(row, "squat_1rm")?,
        bench_1rm: column(row, "bench_1rm")?,
        deadlift_1rm: column(row, "deadlift_1rm")?,
        notes: column(row, "notes")?,
    })
}

/// Map a `users` row; `calendar_authorized` reflects a stored access token
///
/// # Errors
///
/// Returns an error if required fields are missing or cannot be converted
pub fn map_user_row(row: &SqliteRow) -> Result<User> {
    let access_token: Option<String> = column(row, "google_access_token")?;
    Ok(User {
        id: uuid_column(row, "id")?,
        email: column(row, "email")?,
        name: column(row, "name")?,
        created_at: column(row, "created_at")?,
        calendar_authorized: access_token.is_some(),
    })
}
