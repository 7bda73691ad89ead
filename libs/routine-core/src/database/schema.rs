//! Schema bootstrap
//!
//! Tables are created on connect if missing. There is no migration step; a
//! column change means a new database file.

use crate::error::{Result, RoutineError};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            google_access_token TEXT,
            google_refresh_token TEXT
        )
        ",
    ),
    (
        "tasks",
        r"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            kind TEXT NOT NULL,
            recurrence TEXT,
            status TEXT NOT NULL,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            recurrence_time TEXT,
            recurrence_day_of_week INTEGER,
            recurrence_day_of_month INTEGER,
            due_date TEXT,
            completed_at TEXT,
            last_reset_date TEXT,
            pause_on_away INTEGER NOT NULL DEFAULT 1,
            external_event_ref TEXT,
            created_at TEXT NOT NULL
        )
        ",
    ),
    (
        "idx_tasks_owner",
        "CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id, created_at)",
    ),
    (
        "streaks",
        r"
        CREATE TABLE IF NOT EXISTS streaks (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            task_id TEXT NOT NULL UNIQUE REFERENCES tasks(id) ON DELETE CASCADE,
            current_streak INTEGER NOT NULL DEFAULT 0,
            longest_streak INTEGER NOT NULL DEFAULT 0,
            last_completed_date TEXT,
            visual_theme TEXT NOT NULL DEFAULT 'basic'
        )
        ",
    ),
    (
        "away_periods",
        r"
        CREATE TABLE IF NOT EXISTS away_periods (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        )
        ",
    ),
    (
        "idx_away_periods_owner",
        "CREATE INDEX IF NOT EXISTS idx_away_periods_owner ON away_periods(owner_id, start_date)",
    ),
    (
        "gym_progress",
        r"
        CREATE TABLE IF NOT EXISTS gym_progress (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            date TEXT NOT NULL,
            bodyweight REAL,
            squat_1rm REAL,
            bench_1rm REAL,
            deadlift_1rm REAL,
            notes TEXT
        )
        ",
    ),
];

/// Create any missing tables and indexes
///
/// # Errors
///
/// Returns an error if a DDL statement fails
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    for (name, ddl) in SCHEMA {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to create {name}: {e}")))?;
    }
    debug!("Schema ready ({} objects)", SCHEMA.len());
    Ok(())
}
