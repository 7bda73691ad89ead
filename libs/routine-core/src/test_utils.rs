//! Test utilities: throwaway databases and fixtures

use crate::clock::FixedClock;
use crate::database::RoutineDatabase;
use crate::error::Result;
use crate::models::{CreateTaskRequest, CreateUserRequest, Principal, TaskKind};
use crate::service::RoutineService;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Open a fresh database in a temporary file.
///
/// Keep the returned file alive for as long as the database is used.
///
/// # Errors
/// Returns an error if the file or the schema cannot be created
pub async fn create_test_database_and_connect() -> Result<(RoutineDatabase, NamedTempFile)> {
    let file = NamedTempFile::new()?;
    let db = RoutineDatabase::new(file.path()).await?;
    Ok((db, file))
}

/// Register a user with a unique email and return its principal
///
/// # Errors
/// Returns an error if the insert fails
pub async fn create_test_user(db: &RoutineDatabase, name: &str) -> Result<Principal> {
    let request = CreateUserRequest {
        email: format!("{}-{}@example.com", name.to_lowercase(), uuid::Uuid::new_v4().simple()),
        name: name.to_string(),
    };
    let user = db.create_user(&request, Utc::now()).await?;
    Ok(Principal::new(user.id))
}

/// UTC instant shorthand
///
/// # Panics
/// Panics on an invalid date or time
#[must_use]
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .unwrap_or_else(|| panic!("invalid instant {year}-{month}-{day} {hour}:{minute}"))
}

/// Service over `db` driven by a fixed clock
#[must_use]
pub fn create_test_service(db: RoutineDatabase, now: DateTime<Utc>) -> (RoutineService, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let service = RoutineService::new(Arc::new(db), clock.clone());
    (service, clock)
}

/// Minimal task request
#[must_use]
pub fn task_request(title: &str, kind: TaskKind, is_recurring: bool) -> CreateTaskRequest {
    CreateTaskRequest {
        title: title.to_string(),
        kind: Some(kind),
        is_recurring: Some(is_recurring),
        ..CreateTaskRequest::default()
    }
}
