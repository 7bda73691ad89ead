//! Routine Core - recurring tasks, streaks and away periods
//!
//! This library holds the data model and the rules of a personal routine
//! tracker, plus the SQLite persistence and the orchestration service the
//! HTTP API is built on.
//!
//! # Features
//!
//! - **Task lifecycle**: completion, and automatic return to pending for
//!   recurring tasks once their daily, weekly or monthly period has elapsed
//! - **Streaks**: per-task consecutive-completion counters with milestone themes
//! - **Away periods**: non-overlapping date ranges that pause pausable tasks
//! - **Gym progress**: one-rep-max log with derived totals
//! - **Calendar sync**: optional push of completed tasks to a calendar
//!
//! # Quick Start
//!
//! ```no_run
//! use routine_core::{
//!     CreateTaskRequest, CreateUserRequest, Principal, RoutineDatabase, RoutineError,
//!     RoutineService, SystemClock, TaskKind,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), RoutineError> {
//! let db = RoutineDatabase::from_connection_string("sqlite://routine.db").await?;
//! let user = db
//!     .create_user(
//!         &CreateUserRequest { email: "ada@example.com".into(), name: "Ada".into() },
//!         chrono::Utc::now(),
//!     )
//!     .await?;
//! let owner = Principal::new(user.id);
//!
//! let service = RoutineService::new(Arc::new(db), Arc::new(SystemClock));
//! let task = service
//!     .create_task(
//!         owner,
//!         &CreateTaskRequest {
//!             title: "Stretch".into(),
//!             kind: Some(TaskKind::Daily),
//!             is_recurring: Some(true),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! service.complete_task(owner, task.id).await?;
//!
//! // Tomorrow, a sweep returns it to pending
//! let report = service.sweep(owner).await?;
//! println!("reset {} tasks", report.reset_count);
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `test-utils`: Enable test utilities (for testing only)
//! - `observability`: Record `metrics` counters
//! - `google-calendar`: Google Calendar backend for calendar sync

pub mod away;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod config_loader;
pub mod database;
pub mod error;
pub mod gym;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod service;
pub mod store;
pub mod streak;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use away::{active_tasks, current_period, ensure_no_overlap, find_overlap, is_paused};
pub use calendar::{
    event_window, CalendarEvent, CalendarEventList, CalendarEventQuery, CalendarStatus,
    CalendarSync, CreateCalendarEventRequest, EventSearch, MemoryCalendar,
    UpdateCalendarEventRequest, CALENDAR_SCOPES,
};
#[cfg(feature = "google-calendar")]
pub use calendar::google::GoogleCalendar;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigLayer, RoutineConfig};
pub use config_loader::ConfigLoader;
pub use database::{DatabasePoolConfig, DatabaseStats, RoutineDatabase, SqliteOptimizations};
pub use error::{Result, RoutineError};
pub use gym::GymProgressSummary;
pub use lifecycle::{reset_eligible, sweep, ResetRule};
pub use models::{
    AwayPeriod, AwayPeriodList, CreateAwayPeriodRequest, CreateGymProgressRequest,
    CreateTaskRequest, CreateUserRequest, GoogleTokens, GymProgress, Principal, Streak,
    SweepReport, Task, TaskFilters, TaskKind, TaskList, TaskStatus, UpdateAwayPeriodRequest,
    UpdateTaskRequest, User, VisualTheme,
};
pub use observability::{CheckResult, HealthStatus};
pub use service::{RoutineService, SweepSummary};
pub use store::Store;
