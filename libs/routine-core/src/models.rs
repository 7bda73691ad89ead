//! Data models for routine entities

use crate::error::{Result, RoutineError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use routine_common::MAX_TITLE_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task frequency kind; decides how a recurring task returns to pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    #[default]
    Daily,
    Weekly,
    Monthly,
    LongTerm,
    GymWorkout,
}

impl TaskKind {
    /// All kinds, in declaration order
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Daily,
        TaskKind::Weekly,
        TaskKind::Monthly,
        TaskKind::LongTerm,
        TaskKind::GymWorkout,
    ];

    /// Storage representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Daily => "daily",
            TaskKind::Weekly => "weekly",
            TaskKind::Monthly => "monthly",
            TaskKind::LongTerm => "long_term",
            TaskKind::GymWorkout => "gym_workout",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RoutineError::validation(format!("Unknown task kind: {s}")))
    }
}

/// Task completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    /// Proposed by the scheduler, not yet accepted
    Suggested,
}

impl TaskStatus {
    /// Storage representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Suggested => "suggested",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "suggested" => Ok(TaskStatus::Suggested),
            other => Err(RoutineError::validation(format!(
                "Unknown task status: {other}"
            ))),
        }
    }
}

/// Main task entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: TaskKind,
    /// Free-form recurrence pattern, e.g. "every monday"
    pub recurrence: Option<String>,
    pub status: TaskStatus,
    pub is_recurring: bool,
    /// Advisory time of day for daily tasks
    pub recurrence_time: Option<NaiveTime>,
    /// Advisory weekday for weekly tasks, 0 = Monday
    pub recurrence_day_of_week: Option<u8>,
    /// Advisory day of month for monthly tasks
    pub recurrence_day_of_month: Option<u8>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set exactly when `status` is `Completed`
    pub completed_at: Option<DateTime<Utc>>,
    /// Last automatic return to pending
    pub last_reset_date: Option<DateTime<Utc>>,
    pub pause_on_away: bool,
    /// Remote calendar event id
    pub external_event_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending, non-recurring task
    #[must_use]
    pub fn new(owner_id: Uuid, title: impl Into<String>, kind: TaskKind, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            description: None,
            kind,
            recurrence: None,
            status: TaskStatus::Pending,
            is_recurring: false,
            recurrence_time: None,
            recurrence_day_of_week: None,
            recurrence_day_of_month: None,
            due_date: None,
            completed_at: None,
            last_reset_date: None,
            pause_on_away: true,
            external_event_ref: None,
            created_at: now,
        }
    }

    /// Builder-style toggle for recurrence
    #[must_use]
    pub fn recurring(mut self, is_recurring: bool) -> Self {
        self.is_recurring = is_recurring;
        self
    }
}

/// Cosmetic streak tier derived from the current streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VisualTheme {
    #[default]
    Basic,
    Bronze,
    Silver,
    Gold,
}

impl VisualTheme {
    /// Storage representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VisualTheme::Basic => "basic",
            VisualTheme::Bronze => "bronze",
            VisualTheme::Silver => "silver",
            VisualTheme::Gold => "gold",
        }
    }
}

impl fmt::Display for VisualTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualTheme {
    type Err = RoutineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(VisualTheme::Basic),
            "bronze" => Ok(VisualTheme::Bronze),
            "silver" => Ok(VisualTheme::Silver),
            "gold" => Ok(VisualTheme::Gold),
            other => Err(RoutineError::validation(format!(
                "Unknown visual theme: {other}"
            ))),
        }
    }
}

/// Consecutive-completion counter, one per task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub task_id: Uuid,
    pub current_streak: u32,
    /// Never below `current_streak`
    pub longest_streak: u32,
    pub last_completed_date: Option<NaiveDate>,
    pub visual_theme: VisualTheme,
}

impl Streak {
    /// Create an empty streak for a task
    #[must_use]
    pub fn new(owner_id: Uuid, task_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            task_id,
            current_streak: 0,
            longest_streak: 0,
            last_completed_date: None,
            visual_theme: VisualTheme::Basic,
        }
    }
}

/// Inclusive date range during which pausable tasks drop out of active views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwayPeriod {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// One gym progress log entry; weights are in kilograms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymProgress {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub date: NaiveDate,
    pub bodyweight: Option<f64>,
    pub squat_1rm: Option<f64>,
    pub bench_1rm: Option<f64>,
    pub deadlift_1rm: Option<f64>,
    pub notes: Option<String>,
}

/// Application user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Whether a calendar access token is on file
    pub calendar_authorized: bool,
}

/// Authenticated caller; every owner-scoped operation takes one explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Stored Google OAuth tokens for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// User creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

impl CreateUserRequest {
    /// # Errors
    /// Returns a validation error for an empty name or a malformed email
    pub fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(RoutineError::validation(format!(
                "Invalid email address: {}",
                self.email
            )));
        }
        if self.name.trim().is_empty() {
            return Err(RoutineError::validation("Name must not be empty"));
        }
        Ok(())
    }
}

/// Task creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to `Daily`
    pub kind: Option<TaskKind>,
    pub recurrence: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurrence_time: Option<NaiveTime>,
    pub recurrence_day_of_week: Option<u8>,
    pub recurrence_day_of_month: Option<u8>,
    /// Defaults to `true`
    pub pause_on_away: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    /// # Errors
    /// Returns a validation error for a bad title or out-of-range recurrence hints
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_recurrence_hints(self.recurrence_day_of_week, self.recurrence_day_of_month)
    }
}

/// Task update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<TaskKind>,
    pub recurrence: Option<String>,
    pub status: Option<TaskStatus>,
    pub is_recurring: Option<bool>,
    pub recurrence_time: Option<NaiveTime>,
    pub recurrence_day_of_week: Option<u8>,
    pub recurrence_day_of_month: Option<u8>,
    pub pause_on_away: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateTaskRequest {
    /// # Errors
    /// Returns a validation error for a bad title or out-of-range recurrence hints
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        validate_recurrence_hints(self.recurrence_day_of_week, self.recurrence_day_of_month)
    }
}

fn validate_title(title: &str) -> Result<()> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LENGTH {
        return Err(RoutineError::validation(format!(
            "Title must be between 1 and {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_recurrence_hints(day_of_week: Option<u8>, day_of_month: Option<u8>) -> Result<()> {
    if let Some(dow) = day_of_week {
        if dow > 6 {
            return Err(RoutineError::validation(format!(
                "recurrence_day_of_week must be 0-6, got {dow}"
            )));
        }
    }
    if let Some(dom) = day_of_month {
        if !(1..=31).contains(&dom) {
            return Err(RoutineError::validation(format!(
                "recurrence_day_of_month must be 1-31, got {dom}"
            )));
        }
    }
    Ok(())
}

/// Task list filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    /// Hide pausable tasks while an away period is current
    pub active_only: bool,
}

/// Paginated task list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Away period creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAwayPeriodRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Away period update request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAwayPeriodRequest {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

/// Away periods of a user plus the one covering today, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwayPeriodList {
    pub away_periods: Vec<AwayPeriod>,
    pub current_away_period: Option<AwayPeriod>,
}

/// Gym progress creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateGymProgressRequest {
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub bodyweight: Option<f64>,
    pub squat_1rm: Option<f64>,
    pub bench_1rm: Option<f64>,
    pub deadlift_1rm: Option<f64>,
    pub notes: Option<String>,
}

impl CreateGymProgressRequest {
    /// # Errors
    /// Returns a validation error for negative or non-finite weights
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("bodyweight", self.bodyweight),
            ("squat_1rm", self.squat_1rm),
            ("bench_1rm", self.bench_1rm),
            ("deadlift_1rm", self.deadlift_1rm),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(RoutineError::validation(format!(
                        "{name} must be a non-negative number, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Outcome of a sweep over one user's recurring tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub reset_count: usize,
    pub streaks_broken: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_serialization() {
        assert_eq!(serde_json::to_string(&TaskKind::Daily).unwrap(), "\"daily\"");
        assert_eq!(
            serde_json::to_string(&TaskKind::LongTerm).unwrap(),
            "\"long_term\""
        );
        assert_eq!(
            serde_json::to_string(&TaskKind::GymWorkout).unwrap(),
            "\"gym_workout\""
        );
    }

    #[test]
    fn test_task_kind_round_trips_through_storage_names() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        assert!("fortnightly".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!(
            "completed".parse::<TaskStatus>().unwrap(),
            TaskStatus::Completed
        );
        assert_eq!(
            "suggested".parse::<TaskStatus>().unwrap(),
            TaskStatus::Suggested
        );
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_visual_theme_ordering() {
        assert!(VisualTheme::Basic < VisualTheme::Bronze);
        assert!(VisualTheme::Silver < VisualTheme::Gold);
        assert_eq!("gold".parse::<VisualTheme>().unwrap(), VisualTheme::Gold);
    }

    #[test]
    fn test_new_task_defaults() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let task = Task::new(owner, "Stretch", TaskKind::Daily, now);

        assert_eq!(task.owner_id, owner);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.completed_at.is_none());
        assert!(!task.is_recurring);
        assert!(task.pause_on_away);
        assert_eq!(task.created_at, now);
    }

    #[test]
    fn test_create_task_request_defaults_from_json() {
        let request: CreateTaskRequest = serde_json::from_str(r#"{"title": "Read"}"#).unwrap();
        assert_eq!(request.title, "Read");
        assert!(request.kind.is_none());
        assert!(request.pause_on_away.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_task_request_rejects_bad_title() {
        let empty = CreateTaskRequest::default();
        assert!(empty.validate().is_err());

        let long = CreateTaskRequest {
            title: "x".repeat(MAX_TITLE_LENGTH + 1),
            ..Default::default()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_recurrence_hint_ranges() {
        let bad_dow = CreateTaskRequest {
            title: "Gym".into(),
            recurrence_day_of_week: Some(7),
            ..Default::default()
        };
        assert!(bad_dow.validate().is_err());

        let bad_dom = UpdateTaskRequest {
            recurrence_day_of_month: Some(0),
            ..Default::default()
        };
        assert!(bad_dom.validate().is_err());

        let ok = UpdateTaskRequest {
            recurrence_day_of_week: Some(6),
            recurrence_day_of_month: Some(31),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_create_user_request_validation() {
        let ok = CreateUserRequest {
            email: "ada@example.com".into(),
            name: "Ada".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateUserRequest {
            email: "not-an-email".into(),
            name: "Ada".into(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_gym_request_rejects_negative_weights() {
        let request = CreateGymProgressRequest {
            squat_1rm: Some(-5.0),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = CreateGymProgressRequest {
            bench_1rm: Some(f64::NAN),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
