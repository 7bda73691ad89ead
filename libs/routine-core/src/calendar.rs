//! Calendar collaborator
//!
//! Task sync needs two remote operations: create-or-update the event for a
//! task, and delete an event. Both are best-effort from the completion path;
//! see `RoutineService::complete_task`. Owners can also list, create, edit
//! and delete free-standing events in their calendar.

use crate::error::{Result, RoutineError};
use crate::models::{Task, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use routine_common::{
    DEFAULT_EVENT_HOUR, DEFAULT_PAGE_SIZE, EVENT_DURATION_MINUTES, EVENT_LIST_DAYS,
    MAX_EVENT_DESCRIPTION_LENGTH, MAX_EVENT_LOCATION_LENGTH, MAX_PAGE_SIZE, MAX_TITLE_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[cfg(feature = "google-calendar")]
pub mod google;

/// Remote calendar operations used by the core
#[async_trait]
pub trait CalendarSync: Send + Sync {
    /// Create the task's event, or update it when `task.external_event_ref`
    /// is set; returns the remote event id
    async fn upsert_event(&self, task: &Task) -> Result<String>;

    /// Delete an event; `Ok(false)` when the remote side refused
    async fn delete_event(&self, owner_id: Uuid, event_ref: &str) -> Result<bool>;

    /// Events overlapping the search window, earliest first
    async fn list_events(&self, owner_id: Uuid, search: &EventSearch) -> Result<Vec<CalendarEvent>>;

    async fn create_event(
        &self,
        owner_id: Uuid,
        request: &CreateCalendarEventRequest,
    ) -> Result<CalendarEvent>;

    /// Apply the present fields of `request`
    ///
    /// # Errors
    /// Returns `RoutineError::EventNotFound` when the owner has no such event
    async fn update_event(
        &self,
        owner_id: Uuid,
        event_id: &str,
        request: &UpdateCalendarEventRequest,
    ) -> Result<CalendarEvent>;
}

/// OAuth scopes granted together with calendar access
pub const CALENDAR_SCOPES: [&str; 4] = [
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/calendar",
];

/// Start and end of the event representing a task
#[must_use]
pub fn event_window(task: &Task, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = task.due_date.unwrap_or_else(|| default_event_start(now));
    (start, start + Duration::minutes(EVENT_DURATION_MINUTES))
}

/// Tomorrow at the default hour, UTC
fn default_event_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow
        .and_hms_opt(DEFAULT_EVENT_HOUR, 0, 0)
        .map_or(now + Duration::days(1), |naive| naive.and_utc())
}

/// A stored calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarEvent {
    /// Whether any part of the event falls inside `[start, end)`
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.end > start && self.start < end
    }
}

/// Event creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCalendarEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Defaults to one hour after `start_time`
    pub end_time: Option<DateTime<Utc>>,
}

impl CreateCalendarEventRequest {
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end_time
            .unwrap_or(self.start_time + Duration::minutes(EVENT_DURATION_MINUTES))
    }

    /// # Errors
    /// Returns a validation error for an over-long field or an end before the start
    pub fn validate(&self) -> Result<()> {
        validate_event_fields(
            Some(&self.title),
            self.description.as_deref(),
            self.location.as_deref(),
        )?;
        validate_event_times(self.start_time, self.end())
    }
}

/// Event update request; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCalendarEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl UpdateCalendarEventRequest {
    /// # Errors
    /// Returns a validation error for an over-long field, or when both times
    /// are given and the end is not after the start
    pub fn validate(&self) -> Result<()> {
        validate_event_fields(
            self.title.as_deref(),
            self.description.as_deref(),
            self.location.as_deref(),
        )?;
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => validate_event_times(start, end),
            _ => Ok(()),
        }
    }

    /// Apply the present fields to `event`, then check the resulting times
    ///
    /// # Errors
    /// Returns a validation error if the event would end before it starts
    pub fn apply(&self, event: &mut CalendarEvent) -> Result<()> {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if self.description.is_some() {
            event.description.clone_from(&self.description);
        }
        if self.location.is_some() {
            event.location.clone_from(&self.location);
        }
        if let Some(start) = self.start_time {
            event.start = start;
        }
        if let Some(end) = self.end_time {
            event.end = end;
        }
        validate_event_times(event.start, event.end)
    }
}

fn validate_event_fields(
    title: Option<&str>,
    description: Option<&str>,
    location: Option<&str>,
) -> Result<()> {
    if let Some(title) = title {
        let len = title.chars().count();
        if len == 0 || len > MAX_TITLE_LENGTH {
            return Err(RoutineError::validation(format!(
                "Title must be between 1 and {MAX_TITLE_LENGTH} characters"
            )));
        }
    }
    if description.is_some_and(|d| d.chars().count() > MAX_EVENT_DESCRIPTION_LENGTH) {
        return Err(RoutineError::validation(format!(
            "Description must be at most {MAX_EVENT_DESCRIPTION_LENGTH} characters"
        )));
    }
    if location.is_some_and(|l| l.chars().count() > MAX_EVENT_LOCATION_LENGTH) {
        return Err(RoutineError::validation(format!(
            "Location must be at most {MAX_EVENT_LOCATION_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_event_times(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(RoutineError::validation(
            "Event end time must be after its start time",
        ));
    }
    Ok(())
}

/// Query string of an event listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEventQuery {
    /// Defaults to now
    pub time_min: Option<DateTime<Utc>>,
    /// Defaults to `EVENT_LIST_DAYS` after `time_min`
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<usize>,
}

/// Resolved event listing window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSearch {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: usize,
}

impl CalendarEventQuery {
    /// Fill in the defaults relative to `now`
    ///
    /// # Errors
    /// Returns a validation error when `max_results` is outside
    /// 1..=`MAX_PAGE_SIZE` or the window is empty
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<EventSearch> {
        let max_results = self.max_results.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&max_results) {
            return Err(RoutineError::validation(format!(
                "max_results must be between 1 and {MAX_PAGE_SIZE}, got {max_results}"
            )));
        }
        let time_min = self.time_min.unwrap_or(now);
        let time_max = self
            .time_max
            .unwrap_or(time_min + Duration::days(EVENT_LIST_DAYS));
        if time_max <= time_min {
            return Err(RoutineError::validation(
                "time_max must be after time_min",
            ));
        }
        Ok(EventSearch {
            time_min,
            time_max,
            max_results,
        })
    }
}

/// Event listing response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventList {
    pub events: Vec<CalendarEvent>,
    pub total: usize,
}

impl From<Vec<CalendarEvent>> for CalendarEventList {
    fn from(events: Vec<CalendarEvent>) -> Self {
        Self {
            total: events.len(),
            events,
        }
    }
}

/// Whether the user has granted calendar access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarStatus {
    pub is_authorized: bool,
    pub scopes: Vec<String>,
    pub email: Option<String>,
}

impl From<&User> for CalendarStatus {
    fn from(user: &User) -> Self {
        if !user.calendar_authorized {
            return Self {
                is_authorized: false,
                scopes: Vec::new(),
                email: None,
            };
        }
        Self {
            is_authorized: true,
            scopes: CALENDAR_SCOPES.iter().map(ToString::to_string).collect(),
            email: Some(user.email.clone()),
        }
    }
}

/// In-process calendar; used when no remote calendar is configured and as a
/// test double
#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: Mutex<HashMap<String, CalendarEvent>>,
    unavailable: Mutex<bool>,
    calls: Mutex<usize>,
}

impl MemoryCalendar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a remote outage: every call fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    /// Number of calls received, failed ones included
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }

    /// Event by id
    #[must_use]
    pub fn event(&self, id: &str) -> Option<CalendarEvent> {
        self.events.lock().get(id).cloned()
    }

    /// Number of stored events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn begin_call(&self) -> Result<()> {
        *self.calls.lock() += 1;
        if *self.unavailable.lock() {
            return Err(RoutineError::calendar("calendar backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarSync for MemoryCalendar {
    async fn upsert_event(&self, task: &Task) -> Result<String> {
        self.begin_call()?;

        let (start, end) = event_window(task, Utc::now());
        let mut events = self.events.lock();

        // Stale refs fall back to a fresh event
        let id = task
            .external_event_ref
            .clone()
            .filter(|id| events.contains_key(id))
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        events.insert(
            id.clone(),
            CalendarEvent {
                id: id.clone(),
                owner_id: task.owner_id,
                title: task.title.clone(),
                description: task.description.clone(),
                location: None,
                start,
                end,
            },
        );
        Ok(id)
    }

    async fn delete_event(&self, owner_id: Uuid, event_ref: &str) -> Result<bool> {
        self.begin_call()?;

        let mut events = self.events.lock();
        match events.get(event_ref) {
            Some(event) if event.owner_id == owner_id => {
                events.remove(event_ref);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_events(&self, owner_id: Uuid, search: &EventSearch) -> Result<Vec<CalendarEvent>> {
        self.begin_call()?;

        let mut events: Vec<CalendarEvent> = self
            .events
            .lock()
            .values()
            .filter(|e| e.owner_id == owner_id && e.overlaps(search.time_min, search.time_max))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        events.truncate(search.max_results);
        Ok(events)
    }

    async fn create_event(
        &self,
        owner_id: Uuid,
        request: &CreateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        self.begin_call()?;

        let event = CalendarEvent {
            id: Uuid::new_v4().simple().to_string(),
            owner_id,
            title: request.title.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            start: request.start_time,
            end: request.end(),
        };
        self.events.lock().insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn update_event(
        &self,
        owner_id: Uuid,
        event_id: &str,
        request: &UpdateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        self.begin_call()?;

        let mut events = self.events.lock();
        let event = events
            .get_mut(event_id)
            .filter(|e| e.owner_id == owner_id)
            .ok_or_else(|| RoutineError::EventNotFound {
                id: event_id.to_string(),
            })?;

        let mut updated = event.clone();
        request.apply(&mut updated)?;
        *event = updated.clone();
        Ok(updated)
    }
}
