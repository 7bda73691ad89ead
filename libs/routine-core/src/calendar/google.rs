//! Google Calendar backend
//!
//! Each call authenticates with the access token stored for the owner.
//! Token exchange and refresh happen outside this crate.

use super::{
    event_window, CalendarEvent, CalendarSync, CreateCalendarEventRequest, EventSearch,
    UpdateCalendarEventRequest,
};
use crate::database::RoutineDatabase;
use crate::error::{Result, RoutineError};
use crate::models::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use google_calendar3::api::{Event, EventDateTime};
use google_calendar3::{hyper, hyper_rustls, CalendarHub};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

type HttpsClient = hyper::Client<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

const PRIMARY_CALENDAR: &str = "primary";

/// Calendar sync against the owner's primary Google calendar
pub struct GoogleCalendar {
    db: Arc<RoutineDatabase>,
    client: HttpsClient,
}

impl std::fmt::Debug for GoogleCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendar").finish_non_exhaustive()
    }
}

impl GoogleCalendar {
    /// Build an HTTPS client using the platform's root certificates
    ///
    /// # Errors
    /// Returns an error if the native certificate store cannot be loaded
    pub fn new(db: Arc<RoutineDatabase>) -> Result<Self> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client = hyper::Client::builder().build(https);
        Ok(Self { db, client })
    }

    async fn hub(&self, owner_id: Uuid) -> Result<CalendarHub<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>> {
        let tokens = self
            .db
            .get_google_tokens(owner_id)
            .await?
            .ok_or(RoutineError::CalendarNotAuthorized { user_id: owner_id })?;
        Ok(CalendarHub::new(self.client.clone(), tokens.access_token))
    }

    fn to_event(task: &Task) -> Event {
        let (start, end) = event_window(task, Utc::now());
        Event {
            summary: Some(task.title.clone()),
            description: task.description.clone(),
            start: Some(utc_time(start)),
            end: Some(utc_time(end)),
            ..Default::default()
        }
    }
}

fn utc_time(at: DateTime<Utc>) -> EventDateTime {
    EventDateTime {
        date_time: Some(at),
        time_zone: Some("UTC".to_string()),
        ..Default::default()
    }
}

/// All-day events carry only a date; they start at midnight UTC
fn from_utc_time(time: Option<&EventDateTime>) -> Option<DateTime<Utc>> {
    let time = time?;
    time.date_time
        .or_else(|| time.date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|n| n.and_utc()))
}

fn from_remote(owner_id: Uuid, event: Event) -> Option<CalendarEvent> {
    let start = from_utc_time(event.start.as_ref())?;
    let end = from_utc_time(event.end.as_ref()).unwrap_or(start);
    Some(CalendarEvent {
        id: event.id?,
        owner_id,
        title: event.summary.unwrap_or_default(),
        description: event.description,
        location: event.location,
        start,
        end,
    })
}

fn is_missing(error: &google_calendar3::Error) -> bool {
    match error {
        google_calendar3::Error::Failure(response) => {
            response.status() == hyper::StatusCode::NOT_FOUND
        }
        google_calendar3::Error::BadRequest(body) => body["error"]["code"] == 404,
        _ => false,
    }
}

#[async_trait]
impl CalendarSync for GoogleCalendar {
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    async fn upsert_event(&self, task: &Task) -> Result<String> {
        let hub = self.hub(task.owner_id).await?;
        let event = Self::to_event(task);

        if let Some(event_id) = &task.external_event_ref {
            match hub
                .events()
                .update(event.clone(), PRIMARY_CALENDAR, event_id)
                .doit()
                .await
            {
                Ok((_, updated)) => {
                    debug!("Updated calendar event {event_id}");
                    return Ok(updated.id.unwrap_or_else(|| event_id.clone()));
                }
                // The event may have been removed remotely; recreate it
                Err(e) => warn!("Calendar update failed, inserting instead: {e}"),
            }
        }

        let (_, created) = hub
            .events()
            .insert(event, PRIMARY_CALENDAR)
            .doit()
            .await
            .map_err(|e| RoutineError::calendar(format!("Failed to create event: {e}")))?;

        created
            .id
            .ok_or_else(|| RoutineError::calendar("Created event has no id"))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, owner_id: Uuid, event_ref: &str) -> Result<bool> {
        let hub = self.hub(owner_id).await?;
        match hub.events().delete(PRIMARY_CALENDAR, event_ref).doit().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!("Calendar delete failed: {e}");
                Ok(false)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_events(&self, owner_id: Uuid, search: &EventSearch) -> Result<Vec<CalendarEvent>> {
        let hub = self.hub(owner_id).await?;
        let max_results = i32::try_from(search.max_results).unwrap_or(i32::MAX);
        let (_, events) = hub
            .events()
            .list(PRIMARY_CALENDAR)
            .time_min(search.time_min)
            .time_max(search.time_max)
            .max_results(max_results)
            .single_events(true)
            .order_by("startTime")
            .doit()
            .await
            .map_err(|e| RoutineError::calendar(format!("Failed to list events: {e}")))?;

        Ok(events
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|event| from_remote(owner_id, event))
            .collect())
    }

    #[instrument(skip(self, request))]
    async fn create_event(
        &self,
        owner_id: Uuid,
        request: &CreateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        let hub = self.hub(owner_id).await?;
        let event = Event {
            summary: Some(request.title.clone()),
            description: request.description.clone(),
            location: request.location.clone(),
            start: Some(utc_time(request.start_time)),
            end: Some(utc_time(request.end())),
            ..Default::default()
        };

        let (_, created) = hub
            .events()
            .insert(event, PRIMARY_CALENDAR)
            .doit()
            .await
            .map_err(|e| RoutineError::calendar(format!("Failed to create event: {e}")))?;

        from_remote(owner_id, created)
            .ok_or_else(|| RoutineError::calendar("Created event has no id or start"))
    }

    #[instrument(skip(self, request))]
    async fn update_event(
        &self,
        owner_id: Uuid,
        event_id: &str,
        request: &UpdateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        let hub = self.hub(owner_id).await?;
        let patch = Event {
            summary: request.title.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            start: request.start_time.map(utc_time),
            end: request.end_time.map(utc_time),
            ..Default::default()
        };

        let (_, updated) = hub
            .events()
            .patch(patch, PRIMARY_CALENDAR, event_id)
            .doit()
            .await
            .map_err(|e| {
                if is_missing(&e) {
                    RoutineError::EventNotFound {
                        id: event_id.to_string(),
                    }
                } else {
                    RoutineError::calendar(format!("Failed to update event: {e}"))
                }
            })?;

        from_remote(owner_id, updated)
            .ok_or_else(|| RoutineError::calendar("Updated event has no id or start"))
    }
}
