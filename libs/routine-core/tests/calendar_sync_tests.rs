//! Calendar collaborator wiring in the service
#![cfg(feature = "test-utils")]

use chrono::{Duration, TimeZone, Utc};
use routine_core::{
    test_utils::{create_test_database_and_connect, create_test_user, task_request, utc},
    CalendarEventQuery, CalendarSync, CreateCalendarEventRequest, CreateTaskRequest, FixedClock,
    MemoryCalendar, RoutineError, RoutineService, TaskKind, TaskStatus,
    UpdateCalendarEventRequest,
};
use std::sync::Arc;

async fn service_with_calendar() -> (
    RoutineService,
    Arc<MemoryCalendar>,
    routine_core::Principal,
    tempfile::NamedTempFile,
) {
    let (db, temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let calendar = Arc::new(MemoryCalendar::new());
    let service = RoutineService::new(
        Arc::new(db),
        Arc::new(FixedClock::new(utc(2024, 3, 1, 10, 0))),
    )
    .with_calendar(calendar.clone());
    (service, calendar, owner, temp_file)
}

#[tokio::test]
async fn test_completion_creates_event_and_stores_ref() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;

    let due = Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap();
    let task = service
        .create_task(
            owner,
            &CreateTaskRequest {
                due_date: Some(due),
                ..task_request("Dentist", TaskKind::LongTerm, false)
            },
        )
        .await
        .unwrap();

    let completed = service.complete_task(owner, task.id).await.unwrap();
    let event_ref = completed.external_event_ref.clone().unwrap();

    let event = calendar.event(&event_ref).unwrap();
    assert_eq!(event.title, "Dentist");
    assert_eq!(event.start, due);
    assert_eq!(event.end, due + Duration::hours(1));

    let stored = service.get_task(owner, task.id).await.unwrap();
    assert_eq!(stored.external_event_ref, Some(event_ref));
}

#[tokio::test]
async fn test_repeat_completion_updates_same_event() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;

    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    let first = service.complete_task(owner, task.id).await.unwrap();
    service.uncomplete_task(owner, task.id).await.unwrap();
    let second = service.complete_task(owner, task.id).await.unwrap();

    assert_eq!(first.external_event_ref, second.external_event_ref);
    assert_eq!(calendar.len(), 1);
}

#[tokio::test]
async fn test_calendar_outage_does_not_fail_completion() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    calendar.set_unavailable(true);

    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    let completed = service.complete_task(owner, task.id).await.unwrap();

    assert_eq!(completed.status, TaskStatus::Completed);
    assert!(completed.external_event_ref.is_none());
    assert_eq!(calendar.call_count(), 1);
    assert!(calendar.is_empty());
    assert_eq!(service.get_streak(owner, task.id).await.unwrap().current_streak, 1);
}

#[tokio::test]
async fn test_explicit_sync_propagates_outage() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();

    calendar.set_unavailable(true);
    let result = service.sync_task_to_calendar(owner, task.id).await;
    assert!(matches!(result, Err(RoutineError::Calendar { .. })));

    calendar.set_unavailable(false);
    let synced = service.sync_task_to_calendar(owner, task.id).await.unwrap();
    assert!(synced.external_event_ref.is_some());
    assert_eq!(synced.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_unsync_clears_ref_only_on_success() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    let synced = service.sync_task_to_calendar(owner, task.id).await.unwrap();
    let event_ref = synced.external_event_ref.unwrap();

    calendar.set_unavailable(true);
    assert!(service.unsync_task(owner, task.id).await.is_err());
    let still_synced = service.get_task(owner, task.id).await.unwrap();
    assert_eq!(still_synced.external_event_ref.as_deref(), Some(event_ref.as_str()));

    calendar.set_unavailable(false);
    assert!(service.unsync_task(owner, task.id).await.unwrap());
    assert!(service.get_task(owner, task.id).await.unwrap().external_event_ref.is_none());
    assert!(calendar.event(&event_ref).is_none());
}

#[tokio::test]
async fn test_unsync_refused_keeps_ref() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    let synced = service.sync_task_to_calendar(owner, task.id).await.unwrap();

    // Someone removed the event remotely; the delete is refused
    let event_ref = synced.external_event_ref.clone().unwrap();
    assert!(calendar.delete_event(owner.user_id, &event_ref).await.unwrap());

    assert!(!service.unsync_task(owner, task.id).await.unwrap());
    assert_eq!(
        service.get_task(owner, task.id).await.unwrap().external_event_ref,
        Some(event_ref)
    );
}

#[tokio::test]
async fn test_unsync_without_ref_is_trivially_true() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();

    assert!(service.unsync_task(owner, task.id).await.unwrap());
    assert_eq!(calendar.call_count(), 0);
}

#[tokio::test]
async fn test_sync_without_calendar_is_an_error() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let service = RoutineService::new(
        Arc::new(db),
        Arc::new(FixedClock::new(utc(2024, 3, 1, 10, 0))),
    );
    assert!(!service.calendar_enabled());

    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    let result = service.sync_task_to_calendar(owner, task.id).await;
    assert!(matches!(result, Err(RoutineError::Calendar { .. })));

    // Completion still works without a calendar
    let completed = service.complete_task(owner, task.id).await.unwrap();
    assert!(completed.external_event_ref.is_none());
}

fn event_request(title: &str, day: u32, hour: u32) -> CreateCalendarEventRequest {
    CreateCalendarEventRequest {
        title: title.to_string(),
        description: None,
        location: Some("Gym".to_string()),
        start_time: utc(2024, 3, day, hour, 0),
        end_time: None,
    }
}

#[tokio::test]
async fn test_event_listing_defaults_to_next_thirty_days() {
    let (service, _calendar, owner, _temp_file) = service_with_calendar().await;

    // Clock is 2024-03-01 10:00
    service
        .create_calendar_event(owner, &event_request("Past", 1, 8))
        .await
        .unwrap();
    let soon = service
        .create_calendar_event(owner, &event_request("Soon", 2, 9))
        .await
        .unwrap();
    assert_eq!(soon.end, utc(2024, 3, 2, 10, 0));

    let list = service
        .list_calendar_events(owner, &CalendarEventQuery::default())
        .await
        .unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.events[0].id, soon.id);

    let everything = CalendarEventQuery {
        time_min: Some(utc(2024, 3, 1, 0, 0)),
        ..CalendarEventQuery::default()
    };
    assert_eq!(service.list_calendar_events(owner, &everything).await.unwrap().total, 2);
}

#[tokio::test]
async fn test_event_listing_rejects_bad_query() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;

    let query = CalendarEventQuery {
        max_results: Some(101),
        ..CalendarEventQuery::default()
    };
    let result = service.list_calendar_events(owner, &query).await;
    assert!(matches!(result, Err(RoutineError::Validation { .. })));
    assert_eq!(calendar.call_count(), 0);
}

#[tokio::test]
async fn test_create_event_validates_before_calling_out() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;

    let request = CreateCalendarEventRequest {
        end_time: Some(utc(2024, 3, 2, 8, 0)),
        ..event_request("Backwards", 2, 9)
    };
    let result = service.create_calendar_event(owner, &request).await;
    assert!(matches!(result, Err(RoutineError::Validation { .. })));
    assert_eq!(calendar.call_count(), 0);
}

#[tokio::test]
async fn test_update_and_delete_event_are_owner_scoped() {
    let (service, calendar, owner, _temp_file) = service_with_calendar().await;
    let stranger = routine_core::Principal::new(uuid::Uuid::new_v4());

    let event = service
        .create_calendar_event(owner, &event_request("Climbing", 4, 18))
        .await
        .unwrap();

    let rename = UpdateCalendarEventRequest {
        title: Some("Bouldering".to_string()),
        ..UpdateCalendarEventRequest::default()
    };
    let result = service.update_calendar_event(stranger, &event.id, &rename).await;
    assert!(matches!(result, Err(RoutineError::EventNotFound { .. })));

    let renamed = service
        .update_calendar_event(owner, &event.id, &rename)
        .await
        .unwrap();
    assert_eq!(renamed.title, "Bouldering");
    assert_eq!(renamed.location.as_deref(), Some("Gym"));

    let result = service.delete_calendar_event(stranger, &event.id).await;
    assert!(matches!(result, Err(RoutineError::EventNotFound { .. })));

    service.delete_calendar_event(owner, &event.id).await.unwrap();
    assert!(calendar.is_empty());

    let result = service.delete_calendar_event(owner, &event.id).await;
    assert!(matches!(result, Err(RoutineError::EventNotFound { .. })));
}
