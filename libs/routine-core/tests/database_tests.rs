//! Persistence: users, ownership scoping, cascades, gym log and pagination
#![cfg(feature = "test-utils")]

use chrono::{NaiveDate, Utc};
use routine_core::{
    test_utils::{create_test_database_and_connect, create_test_service, create_test_user, task_request, utc},
    CreateGymProgressRequest, CreateUserRequest, GoogleTokens, GymProgressSummary, RoutineDatabase,
    RoutineError, Task, TaskFilters, TaskKind, TaskStatus,
};
use uuid::Uuid;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
async fn test_in_memory_database() {
    let db = RoutineDatabase::from_connection_string("sqlite::memory:")
        .await
        .unwrap();
    assert!(db.is_connected().await);

    let stats = db.get_stats().await.unwrap();
    assert_eq!(stats.user_count, 0);
    assert_eq!(stats.task_count, 0);
}

#[tokio::test]
async fn test_schema_bootstrap_is_idempotent() {
    let (db, temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    drop(db);

    let reopened = RoutineDatabase::new(temp_file.path()).await.unwrap();
    assert!(reopened.user_exists(owner.user_id).await.unwrap());
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let request = CreateUserRequest {
        email: "ada@example.com".into(),
        name: "Ada".into(),
    };

    let user = db.create_user(&request, Utc::now()).await.unwrap();
    assert!(!user.calendar_authorized);

    let result = db.create_user(&request, Utc::now()).await;
    assert!(matches!(result, Err(RoutineError::Validation { .. })));
}

#[tokio::test]
async fn test_invalid_user_request() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let result = db
        .create_user(
            &CreateUserRequest {
                email: "not-an-email".into(),
                name: "Ada".into(),
            },
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(RoutineError::Validation { .. })));
}

#[tokio::test]
async fn test_google_tokens_mark_user_authorized() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    assert!(db.get_google_tokens(owner.user_id).await.unwrap().is_none());

    let tokens = GoogleTokens {
        access_token: "ya29.token".into(),
        refresh_token: Some("1//refresh".into()),
    };
    db.set_google_tokens(owner.user_id, &tokens).await.unwrap();

    assert_eq!(db.get_google_tokens(owner.user_id).await.unwrap(), Some(tokens));
    assert!(db.get_user(owner.user_id).await.unwrap().calendar_authorized);

    let unknown = db
        .set_google_tokens(
            Uuid::new_v4(),
            &GoogleTokens {
                access_token: "x".into(),
                refresh_token: None,
            },
        )
        .await;
    assert!(matches!(unknown, Err(RoutineError::UserNotFound { .. })));
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let ada = create_test_user(&db, "ada").await.unwrap();
    let grace = create_test_user(&db, "grace").await.unwrap();
    let (service, _clock) = create_test_service(db.clone(), utc(2024, 3, 1, 10, 0));

    for owner in [ada, grace] {
        service
            .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
            .await
            .unwrap();
        db.create_away_period(
            owner.user_id,
            &routine_core::CreateAwayPeriodRequest {
                start_date: day(2024, 4, 1),
                end_date: day(2024, 4, 5),
            },
        )
        .await
        .unwrap();
        db.create_gym_progress(
            owner.user_id,
            &CreateGymProgressRequest::default(),
            day(2024, 3, 1),
        )
        .await
        .unwrap();
    }

    db.delete_user(ada.user_id).await.unwrap();

    let stats = db.get_stats().await.unwrap();
    assert_eq!(stats.user_count, 1);
    assert_eq!(stats.task_count, 1);
    assert_eq!(stats.away_period_count, 1);
    assert_eq!(stats.gym_entry_count, 1);
    assert!(matches!(
        db.get_user(ada.user_id).await,
        Err(RoutineError::UserNotFound { .. })
    ));
    assert!(matches!(
        db.delete_user(ada.user_id).await,
        Err(RoutineError::UserNotFound { .. })
    ));
}

// ============================================================================
// Tasks
// ============================================================================

#[tokio::test]
async fn test_task_round_trips_all_fields() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let now = utc(2024, 3, 1, 10, 0);

    let mut task = Task::new(owner.user_id, "Bins", TaskKind::Weekly, now).recurring(true);
    task.description = Some("Green bin first".into());
    task.recurrence = Some("every tuesday".into());
    task.recurrence_time = chrono::NaiveTime::from_hms_opt(19, 30, 0);
    task.recurrence_day_of_week = Some(1);
    task.due_date = Some(utc(2024, 3, 5, 19, 30));
    task.pause_on_away = false;
    task.external_event_ref = Some("evt123".into());
    let streak = routine_core::Streak::new(owner.user_id, task.id);

    db.insert_task(&task, &streak).await.unwrap();

    assert_eq!(db.get_task(owner.user_id, task.id).await.unwrap(), task);
    assert_eq!(db.get_streak(owner.user_id, task.id).await.unwrap(), Some(streak));
}

#[tokio::test]
async fn test_foreign_task_is_not_found() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let ada = create_test_user(&db, "ada").await.unwrap();
    let grace = create_test_user(&db, "grace").await.unwrap();
    let (service, _clock) = create_test_service(db.clone(), utc(2024, 3, 1, 10, 0));

    let task = service
        .create_task(ada, &task_request("Private", TaskKind::Daily, false))
        .await
        .unwrap();

    assert!(matches!(
        service.get_task(grace, task.id).await,
        Err(RoutineError::TaskNotFound { .. })
    ));
    assert!(service.complete_task(grace, task.id).await.unwrap_err().is_not_found());
    assert!(db.delete_task(grace.user_id, task.id).await.unwrap_err().is_not_found());

    let graces = service.list_tasks(grace, &TaskFilters::default()).await.unwrap();
    assert_eq!(graces.total, 0);

    // Untouched for the real owner
    assert_eq!(
        service.get_task(ada, task.id).await.unwrap().status,
        TaskStatus::Pending
    );
}

#[tokio::test]
async fn test_delete_task_removes_streak() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let (service, _clock) = create_test_service(db.clone(), utc(2024, 3, 1, 10, 0));

    let task = service
        .create_task(owner, &task_request("Stretch", TaskKind::Daily, true))
        .await
        .unwrap();
    service.complete_task(owner, task.id).await.unwrap();

    db.delete_task(owner.user_id, task.id).await.unwrap();
    assert!(db.get_streak(owner.user_id, task.id).await.unwrap().is_none());
    assert!(db.get_task(owner.user_id, task.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_pagination() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let (service, _clock) = create_test_service(db, utc(2024, 3, 1, 10, 0));

    for i in 0..5 {
        service
            .create_task(owner, &task_request(&format!("Task {i}"), TaskKind::Daily, false))
            .await
            .unwrap();
    }

    let page = service
        .list_tasks(
            owner,
            &TaskFilters {
                skip: Some(2),
                limit: Some(2),
                ..TaskFilters::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 2);
    // Newest first
    let titles: Vec<_> = page.tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["Task 2", "Task 1"]);

    let default_page = service.list_tasks(owner, &TaskFilters::default()).await.unwrap();
    assert_eq!(default_page.page, 1);
    assert_eq!(default_page.page_size, 50);
    assert_eq!(default_page.tasks.len(), 5);
}

#[tokio::test]
async fn test_list_rejects_bad_limit() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();
    let (service, _clock) = create_test_service(db, utc(2024, 3, 1, 10, 0));

    for limit in [0, 101] {
        let result = service
            .list_tasks(
                owner,
                &TaskFilters {
                    limit: Some(limit),
                    ..TaskFilters::default()
                },
            )
            .await;
        assert!(matches!(result, Err(RoutineError::Validation { .. })));
    }
}

// ============================================================================
// Gym progress
// ============================================================================

#[tokio::test]
async fn test_gym_progress_log() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();

    let older = db
        .create_gym_progress(
            owner.user_id,
            &CreateGymProgressRequest {
                date: Some(day(2024, 2, 1)),
                squat_1rm: Some(140.0),
                bench_1rm: Some(100.0),
                deadlift_1rm: Some(180.0),
                ..CreateGymProgressRequest::default()
            },
            day(2024, 3, 1),
        )
        .await
        .unwrap();
    let newer = db
        .create_gym_progress(
            owner.user_id,
            &CreateGymProgressRequest {
                bodyweight: Some(82.5),
                notes: Some("deload".into()),
                ..CreateGymProgressRequest::default()
            },
            day(2024, 3, 1),
        )
        .await
        .unwrap();
    assert_eq!(newer.date, day(2024, 3, 1));

    let entries = db.list_gym_progress(owner.user_id).await.unwrap();
    assert_eq!(entries.iter().map(|e| e.id).collect::<Vec<_>>(), [newer.id, older.id]);

    let summary = GymProgressSummary::from(older.clone());
    assert_eq!(summary.total, Some(420.0));
    assert!(!summary.is_1000lb_club);
    assert!(GymProgressSummary::from(newer.clone()).total.is_none());

    db.delete_gym_progress(owner.user_id, newer.id).await.unwrap();
    assert!(matches!(
        db.get_gym_progress(owner.user_id, newer.id).await,
        Err(RoutineError::GymEntryNotFound { .. })
    ));
    assert_eq!(db.get_gym_progress(owner.user_id, older.id).await.unwrap(), older);
}

#[tokio::test]
async fn test_gym_progress_rejects_negative_weight() {
    let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
    let owner = create_test_user(&db, "ada").await.unwrap();

    let result = db
        .create_gym_progress(
            owner.user_id,
            &CreateGymProgressRequest {
                squat_1rm: Some(-5.0),
                ..CreateGymProgressRequest::default()
            },
            day(2024, 3, 1),
        )
        .await;
    assert!(matches!(result, Err(RoutineError::Validation { .. })));
}
