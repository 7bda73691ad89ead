//! HTTP API
//!
//! Every `/api` route except user registration requires the `X-User-Id`
//! header; see [`crate::principal::AuthUser`].

use crate::api_error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::health::health_handler;
use crate::principal::AuthUser;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, patch, post, put},
    Router,
};
use routine_core::{
    current_period, AwayPeriod, AwayPeriodList, CalendarEvent, CalendarEventList,
    CalendarEventQuery, CalendarStatus, CreateAwayPeriodRequest, CreateCalendarEventRequest,
    CreateGymProgressRequest, CreateTaskRequest, CreateUserRequest, GoogleTokens,
    GymProgressSummary, RoutineConfig, RoutineDatabase, RoutineService, Streak, SweepReport, Task,
    TaskFilters, TaskList, UpdateAwayPeriodRequest, UpdateCalendarEventRequest,
    UpdateTaskRequest, User,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, instrument};
use uuid::Uuid;

#[cfg(feature = "observability")]
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: RoutineService,
    pub db: Arc<RoutineDatabase>,
    #[cfg(feature = "observability")]
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn new(service: RoutineService, db: Arc<RoutineDatabase>) -> Self {
        Self {
            service,
            db,
            #[cfg(feature = "observability")]
            metrics: None,
        }
    }

    /// Serve `/metrics` from this handle
    #[cfg(feature = "observability")]
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Outcome of removing a task's calendar event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsyncResponse {
    pub success: bool,
}

/// Build the router with all routes and middleware
pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health_handler))
        // Users
        .route("/api/users", post(create_user))
        .route("/api/users/me", get(get_me).delete(delete_me))
        .route("/api/users/me/google-token", put(set_google_token))
        // Tasks
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/sweep", post(sweep_tasks))
        .route(
            "/api/tasks/:id",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/:id/complete", post(complete_task))
        .route("/api/tasks/:id/uncomplete", post(uncomplete_task))
        .route("/api/tasks/:id/streak", get(get_streak))
        .route(
            "/api/tasks/:id/calendar",
            post(sync_calendar).delete(unsync_calendar),
        )
        // Calendar
        .route("/api/calendar/status", get(calendar_status))
        .route(
            "/api/calendar/events",
            get(list_calendar_events).post(create_calendar_event),
        )
        .route(
            "/api/calendar/events/:id",
            patch(update_calendar_event).delete(delete_calendar_event),
        )
        // Away periods
        .route(
            "/api/away-periods",
            get(list_away_periods).post(create_away_period),
        )
        .route(
            "/api/away-periods/:id",
            get(get_away_period)
                .patch(update_away_period)
                .delete(delete_away_period),
        )
        .route("/api/away-periods/:id/deactivate", post(deactivate_away_period))
        // Gym progress
        .route("/api/gym-progress", get(list_gym_progress).post(create_gym_progress))
        .route(
            "/api/gym-progress/:id",
            get(get_gym_progress).delete(delete_gym_progress),
        );

    #[cfg(feature = "observability")]
    let app = app.route("/metrics", get(crate::metrics::metrics_handler));

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails
#[instrument(skip(config, state))]
pub async fn serve(config: &RoutineConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}

// ----- users -----

async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state
        .db
        .create_user(&request, state.service.clock().now())
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_me(State(state): State<AppState>, AuthUser(owner): AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.db.get_user(owner.user_id).await?))
}

async fn delete_me(State(state): State<AppState>, AuthUser(owner): AuthUser) -> ApiResult<StatusCode> {
    state.db.delete_user(owner.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_google_token(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(tokens): ApiJson<GoogleTokens>,
) -> ApiResult<StatusCode> {
    state.db.set_google_tokens(owner.user_id, &tokens).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- tasks -----

async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiQuery(filters): ApiQuery<TaskFilters>,
) -> ApiResult<Json<TaskList>> {
    Ok(Json(state.service.list_tasks(owner, &filters).await?))
}

async fn create_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.service.create_task(owner, &request).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.get_task(owner, id).await?))
}

async fn update_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.update_task(owner, id, &request).await?))
}

async fn delete_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_task(owner.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.complete_task(owner, id).await?))
}

async fn uncomplete_task(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.uncomplete_task(owner, id).await?))
}

async fn get_streak(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Streak>> {
    Ok(Json(state.service.get_streak(owner, id).await?))
}

async fn sync_calendar(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.sync_task_to_calendar(owner, id).await?))
}

async fn unsync_calendar(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UnsyncResponse>> {
    let success = state.service.unsync_task(owner, id).await?;
    Ok(Json(UnsyncResponse { success }))
}

async fn sweep_tasks(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<SweepReport>> {
    Ok(Json(state.service.sweep(owner).await?))
}

// ----- calendar -----

async fn calendar_status(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<CalendarStatus>> {
    let user = state.db.get_user(owner.user_id).await?;
    Ok(Json(CalendarStatus::from(&user)))
}

async fn list_calendar_events(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiQuery(query): ApiQuery<CalendarEventQuery>,
) -> ApiResult<Json<CalendarEventList>> {
    Ok(Json(state.service.list_calendar_events(owner, &query).await?))
}

async fn create_calendar_event(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<CreateCalendarEventRequest>,
) -> ApiResult<(StatusCode, Json<CalendarEvent>)> {
    let event = state.service.create_calendar_event(owner, &request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_calendar_event(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateCalendarEventRequest>,
) -> ApiResult<Json<CalendarEvent>> {
    Ok(Json(
        state.service.update_calendar_event(owner, &id, &request).await?,
    ))
}

async fn delete_calendar_event(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_calendar_event(owner, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- away periods -----

async fn list_away_periods(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<AwayPeriodList>> {
    let away_periods = state.db.list_away_periods(owner.user_id).await?;
    let current_away_period =
        current_period(&away_periods, state.service.clock().today()).cloned();
    Ok(Json(AwayPeriodList {
        away_periods,
        current_away_period,
    }))
}

async fn create_away_period(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<CreateAwayPeriodRequest>,
) -> ApiResult<(StatusCode, Json<AwayPeriod>)> {
    let period = state.db.create_away_period(owner.user_id, &request).await?;
    Ok((StatusCode::CREATED, Json(period)))
}

async fn get_away_period(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<AwayPeriod>> {
    Ok(Json(state.db.get_away_period(owner.user_id, id).await?))
}

async fn update_away_period(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateAwayPeriodRequest>,
) -> ApiResult<Json<AwayPeriod>> {
    Ok(Json(
        state.db.update_away_period(owner.user_id, id, &request).await?,
    ))
}

async fn deactivate_away_period(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<AwayPeriod>> {
    Ok(Json(state.db.deactivate_away_period(owner.user_id, id).await?))
}

async fn delete_away_period(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_away_period(owner.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----- gym progress -----

async fn list_gym_progress(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
) -> ApiResult<Json<Vec<GymProgressSummary>>> {
    let entries = state.db.list_gym_progress(owner.user_id).await?;
    Ok(Json(entries.into_iter().map(GymProgressSummary::from).collect()))
}

async fn create_gym_progress(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiJson(request): ApiJson<CreateGymProgressRequest>,
) -> ApiResult<(StatusCode, Json<GymProgressSummary>)> {
    let entry = state
        .db
        .create_gym_progress(owner.user_id, &request, state.service.clock().today())
        .await?;
    Ok((StatusCode::CREATED, Json(entry.into())))
}

async fn get_gym_progress(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<GymProgressSummary>> {
    let entry = state.db.get_gym_progress(owner.user_id, id).await?;
    Ok(Json(entry.into()))
}

async fn delete_gym_progress(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_gym_progress(owner.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
