//! Orchestration of task transitions, streak updates, sweeps and calendar sync
//!
//! Each operation is one short read-modify-write against the [`Store`]. The
//! calendar collaborator is optional; on the completion path its failures are
//! logged and counted but never fail the transition.

use crate::away::{active_tasks, current_period};
use crate::calendar::{
    CalendarEvent, CalendarEventList, CalendarEventQuery, CalendarSync,
    CreateCalendarEventRequest, UpdateCalendarEventRequest,
};
use crate::clock::Clock;
use crate::error::{Result, RoutineError};
use crate::lifecycle::reset_eligible;
use crate::models::{
    CreateTaskRequest, Principal, Streak, SweepReport, Task, TaskFilters, TaskList, TaskStatus,
    UpdateTaskRequest,
};
use crate::observability;
use crate::store::Store;
use chrono::{DateTime, NaiveDate, Utc};
use routine_common::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Totals of a sweep over every user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub users: usize,
    pub reset_count: usize,
    pub streaks_broken: usize,
    pub failed_users: usize,
}

/// Entry point for every lifecycle operation
#[derive(Clone)]
pub struct RoutineService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    calendar: Option<Arc<dyn CalendarSync>>,
}

impl std::fmt::Debug for RoutineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineService")
            .field("clock", &self.clock)
            .field("calendar", &self.calendar.is_some())
            .finish_non_exhaustive()
    }
}

impl RoutineService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            calendar: None,
        }
    }

    /// Attach a calendar collaborator
    #[must_use]
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarSync>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    #[must_use]
    pub fn calendar_enabled(&self) -> bool {
        self.calendar.is_some()
    }

    /// Create a pending task with an empty streak
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad request, or a store error
    #[instrument(skip(self, request), fields(user_id = %owner.user_id))]
    pub async fn create_task(&self, owner: Principal, request: &CreateTaskRequest) -> Result<Task> {
        request.validate()?;

        let now = self.clock.now();
        let mut task = Task::new(
            owner.user_id,
            request.title.clone(),
            request.kind.unwrap_or_default(),
            now,
        );
        task.description = request.description.clone();
        task.recurrence = request.recurrence.clone();
        task.is_recurring = request.is_recurring.unwrap_or(false);
        task.recurrence_time = request.recurrence_time;
        task.recurrence_day_of_week = request.recurrence_day_of_week;
        task.recurrence_day_of_month = request.recurrence_day_of_month;
        task.pause_on_away = request.pause_on_away.unwrap_or(true);
        task.due_date = request.due_date;

        let streak = Streak::new(owner.user_id, task.id);
        self.store.insert_task(&task, &streak).await?;
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` for an unknown or foreign id
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn get_task(&self, owner: Principal, id: Uuid) -> Result<Task> {
        self.store.load_task(owner, id).await
    }

    /// Partial update; a status change goes through the completion path or
    /// `mark_pending` so `completed_at` stays consistent
    ///
    /// # Errors
    ///
    /// Returns a validation error or `RoutineError::TaskNotFound`
    #[instrument(skip(self, request), fields(user_id = %owner.user_id))]
    pub async fn update_task(
        &self,
        owner: Principal,
        id: Uuid,
        request: &UpdateTaskRequest,
    ) -> Result<Task> {
        request.validate()?;
        let mut task = self.store.load_task(owner, id).await?;

        if let Some(title) = &request.title {
            task.title.clone_from(title);
        }
        if request.description.is_some() {
            task.description.clone_from(&request.description);
        }
        if let Some(kind) = request.kind {
            task.kind = kind;
        }
        if request.recurrence.is_some() {
            task.recurrence.clone_from(&request.recurrence);
        }
        if let Some(is_recurring) = request.is_recurring {
            task.is_recurring = is_recurring;
        }
        if request.recurrence_time.is_some() {
            task.recurrence_time = request.recurrence_time;
        }
        if request.recurrence_day_of_week.is_some() {
            task.recurrence_day_of_week = request.recurrence_day_of_week;
        }
        if request.recurrence_day_of_month.is_some() {
            task.recurrence_day_of_month = request.recurrence_day_of_month;
        }
        if let Some(pause_on_away) = request.pause_on_away {
            task.pause_on_away = pause_on_away;
        }
        if request.due_date.is_some() {
            task.due_date = request.due_date;
        }

        match request.status {
            Some(TaskStatus::Completed) if task.status != TaskStatus::Completed => {
                return self.complete_loaded(owner, task).await;
            }
            Some(TaskStatus::Pending) => task.mark_pending(),
            Some(TaskStatus::Suggested) => {
                task.mark_pending();
                task.status = TaskStatus::Suggested;
            }
            _ => {}
        }

        self.store.save_task(&task).await?;
        Ok(task)
    }

    /// Mark a task completed, advance its streak, then push it to the calendar
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` or a store error; calendar errors
    /// are not propagated
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn complete_task(&self, owner: Principal, id: Uuid) -> Result<Task> {
        let task = self.store.load_task(owner, id).await?;
        self.complete_loaded(owner, task).await
    }

    async fn complete_loaded(&self, owner: Principal, mut task: Task) -> Result<Task> {
        let now = self.clock.now();
        task.mark_complete(now);

        let streak = self.on_task_completed(owner, &task, now).await?;
        self.store.save_task_with_streak(&task, &streak).await?;
        observability::record_task_completed();
        info!(
            task_id = %task.id,
            current_streak = streak.current_streak,
            "Task completed"
        );

        self.push_to_calendar(&mut task).await;
        Ok(task)
    }

    /// Streak after a completion at `now`; counts at most once per period.
    ///
    /// A streak whose period lapsed since the last completion is broken
    /// first, with the same away-period exemption as [`Self::on_sweep`].
    /// The caller persists the result.
    ///
    /// # Errors
    ///
    /// Returns a store error
    pub async fn on_task_completed(
        &self,
        owner: Principal,
        task: &Task,
        now: DateTime<Utc>,
    ) -> Result<Streak> {
        let today = now.date_naive();
        let mut streak = self
            .store
            .load_streak(owner, task.id)
            .await?
            .unwrap_or_else(|| Streak::new(owner.user_id, task.id));

        let paused = task.pause_on_away && {
            let periods = self.store.load_active_away_periods(owner).await?;
            current_period(&periods, today).is_some()
        };
        if !paused && streak.break_if_lapsed(task.kind, today) {
            observability::record_streaks_broken(1);
            debug!(task_id = %task.id, "Streak lapsed before this completion");
        }

        if !streak.record_completion(task.kind, now) {
            debug!(task_id = %task.id, "Completion already counted for this period");
        }
        Ok(streak)
    }

    async fn push_to_calendar(&self, task: &mut Task) {
        let Some(calendar) = &self.calendar else {
            return;
        };

        match calendar.upsert_event(task).await {
            Ok(event_ref) => {
                if task.external_event_ref.as_deref() == Some(event_ref.as_str()) {
                    return;
                }
                task.external_event_ref = Some(event_ref);
                if let Err(e) = self.store.save_task(task).await {
                    warn!(task_id = %task.id, "Failed to store calendar event ref: {e}");
                }
            }
            Err(e) => {
                observability::record_calendar_sync_failure();
                warn!(task_id = %task.id, "Calendar sync failed: {e}");
            }
        }
    }

    /// Return a task to pending; its streak is left alone
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` or a store error
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn uncomplete_task(&self, owner: Principal, id: Uuid) -> Result<Task> {
        let mut task = self.store.load_task(owner, id).await?;
        task.mark_pending();
        self.store.save_task(&task).await?;
        Ok(task)
    }

    /// Streak of an owned task
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` for an unknown or foreign task
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn get_streak(&self, owner: Principal, task_id: Uuid) -> Result<Streak> {
        self.store.load_task(owner, task_id).await?;
        Ok(self
            .store
            .load_streak(owner, task_id)
            .await?
            .unwrap_or_else(|| Streak::new(owner.user_id, task_id)))
    }

    /// Sweep, then list one page of the owner's tasks
    ///
    /// # Errors
    ///
    /// Returns a validation error for a limit outside 1..=100, or a store error
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn list_tasks(&self, owner: Principal, filters: &TaskFilters) -> Result<TaskList> {
        let limit = filters.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(RoutineError::validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
            )));
        }
        let skip = filters.skip.unwrap_or(0);

        self.sweep(owner).await?;

        let mut tasks = self.store.load_tasks(owner, filters.status).await?;
        if filters.active_only {
            let periods = self.store.load_active_away_periods(owner).await?;
            tasks = active_tasks(tasks, &periods, self.clock.today());
        }

        let total = tasks.len();
        Ok(TaskList {
            tasks: tasks.into_iter().skip(skip).take(limit).collect(),
            total,
            page: skip / limit + 1,
            page_size: limit,
        })
    }

    /// Reset the owner's due recurring tasks, then break lapsed streaks
    ///
    /// Safe to call any number of times.
    ///
    /// # Errors
    ///
    /// Returns a store error
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn sweep(&self, owner: Principal) -> Result<SweepReport> {
        let now = self.clock.now();
        let mut tasks = self.store.load_recurring_tasks(owner).await?;

        let reset_ids = reset_eligible(&mut tasks, now);
        for task in tasks.iter().filter(|task| reset_ids.contains(&task.id)) {
            self.store.save_task(task).await?;
        }

        let streaks_broken = self.on_sweep(owner, &tasks, now.date_naive()).await?;

        observability::record_tasks_reset(reset_ids.len());
        observability::record_streaks_broken(streaks_broken);
        if !reset_ids.is_empty() || streaks_broken > 0 {
            info!(
                reset_count = reset_ids.len(),
                streaks_broken, "Sweep finished"
            );
        }

        Ok(SweepReport {
            reset_count: reset_ids.len(),
            streaks_broken,
        })
    }

    /// Break the streak of every task whose period lapsed without a
    /// completion; pausable tasks are spared while the owner is away.
    /// Returns how many streaks were broken.
    ///
    /// # Errors
    ///
    /// Returns a store error
    pub async fn on_sweep(&self, owner: Principal, tasks: &[Task], today: NaiveDate) -> Result<usize> {
        let periods = self.store.load_active_away_periods(owner).await?;
        let away = current_period(&periods, today).is_some();

        let mut broken = 0;
        for task in tasks {
            if away && task.pause_on_away {
                continue;
            }
            let Some(mut streak) = self.store.load_streak(owner, task.id).await? else {
                continue;
            };
            if streak.break_if_lapsed(task.kind, today) {
                self.store.save_streak(&streak).await?;
                broken += 1;
            }
        }
        Ok(broken)
    }

    /// Sweep every user; a failing user is logged and skipped
    ///
    /// # Errors
    ///
    /// Returns a store error only if the user list cannot be read
    #[instrument(skip(self))]
    pub async fn sweep_all(&self) -> Result<SweepSummary> {
        let mut summary = SweepSummary::default();
        for user_id in self.store.load_user_ids().await? {
            match self.sweep(Principal::new(user_id)).await {
                Ok(report) => {
                    summary.users += 1;
                    summary.reset_count += report.reset_count;
                    summary.streaks_broken += report.streaks_broken;
                }
                Err(e) => {
                    summary.failed_users += 1;
                    error!(%user_id, "Sweep failed: {e}");
                }
            }
        }
        Ok(summary)
    }

    /// Create or update the task's calendar event and store its ref
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::Calendar` when no calendar is configured or the
    /// remote call fails
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn sync_task_to_calendar(&self, owner: Principal, id: Uuid) -> Result<Task> {
        let calendar = self.require_calendar()?;
        let mut task = self.store.load_task(owner, id).await?;

        let event_ref = calendar.upsert_event(&task).await?;
        task.external_event_ref = Some(event_ref);
        self.store.save_task(&task).await?;
        Ok(task)
    }

    /// Delete the task's calendar event; the ref is cleared only when the
    /// delete succeeds. A task without a ref is already unsynced.
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::Calendar` when no calendar is configured or the
    /// remote call fails
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn unsync_task(&self, owner: Principal, id: Uuid) -> Result<bool> {
        let mut task = self.store.load_task(owner, id).await?;
        let Some(event_ref) = task.external_event_ref.clone() else {
            return Ok(true);
        };

        let calendar = self.require_calendar()?;
        if !calendar.delete_event(owner.user_id, &event_ref).await? {
            return Ok(false);
        }

        task.external_event_ref = None;
        self.store.save_task(&task).await?;
        Ok(true)
    }

    /// Events in the owner's calendar within the query window
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad window or `max_results`, and
    /// `RoutineError::Calendar` when no calendar is configured or the remote
    /// call fails
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn list_calendar_events(
        &self,
        owner: Principal,
        query: &CalendarEventQuery,
    ) -> Result<CalendarEventList> {
        let search = query.resolve(self.clock.now())?;
        let calendar = self.require_calendar()?;
        let events = calendar.list_events(owner.user_id, &search).await?;
        Ok(events.into())
    }

    /// Create a free-standing event in the owner's calendar
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad request, and
    /// `RoutineError::Calendar` when no calendar is configured or the remote
    /// call fails
    #[instrument(skip(self, request), fields(user_id = %owner.user_id))]
    pub async fn create_calendar_event(
        &self,
        owner: Principal,
        request: &CreateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        request.validate()?;
        let calendar = self.require_calendar()?;
        let event = calendar.create_event(owner.user_id, request).await?;
        info!(event_id = %event.id, "Created calendar event");
        Ok(event)
    }

    /// # Errors
    ///
    /// Returns `RoutineError::EventNotFound` for an unknown event, a
    /// validation error for a bad request, and `RoutineError::Calendar` when
    /// no calendar is configured or the remote call fails
    #[instrument(skip(self, request), fields(user_id = %owner.user_id))]
    pub async fn update_calendar_event(
        &self,
        owner: Principal,
        event_id: &str,
        request: &UpdateCalendarEventRequest,
    ) -> Result<CalendarEvent> {
        request.validate()?;
        let calendar = self.require_calendar()?;
        calendar.update_event(owner.user_id, event_id, request).await
    }

    /// # Errors
    ///
    /// Returns `RoutineError::EventNotFound` when the calendar has no such
    /// event for the owner
    #[instrument(skip(self), fields(user_id = %owner.user_id))]
    pub async fn delete_calendar_event(&self, owner: Principal, event_id: &str) -> Result<()> {
        let calendar = self.require_calendar()?;
        if !calendar.delete_event(owner.user_id, event_id).await? {
            return Err(RoutineError::EventNotFound {
                id: event_id.to_string(),
            });
        }
        Ok(())
    }

    fn require_calendar(&self) -> Result<&Arc<dyn CalendarSync>> {
        self.calendar
            .as_ref()
            .ok_or_else(|| RoutineError::calendar("Calendar sync is not configured"))
    }
}
