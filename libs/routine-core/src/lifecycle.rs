//! Task lifecycle and recurrence reset
//!
//! A task moves between `Pending` and `Completed` through [`Task::mark_complete`]
//! and [`Task::mark_pending`]. Recurring tasks return to `Pending` on their own
//! once their kind's period has elapsed; [`sweep`] applies that to a batch and
//! is safe to run as often as wanted.

use crate::models::{Task, TaskKind, TaskStatus};
use chrono::{DateTime, Duration, Utc};
use routine_common::{year_month, WEEKLY_RESET_DAYS};
use uuid::Uuid;

/// When a completed recurring task becomes due for reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRule {
    /// A calendar-day boundary has passed
    CalendarDay,
    /// At least this much time has elapsed
    Elapsed(Duration),
    /// The `(year, month)` pair differs
    CalendarMonth,
    /// Never resets automatically
    Never,
}

impl ResetRule {
    /// Whether a task last checked at `check_time` is due at `now`
    #[must_use]
    pub fn is_due(self, check_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            ResetRule::CalendarDay => check_time.date_naive() < now.date_naive(),
            ResetRule::Elapsed(period) => now - check_time >= period,
            ResetRule::CalendarMonth => year_month(&check_time) != year_month(&now),
            ResetRule::Never => false,
        }
    }
}

impl TaskKind {
    /// Reset rule for this kind
    #[must_use]
    pub fn reset_rule(self) -> ResetRule {
        match self {
            TaskKind::Daily => ResetRule::CalendarDay,
            TaskKind::Weekly => ResetRule::Elapsed(Duration::days(WEEKLY_RESET_DAYS)),
            TaskKind::Monthly => ResetRule::CalendarMonth,
            TaskKind::LongTerm | TaskKind::GymWorkout => ResetRule::Never,
        }
    }
}

impl Task {
    /// Mark the task completed at `now`; idempotent
    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Return the task to pending
    pub fn mark_pending(&mut self) {
        self.status = TaskStatus::Pending;
        self.completed_at = None;
    }

    /// Whether this recurring task must return to pending at `now`
    #[must_use]
    pub fn should_reset(&self, now: DateTime<Utc>) -> bool {
        if !self.is_recurring || self.status != TaskStatus::Completed {
            return false;
        }

        let Some(check_time) = self.last_reset_date.or(self.completed_at) else {
            return false;
        };

        self.kind.reset_rule().is_due(check_time, now)
    }

    /// Return to pending and record the reset instant.
    ///
    /// Resets unconditionally; callers check [`Task::should_reset`] first.
    pub fn reset_recurring(&mut self, now: DateTime<Utc>) {
        self.mark_pending();
        self.last_reset_date = Some(now);
    }
}

/// Reset every eligible recurring task, returning the ids that were reset
pub fn reset_eligible(tasks: &mut [Task], now: DateTime<Utc>) -> Vec<Uuid> {
    tasks
        .iter_mut()
        .filter(|task| task.should_reset(now))
        .map(|task| {
            task.reset_recurring(now);
            task.id
        })
        .collect()
}

/// Reset every eligible recurring task, returning how many were reset
pub fn sweep(tasks: &mut [Task], now: DateTime<Utc>) -> usize {
    reset_eligible(tasks, now).len()
}
