//! Away periods: range validation, overlap guard and the active-task filter

use crate::error::{Result, RoutineError};
use crate::models::{AwayPeriod, Task};
use chrono::NaiveDate;
use uuid::Uuid;

impl AwayPeriod {
    /// Create an active period.
    ///
    /// # Errors
    /// Returns `RoutineError::InvalidRange` when `end_date` precedes `start_date`
    pub fn new(owner_id: Uuid, start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        validate_range(start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            start_date,
            end_date,
            is_active: true,
        })
    }

    /// Active and `today` falls inside the inclusive range
    #[must_use]
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.is_active && self.start_date <= today && today <= self.end_date
    }

    /// Inclusive interval overlap
    #[must_use]
    pub fn overlaps(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        self.start_date <= end_date && self.end_date >= start_date
    }

    /// Stop the period early; it stays on record
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

/// # Errors
/// Returns `RoutineError::InvalidRange` when `end` precedes `start`
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(RoutineError::InvalidRange { start, end });
    }
    Ok(())
}

/// First active period in `existing` overlapping `[start, end]`, ignoring `exclude`
#[must_use]
pub fn find_overlap<'a>(
    existing: &'a [AwayPeriod],
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<Uuid>,
) -> Option<&'a AwayPeriod> {
    existing
        .iter()
        .filter(|period| period.is_active && Some(period.id) != exclude)
        .find(|period| period.overlaps(start, end))
}

/// Reject `[start, end]` if it overlaps an active period.
///
/// # Errors
/// Returns `RoutineError::InvalidRange` for a reversed range and
/// `RoutineError::Conflict` naming the first overlapping period
pub fn ensure_no_overlap(
    existing: &[AwayPeriod],
    start: NaiveDate,
    end: NaiveDate,
    exclude: Option<Uuid>,
) -> Result<()> {
    validate_range(start, end)?;
    match find_overlap(existing, start, end, exclude) {
        Some(conflict) => Err(RoutineError::Conflict {
            conflicting_id: conflict.id,
        }),
        None => Ok(()),
    }
}

/// First period that covers `today`
#[must_use]
pub fn current_period(periods: &[AwayPeriod], today: NaiveDate) -> Option<&AwayPeriod> {
    periods.iter().find(|period| period.is_current(today))
}

/// Whether `task` is paused by a current away period
#[must_use]
pub fn is_paused(task: &Task, periods: &[AwayPeriod], today: NaiveDate) -> bool {
    task.pause_on_away && current_period(periods, today).is_some()
}

/// Read-time filter hiding pausable tasks while away; no task is modified
#[must_use]
pub fn active_tasks(tasks: Vec<Task>, periods: &[AwayPeriod], today: NaiveDate) -> Vec<Task> {
    if current_period(periods, today).is_none() {
        return tasks;
    }
    tasks.into_iter().filter(|task| !task.pause_on_away).collect()
}
