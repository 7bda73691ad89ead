//! Metric names and recording helpers
//!
//! Without the `observability` feature every helper is a no-op; callers never
//! need their own `cfg` guards. The binary installs the Prometheus recorder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TASKS_COMPLETED: &str = "routine_tasks_completed_total";
pub const TASKS_RESET: &str = "routine_tasks_reset_total";
pub const STREAKS_BROKEN: &str = "routine_streaks_broken_total";
pub const CALENDAR_SYNC_FAILURES: &str = "routine_calendar_sync_failures_total";

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    #[cfg(feature = "observability")]
    {
        metrics::describe_counter!(TASKS_COMPLETED, "Tasks moved to completed");
        metrics::describe_counter!(TASKS_RESET, "Recurring tasks returned to pending by a sweep");
        metrics::describe_counter!(STREAKS_BROKEN, "Streaks reset after a missed period");
        metrics::describe_counter!(
            CALENDAR_SYNC_FAILURES,
            "Calendar calls that failed on the completion path"
        );
    }
}

pub fn record_task_completed() {
    #[cfg(feature = "observability")]
    metrics::counter!(TASKS_COMPLETED).increment(1);
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn record_tasks_reset(count: usize) {
    #[cfg(feature = "observability")]
    metrics::counter!(TASKS_RESET).increment(u64::try_from(count).unwrap_or(u64::MAX));
}

#[cfg_attr(not(feature = "observability"), allow(unused_variables))]
pub fn record_streaks_broken(count: usize) {
    #[cfg(feature = "observability")]
    metrics::counter!(STREAKS_BROKEN).increment(u64::try_from(count).unwrap_or(u64::MAX));
}

pub fn record_calendar_sync_failure() {
    #[cfg(feature = "observability")]
    metrics::counter!(CALENDAR_SYNC_FAILURES).increment(1);
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub checks: HashMap<String, CheckResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: String,
    pub message: Option<String>,
    pub duration_ms: u64,
}

impl HealthStatus {
    /// "healthy" when every check is, otherwise "unhealthy"
    #[must_use]
    pub fn from_checks(
        checks: HashMap<String, CheckResult>,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        let healthy = checks.values().all(|check| check.status == "healthy");
        Self {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks,
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
