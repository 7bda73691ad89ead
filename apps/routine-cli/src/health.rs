//! Health checks, for the `/health` endpoint and the `health` command

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use routine_core::{CheckResult, HealthStatus, RoutineDatabase};
use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;
use tracing::instrument;

/// Run every check against the database
#[instrument(skip(db))]
pub async fn run_checks(db: &RoutineDatabase) -> HealthStatus {
    let mut checks = HashMap::new();
    checks.insert("database".to_string(), database_check(db).await);
    HealthStatus::from_checks(checks, chrono::Utc::now())
}

async fn database_check(db: &RoutineDatabase) -> CheckResult {
    let started = Instant::now();
    let connected = db.is_connected().await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if connected {
        CheckResult {
            status: "healthy".to_string(),
            message: Some("Connection successful".to_string()),
            duration_ms,
        }
    } else {
        CheckResult {
            status: "unhealthy".to_string(),
            message: Some("Database is not reachable".to_string()),
            duration_ms,
        }
    }
}

/// `GET /health`; 503 when a check fails
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = run_checks(&state.db).await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

/// Print a health report for the `health` command
///
/// # Errors
/// Returns an error if the database is unreachable or writing fails
pub async fn print_health<W: Write>(db: &RoutineDatabase, writer: &mut W) -> anyhow::Result<()> {
    let status = run_checks(db).await;
    if !status.is_healthy() {
        anyhow::bail!("Database is not connected");
    }

    let stats = db.get_stats().await?;
    writeln!(writer, "Database connection successful")?;
    writeln!(
        writer,
        "  {} users, {} tasks, {} away periods, {} gym entries",
        stats.user_count, stats.task_count, stats.away_period_count, stats.gym_entry_count
    )?;
    writeln!(writer, "All systems operational (v{})", status.version)?;
    Ok(())
}
