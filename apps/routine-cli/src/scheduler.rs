//! Periodic sweep over every user while serving

use routine_core::RoutineService;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

/// Sweep all users every `every`, starting immediately.
///
/// Per-user failures are logged by the sweep itself; a failure to list users
/// is logged here and the loop carries on.
#[must_use]
pub fn spawn_sweep_scheduler(service: RoutineService, every: Duration) -> JoinHandle<()> {
    info!("Starting sweep scheduler with interval: {:?}", every);

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match service.sweep_all().await {
                Ok(summary) if summary.reset_count > 0 || summary.streaks_broken > 0 => info!(
                    users = summary.users,
                    reset_count = summary.reset_count,
                    streaks_broken = summary.streaks_broken,
                    failed_users = summary.failed_users,
                    "Scheduled sweep finished"
                ),
                Ok(summary) => debug!(users = summary.users, "Scheduled sweep found nothing to do"),
                Err(e) => error!("Scheduled sweep failed: {e}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use routine_core::test_utils::{
        create_test_database_and_connect, create_test_service, create_test_user, task_request, utc,
    };
    use routine_core::{TaskKind, TaskStatus};

    #[tokio::test]
    async fn test_scheduler_resets_due_tasks() {
        let (db, _temp_file) = create_test_database_and_connect().await.unwrap();
        let owner = create_test_user(&db, "ada").await.unwrap();
        let (service, clock) = create_test_service(db, utc(2024, 3, 1, 10, 0));

        let task = service
            .create_task(owner, &task_request("Floss", TaskKind::Daily, true))
            .await
            .unwrap();
        service.complete_task(owner, task.id).await.unwrap();
        clock.set(utc(2024, 3, 2, 10, 0));

        let handle = spawn_sweep_scheduler(service.clone(), Duration::from_millis(10));

        let mut status = TaskStatus::Completed;
        for _ in 0..100 {
            status = service.get_task(owner, task.id).await.unwrap().status;
            if status == TaskStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(status, TaskStatus::Pending);
    }
}
