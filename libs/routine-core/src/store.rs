//! Persistence seam used by [`crate::service::RoutineService`]

use crate::database::RoutineDatabase;
use crate::error::Result;
use crate::models::{AwayPeriod, Principal, Streak, Task, TaskStatus};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage operations the lifecycle, streak and away logic needs.
///
/// Loads are owner-scoped: an id that is unknown or belongs to another
/// principal yields the matching NotFound error.
#[async_trait]
pub trait Store: Send + Sync {
    /// # Errors
    /// `RoutineError::TaskNotFound` for an unknown or foreign id
    async fn load_task(&self, owner: Principal, id: Uuid) -> Result<Task>;

    /// # Errors
    /// `RoutineError::TaskNotFound` when the task no longer exists
    async fn save_task(&self, task: &Task) -> Result<()>;

    /// Insert a new task with its streak, atomically
    ///
    /// # Errors
    /// Returns an error if the write fails
    async fn insert_task(&self, task: &Task, streak: &Streak) -> Result<()>;

    /// Save a task and its streak, atomically
    ///
    /// # Errors
    /// `RoutineError::TaskNotFound` when the task no longer exists
    async fn save_task_with_streak(&self, task: &Task, streak: &Streak) -> Result<()>;

    /// # Errors
    /// Returns an error if the read fails
    async fn load_streak(&self, owner: Principal, task_id: Uuid) -> Result<Option<Streak>>;

    /// # Errors
    /// Returns an error if the write fails
    async fn save_streak(&self, streak: &Streak) -> Result<()>;

    /// # Errors
    /// Returns an error if the read fails
    async fn load_active_away_periods(&self, owner: Principal) -> Result<Vec<AwayPeriod>>;

    /// # Errors
    /// Returns an error if the read fails
    async fn load_recurring_tasks(&self, owner: Principal) -> Result<Vec<Task>>;

    /// Newest first
    ///
    /// # Errors
    /// Returns an error if the read fails
    async fn load_tasks(&self, owner: Principal, status: Option<TaskStatus>) -> Result<Vec<Task>>;

    /// # Errors
    /// Returns an error if the read fails
    async fn load_user_ids(&self) -> Result<Vec<Uuid>>;
}

#[async_trait]
impl Store for RoutineDatabase {
    async fn load_task(&self, owner: Principal, id: Uuid) -> Result<Task> {
        self.get_task(owner.user_id, id).await
    }

    async fn save_task(&self, task: &Task) -> Result<()> {
        self.update_task(task).await
    }

    async fn insert_task(&self, task: &Task, streak: &Streak) -> Result<()> {
        RoutineDatabase::insert_task(self, task, streak).await
    }

    async fn save_task_with_streak(&self, task: &Task, streak: &Streak) -> Result<()> {
        self.update_task_with_streak(task, streak).await
    }

    async fn load_streak(&self, owner: Principal, task_id: Uuid) -> Result<Option<Streak>> {
        self.get_streak(owner.user_id, task_id).await
    }

    async fn save_streak(&self, streak: &Streak) -> Result<()> {
        RoutineDatabase::save_streak(self, streak).await
    }

    async fn load_active_away_periods(&self, owner: Principal) -> Result<Vec<AwayPeriod>> {
        self.list_active_away_periods(owner.user_id).await
    }

    async fn load_recurring_tasks(&self, owner: Principal) -> Result<Vec<Task>> {
        self.list_recurring_tasks(owner.user_id).await
    }

    async fn load_tasks(&self, owner: Principal, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        self.list_tasks(owner.user_id, status).await
    }

    async fn load_user_ids(&self) -> Result<Vec<Uuid>> {
        self.list_user_ids().await
    }
}
