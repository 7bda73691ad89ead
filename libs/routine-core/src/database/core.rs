use crate::{
    away::ensure_no_overlap,
    database::{
        mappers::{
            column, map_away_period_row, map_gym_progress_row, map_streak_row, map_task_row,
            map_user_row, parse_uuid,
        },
        schema::ensure_schema,
    },
    error::{Result, RoutineError},
    models::{
        AwayPeriod, CreateAwayPeriodRequest, CreateGymProgressRequest, CreateUserRequest,
        GoogleTokens, GymProgress, Streak, Task, TaskStatus, UpdateAwayPeriodRequest, User,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Executor, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Database connection pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabasePoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Idle timeout for connections
    pub idle_timeout: Duration,
    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,
    /// Test connections before use
    pub test_before_acquire: bool,
    /// SQLite-specific settings
    pub sqlite_optimizations: SqliteOptimizations,
}

/// SQLite connection settings applied to every pooled connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteOptimizations {
    /// WAL journal for file databases
    pub enable_wal_mode: bool,
    /// Enforce foreign keys
    pub enable_foreign_keys: bool,
    /// How long a writer waits on a locked database
    pub busy_timeout: Duration,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600), // 10 minutes
            max_lifetime: Duration::from_secs(1800), // 30 minutes
            test_before_acquire: true,
            sqlite_optimizations: SqliteOptimizations::default(),
        }
    }
}

impl Default for SqliteOptimizations {
    fn default() -> Self {
        Self {
            enable_wal_mode: true,
            enable_foreign_keys: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Row counts, for health output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseStats {
    pub user_count: u64,
    pub task_count: u64,
    pub away_period_count: u64,
    pub gym_entry_count: u64,
}

/// SQLx-backed store for users, tasks, streaks, away periods and gym entries
///
/// Every read and write of owned data is scoped by `owner_id`; a row owned by
/// someone else is reported exactly like a missing one.
#[derive(Debug, Clone)]
pub struct RoutineDatabase {
    pool: SqlitePool,
    config: DatabasePoolConfig,
}

impl RoutineDatabase {
    /// Open (creating if needed) a database file with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema bootstrap fails
    #[instrument]
    pub async fn new(database_path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}", database_path.display());
        Self::from_connection_string(&url).await
    }

    /// Connect from a connection string with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema bootstrap fails
    #[instrument]
    pub async fn from_connection_string(database_url: &str) -> Result<Self> {
        Self::from_connection_string_with_config(database_url, DatabasePoolConfig::default()).await
    }

    /// Connect from a connection string with custom configuration
    ///
    /// In-memory databases are pinned to a single long-lived connection,
    /// since each SQLite connection would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection or schema bootstrap fails
    #[instrument]
    pub async fn from_connection_string_with_config(
        database_url: &str,
        config: DatabasePoolConfig,
    ) -> Result<Self> {
        info!("Connecting to SQLite database: {}", database_url);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let sqlite = &config.sqlite_optimizations;

        let mut options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RoutineError::database(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(sqlite.enable_foreign_keys)
            .busy_timeout(sqlite.busy_timeout);
        if sqlite.enable_wal_mode && !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .idle_timeout(Some(config.idle_timeout))
                .max_lifetime(Some(config.max_lifetime))
        };

        let pool = pool_options
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(config.test_before_acquire)
            .connect_with(options)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to connect to database: {e}")))?;

        ensure_schema(&pool).await?;

        info!(
            "Database connection pool established with {} max connections",
            if in_memory { 1 } else { config.max_connections }
        );

        Ok(Self { pool, config })
    }

    /// Get the underlying connection pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Pool configuration this database was opened with
    #[must_use]
    pub fn config(&self) -> &DatabasePoolConfig {
        &self.config
    }

    /// Check if the database is connected
    #[instrument(skip(self))]
    pub async fn is_connected(&self) -> bool {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                debug!("Database connection is healthy");
                true
            }
            Err(e) => {
                error!("Database connection check failed: {}", e);
                false
            }
        }
    }

    /// Count rows in the main tables
    ///
    /// # Errors
    ///
    /// Returns an error if a count query fails
    #[instrument(skip(self))]
    pub async fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &'static str| {
            let pool = self.pool.clone();
            async move {
                let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
                    .fetch_one(&pool)
                    .await
                    .map_err(|e| RoutineError::database(format!("Failed to count {table}: {e}")))?;
                let n: i64 = column(&row, "n")?;
                Ok::<u64, RoutineError>(u64::try_from(n).unwrap_or(0))
            }
        };

        Ok(DatabaseStats {
            user_count: count("users").await?,
            task_count: count("tasks").await?,
            away_period_count: count("away_periods").await?,
            gym_entry_count: count("gym_progress").await?,
        })
    }

    // ----- users -----

    /// Register a user; emails are unique
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed or already registered email
    #[instrument(skip(self))]
    pub async fn create_user(&self, request: &CreateUserRequest, now: DateTime<Utc>) -> Result<User> {
        request.validate()?;

        let user = User {
            id: Uuid::new_v4(),
            email: request.email.trim().to_string(),
            name: request.name.trim().to_string(),
            created_at: now,
            calendar_authorized: false,
        };

        sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    RoutineError::validation(format!("Email already registered: {}", user.email))
                }
                _ => RoutineError::database(format!("Failed to create user: {e}")),
            })?;

        info!("Created user {}", user.id);
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `RoutineError::UserNotFound` for an unknown id
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch user: {e}")))?;

        row.as_ref()
            .map(map_user_row)
            .transpose()?
            .ok_or(RoutineError::UserNotFound { id })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn user_exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to validate user: {e}")))?;
        Ok(row.is_some())
    }

    /// Ids of all users, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_user_ids(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT id FROM users ORDER BY created_at, rowid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to list users: {e}")))?;

        rows.iter()
            .map(|row| column::<String>(row, "id").and_then(|id| parse_uuid(&id)))
            .collect()
    }

    /// Delete a user and everything they own
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::UserNotFound` for an unknown id
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        for table in ["gym_progress", "away_periods", "streaks", "tasks"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE owner_id = ?"))
                .bind(&id_str)
                .execute(&mut *tx)
                .await
                .map_err(|e| RoutineError::database(format!("Failed to delete {table}: {e}")))?;
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(&id_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to delete user: {e}")))?
            .rows_affected();

        if deleted == 0 {
            return Err(RoutineError::UserNotFound { id });
        }

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;

        info!("Deleted user {} and owned records", id);
        Ok(())
    }

    /// Store calendar OAuth tokens for a user
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::UserNotFound` for an unknown id
    #[instrument(skip(self, tokens))]
    pub async fn set_google_tokens(&self, id: Uuid, tokens: &GoogleTokens) -> Result<()> {
        if tokens.access_token.trim().is_empty() {
            return Err(RoutineError::validation("Access token must not be empty"));
        }

        let updated = sqlx::query(
            "UPDATE users SET google_access_token = ?, google_refresh_token = ? WHERE id = ?",
        )
        .bind(&tokens.access_token)
        .bind(tokens.refresh_token.as_ref())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to store tokens: {e}")))?
        .rows_affected();

        if updated == 0 {
            return Err(RoutineError::UserNotFound { id });
        }
        debug!("Stored calendar tokens for user {}", id);
        Ok(())
    }

    /// Stored calendar tokens, if any
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::UserNotFound` for an unknown id
    #[instrument(skip(self))]
    pub async fn get_google_tokens(&self, id: Uuid) -> Result<Option<GoogleTokens>> {
        let row = sqlx::query(
            "SELECT google_access_token, google_refresh_token FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to fetch tokens: {e}")))?
        .ok_or(RoutineError::UserNotFound { id })?;

        let access_token: Option<String> = column(&row, "google_access_token")?;
        let refresh_token: Option<String> = column(&row, "google_refresh_token")?;
        Ok(access_token.map(|access_token| GoogleTokens {
            access_token,
            refresh_token,
        }))
    }

    // ----- tasks -----

    /// Insert a task together with its streak, atomically
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails
    #[instrument(skip(self, task, streak), fields(task_id = %task.id))]
    pub async fn insert_task(&self, task: &Task, streak: &Streak) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        insert_task_row(&mut *tx, task).await?;
        upsert_streak_row(&mut *tx, streak).await?;

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;

        info!("Created task {}", task.id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` when the task is missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn get_task(&self, owner_id: Uuid, id: Uuid) -> Result<Task> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch task: {e}")))?;

        row.as_ref()
            .map(map_task_row)
            .transpose()?
            .ok_or(RoutineError::TaskNotFound { id })
    }

    /// Owner's tasks, newest first, optionally filtered by status
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_tasks(&self, owner_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM tasks
            WHERE owner_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, rowid DESC
            ",
        )
        .bind(owner_id.to_string())
        .bind(status.map(TaskStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to list tasks: {e}")))?;

        rows.iter().map(map_task_row).collect()
    }

    /// Owner's recurring tasks
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_recurring_tasks(&self, owner_id: Uuid) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE owner_id = ? AND is_recurring = 1 ORDER BY created_at, rowid",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to list recurring tasks: {e}")))?;

        rows.iter().map(map_task_row).collect()
    }

    /// Overwrite a stored task
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` when no row matches id and owner
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn update_task(&self, task: &Task) -> Result<()> {
        update_task_row(&self.pool, task).await
    }

    /// Overwrite a task and its streak, atomically
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` when no task row matches
    #[instrument(skip(self, task, streak), fields(task_id = %task.id))]
    pub async fn update_task_with_streak(&self, task: &Task, streak: &Streak) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        update_task_row(&mut *tx, task).await?;
        upsert_streak_row(&mut *tx, streak).await?;

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;
        Ok(())
    }

    /// Delete a task and its streak
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::TaskNotFound` when no row matches id and owner
    #[instrument(skip(self))]
    pub async fn delete_task(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query("DELETE FROM streaks WHERE task_id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to delete streak: {e}")))?;

        let deleted = sqlx::query("DELETE FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to delete task: {e}")))?
            .rows_affected();

        if deleted == 0 {
            return Err(RoutineError::TaskNotFound { id });
        }

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;

        info!("Deleted task {}", id);
        Ok(())
    }

    // ----- streaks -----

    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn get_streak(&self, owner_id: Uuid, task_id: Uuid) -> Result<Option<Streak>> {
        let row = sqlx::query("SELECT * FROM streaks WHERE task_id = ? AND owner_id = ?")
            .bind(task_id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch streak: {e}")))?;

        row.as_ref().map(map_streak_row).transpose()
    }

    /// Insert or overwrite the streak of a task
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails
    #[instrument(skip(self, streak), fields(task_id = %streak.task_id))]
    pub async fn save_streak(&self, streak: &Streak) -> Result<()> {
        upsert_streak_row(&self.pool, streak).await
    }

    // ----- away periods -----

    /// Create an away period after checking it against the owner's active ones
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::InvalidRange` for a reversed range and
    /// `RoutineError::Conflict` when it overlaps an active period
    #[instrument(skip(self))]
    pub async fn create_away_period(
        &self,
        owner_id: Uuid,
        request: &CreateAwayPeriodRequest,
    ) -> Result<AwayPeriod> {
        let period = AwayPeriod::new(owner_id, request.start_date, request.end_date)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        let existing = active_away_periods(&mut *tx, owner_id).await?;
        ensure_no_overlap(&existing, period.start_date, period.end_date, None)?;

        sqlx::query(
            "INSERT INTO away_periods (id, owner_id, start_date, end_date, is_active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(period.id.to_string())
        .bind(owner_id.to_string())
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.is_active)
        .execute(&mut *tx)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to create away period: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;

        info!(
            "Created away period {} ({} to {})",
            period.id, period.start_date, period.end_date
        );
        Ok(period)
    }

    /// All of the owner's away periods, earliest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_away_periods(&self, owner_id: Uuid) -> Result<Vec<AwayPeriod>> {
        let rows = sqlx::query(
            "SELECT * FROM away_periods WHERE owner_id = ? ORDER BY start_date, rowid",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to list away periods: {e}")))?;

        rows.iter().map(map_away_period_row).collect()
    }

    /// The owner's active away periods
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_active_away_periods(&self, owner_id: Uuid) -> Result<Vec<AwayPeriod>> {
        active_away_periods(&self.pool, owner_id).await
    }

    /// # Errors
    ///
    /// Returns `RoutineError::AwayPeriodNotFound` when missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn get_away_period(&self, owner_id: Uuid, id: Uuid) -> Result<AwayPeriod> {
        let row = sqlx::query("SELECT * FROM away_periods WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch away period: {e}")))?;

        row.as_ref()
            .map(map_away_period_row)
            .transpose()?
            .ok_or(RoutineError::AwayPeriodNotFound { id })
    }

    /// Apply a partial update; an active result is re-checked for overlap
    /// against the owner's other active periods
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::AwayPeriodNotFound`, `RoutineError::InvalidRange`
    /// or `RoutineError::Conflict`
    #[instrument(skip(self))]
    pub async fn update_away_period(
        &self,
        owner_id: Uuid,
        id: Uuid,
        request: &UpdateAwayPeriodRequest,
    ) -> Result<AwayPeriod> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to begin transaction: {e}")))?;

        let row = sqlx::query("SELECT * FROM away_periods WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch away period: {e}")))?;
        let mut period = row
            .as_ref()
            .map(map_away_period_row)
            .transpose()?
            .ok_or(RoutineError::AwayPeriodNotFound { id })?;

        if let Some(start_date) = request.start_date {
            period.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            period.end_date = end_date;
        }
        if let Some(is_active) = request.is_active {
            period.is_active = is_active;
        }

        crate::away::validate_range(period.start_date, period.end_date)?;
        if period.is_active {
            let existing = active_away_periods(&mut *tx, owner_id).await?;
            ensure_no_overlap(&existing, period.start_date, period.end_date, Some(period.id))?;
        }

        save_away_period_row(&mut *tx, &period).await?;

        tx.commit()
            .await
            .map_err(|e| RoutineError::database(format!("Failed to commit: {e}")))?;

        debug!("Updated away period {}", id);
        Ok(period)
    }

    /// Stop an away period early; it stays on record
    ///
    /// # Errors
    ///
    /// Returns `RoutineError::AwayPeriodNotFound` when missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn deactivate_away_period(&self, owner_id: Uuid, id: Uuid) -> Result<AwayPeriod> {
        let mut period = self.get_away_period(owner_id, id).await?;
        period.deactivate();
        save_away_period_row(&self.pool, &period).await?;
        info!("Deactivated away period {}", id);
        Ok(period)
    }

    /// # Errors
    ///
    /// Returns `RoutineError::AwayPeriodNotFound` when missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn delete_away_period(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM away_periods WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to delete away period: {e}")))?
            .rows_affected();

        if deleted == 0 {
            return Err(RoutineError::AwayPeriodNotFound { id });
        }
        info!("Deleted away period {}", id);
        Ok(())
    }

    // ----- gym progress -----

    /// Log a gym entry; `today` fills in a missing date
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad weights, or an error if the insert fails
    #[instrument(skip(self))]
    pub async fn create_gym_progress(
        &self,
        owner_id: Uuid,
        request: &CreateGymProgressRequest,
        today: NaiveDate,
    ) -> Result<GymProgress> {
        request.validate()?;

        let entry = GymProgress {
            id: Uuid::new_v4(),
            owner_id,
            date: request.date.unwrap_or(today),
            bodyweight: request.bodyweight,
            squat_1rm: request.squat_1rm,
            bench_1rm: request.bench_1rm,
            deadlift_1rm: request.deadlift_1rm,
            notes: request.notes.clone(),
        };

        sqlx::query(
            r"
            INSERT INTO gym_progress (
                id, owner_id, date, bodyweight, squat_1rm, bench_1rm, deadlift_1rm, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(entry.id.to_string())
        .bind(owner_id.to_string())
        .bind(entry.date)
        .bind(entry.bodyweight)
        .bind(entry.squat_1rm)
        .bind(entry.bench_1rm)
        .bind(entry.deadlift_1rm)
        .bind(entry.notes.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to log gym progress: {e}")))?;

        info!("Logged gym progress {} for {}", entry.id, entry.date);
        Ok(entry)
    }

    /// Owner's gym entries, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails
    #[instrument(skip(self))]
    pub async fn list_gym_progress(&self, owner_id: Uuid) -> Result<Vec<GymProgress>> {
        let rows = sqlx::query(
            "SELECT * FROM gym_progress WHERE owner_id = ? ORDER BY date DESC, rowid DESC",
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoutineError::database(format!("Failed to list gym progress: {e}")))?;

        rows.iter().map(map_gym_progress_row).collect()
    }

    /// # Errors
    ///
    /// Returns `RoutineError::GymEntryNotFound` when missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn get_gym_progress(&self, owner_id: Uuid, id: Uuid) -> Result<GymProgress> {
        let row = sqlx::query("SELECT * FROM gym_progress WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to fetch gym progress: {e}")))?;

        row.as_ref()
            .map(map_gym_progress_row)
            .transpose()?
            .ok_or(RoutineError::GymEntryNotFound { id })
    }

    /// # Errors
    ///
    /// Returns `RoutineError::GymEntryNotFound` when missing or owned by someone else
    #[instrument(skip(self))]
    pub async fn delete_gym_progress(&self, owner_id: Uuid, id: Uuid) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM gym_progress WHERE id = ? AND owner_id = ?")
            .bind(id.to_string())
            .bind(owner_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RoutineError::database(format!("Failed to delete gym progress: {e}")))?
            .rows_affected();

        if deleted == 0 {
            return Err(RoutineError::GymEntryNotFound { id });
        }
        Ok(())
    }
}

async fn insert_task_row<'e, E>(executor: E, task: &Task) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO tasks (
            id, owner_id, title, description, kind, recurrence, status,
            is_recurring, recurrence_time, recurrence_day_of_week,
            recurrence_day_of_month, due_date, completed_at, last_reset_date,
            pause_on_away, external_event_ref, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(task.id.to_string())
    .bind(task.owner_id.to_string())
    .bind(task.title.clone())
    .bind(task.description.clone())
    .bind(task.kind.as_str())
    .bind(task.recurrence.clone())
    .bind(task.status.as_str())
    .bind(task.is_recurring)
    .bind(task.recurrence_time)
    .bind(task.recurrence_day_of_week)
    .bind(task.recurrence_day_of_month)
    .bind(task.due_date)
    .bind(task.completed_at)
    .bind(task.last_reset_date)
    .bind(task.pause_on_away)
    .bind(task.external_event_ref.clone())
    .bind(task.created_at)
    .execute(executor)
    .await
    .map_err(|e| RoutineError::database(format!("Failed to create task: {e}")))?;
    Ok(())
}

async fn update_task_row<'e, E>(executor: E, task: &Task) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let updated = sqlx::query(
        r"
        UPDATE tasks SET
            title = ?, description = ?, kind = ?, recurrence = ?, status = ?,
            is_recurring = ?, recurrence_time = ?, recurrence_day_of_week = ?,
            recurrence_day_of_month = ?, due_date = ?, completed_at = ?,
            last_reset_date = ?, pause_on_away = ?, external_event_ref = ?
        WHERE id = ? AND owner_id = ?
        ",
    )
    .bind(task.title.clone())
    .bind(task.description.clone())
    .bind(task.kind.as_str())
    .bind(task.recurrence.clone())
    .bind(task.status.as_str())
    .bind(task.is_recurring)
    .bind(task.recurrence_time)
    .bind(task.recurrence_day_of_week)
    .bind(task.recurrence_day_of_month)
    .bind(task.due_date)
    .bind(task.completed_at)
    .bind(task.last_reset_date)
    .bind(task.pause_on_away)
    .bind(task.external_event_ref.clone())
    .bind(task.id.to_string())
    .bind(task.owner_id.to_string())
    .execute(executor)
    .await
    .map_err(|e| RoutineError::database(format!("Failed to update task: {e}")))?
    .rows_affected();

    if updated == 0 {
        return Err(RoutineError::TaskNotFound { id: task.id });
    }
    Ok(())
}

async fn upsert_streak_row<'e, E>(executor: E, streak: &Streak) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO streaks (
            id, owner_id, task_id, current_streak, longest_streak,
            last_completed_date, visual_theme
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(task_id) DO UPDATE SET
            current_streak = excluded.current_streak,
            longest_streak = excluded.longest_streak,
            last_completed_date = excluded.last_completed_date,
            visual_theme = excluded.visual_theme
        ",
    )
    .bind(streak.id.to_string())
    .bind(streak.owner_id.to_string())
    .bind(streak.task_id.to_string())
    .bind(streak.current_streak)
    .bind(streak.longest_streak)
    .bind(streak.last_completed_date)
    .bind(streak.visual_theme.as_str())
    .execute(executor)
    .await
    .map_err(|e| RoutineError::database(format!("Failed to save streak: {e}")))?;
    Ok(())
}

async fn active_away_periods<'e, E>(executor: E, owner_id: Uuid) -> Result<Vec<AwayPeriod>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT * FROM away_periods WHERE owner_id = ? AND is_active = 1 ORDER BY start_date, rowid",
    )
    .bind(owner_id.to_string())
    .fetch_all(executor)
    .await
    .map_err(|e| RoutineError::database(format!("Failed to list away periods: {e}")))?;

    rows.iter().map(map_away_period_row).collect()
}

async fn save_away_period_row<'e, E>(executor: E, period: &AwayPeriod) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let updated = sqlx::query(
        "UPDATE away_periods SET start_date = ?, end_date = ?, is_active = ? WHERE id = ? AND owner_id = ?",
    )
    .bind(period.start_date)
    .bind(period.end_date)
    .bind(period.is_active)
    .bind(period.id.to_string())
    .bind(period.owner_id.to_string())
    .execute(executor)
    .await
    .map_err(|e| RoutineError::database(format!("Failed to update away period: {e}")))?
    .rows_affected();

    if updated == 0 {
        return Err(RoutineError::AwayPeriodNotFound { id: period.id });
    }
    Ok(())
}
