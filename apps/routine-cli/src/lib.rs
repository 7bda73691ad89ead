//! Routine CLI library
//!
//! Command line parsing, the HTTP API and the runtime plumbing around the
//! `routine-core` service: logging, health, metrics and the sweep scheduler.

pub mod api_error;
pub mod extract;
pub mod health;
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;
pub mod principal;
pub mod scheduler;
pub mod server;

use clap::{Parser, Subcommand};
use routine_core::{
    ConfigLayer, ConfigLoader, RoutineConfig, RoutineDatabase, RoutineService, SweepReport,
    SweepSummary, SystemClock,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "routine")]
#[command(about = "Recurring tasks, streaks and away periods")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to routine.yaml/.yml/.json in the
    /// working directory, then the user config directory)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, e.g. sqlite://routine.db
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,
    },
    /// Reset due recurring tasks of one user
    Sweep {
        /// User id
        #[arg(long)]
        user: Uuid,
    },
    /// Reset due recurring tasks of every user
    SweepAll,
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Health check
    Health,
    /// Write a configuration file with the default settings
    InitConfig {
        /// Target path; `.json` writes JSON, anything else YAML
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum UserCommand {
    /// Register a user
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
}

impl Cli {
    /// Command-line flags as the highest-precedence configuration layer
    #[must_use]
    pub fn config_overrides(&self) -> ConfigLayer {
        let mut layer = ConfigLayer {
            database_url: self.database_url.clone(),
            ..ConfigLayer::default()
        };
        if self.verbose {
            layer.log_level = Some("debug".to_string());
        }
        if let Commands::Serve { host, port } = &self.command {
            layer.host.clone_from(host);
            layer.port = *port;
        }
        layer
    }
}

/// Resolve the configuration for this invocation
///
/// # Errors
/// Returns an error if a source cannot be parsed or the result is invalid
pub fn load_config(cli: &Cli) -> routine_core::Result<RoutineConfig> {
    let mut loader = ConfigLoader::new().with_overrides(cli.config_overrides());
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(routine_core::RoutineError::configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        loader = loader.with_config_file(path);
    }
    loader.load()
}

/// Service over `db` on the wall clock, with the calendar backend when enabled
///
/// # Errors
/// Returns an error if the calendar backend cannot be built
pub fn build_service(
    db: Arc<RoutineDatabase>,
    config: &RoutineConfig,
) -> routine_core::Result<RoutineService> {
    let service = RoutineService::new(db.clone(), Arc::new(SystemClock));

    if !config.calendar_enabled {
        return Ok(service);
    }

    #[cfg(feature = "google-calendar")]
    {
        let calendar = routine_core::GoogleCalendar::new(db)?;
        Ok(service.with_calendar(Arc::new(calendar)))
    }

    #[cfg(not(feature = "google-calendar"))]
    {
        drop(db);
        tracing::warn!("calendar_enabled is set but this build lacks the google-calendar feature");
        Ok(service)
    }
}

/// Print the outcome of a single-user sweep
///
/// # Errors
/// Returns an error if writing fails
pub fn print_sweep_report<W: Write>(report: &SweepReport, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "Reset {} tasks", report.reset_count)?;
    if report.streaks_broken > 0 {
        writeln!(writer, "Broke {} streaks", report.streaks_broken)?;
    }
    Ok(())
}

/// Print the outcome of a sweep over every user
///
/// # Errors
/// Returns an error if writing fails
pub fn print_sweep_summary<W: Write>(summary: &SweepSummary, writer: &mut W) -> std::io::Result<()> {
    writeln!(
        writer,
        "Swept {} users: reset {} tasks, broke {} streaks",
        summary.users, summary.reset_count, summary.streaks_broken
    )?;
    if summary.failed_users > 0 {
        writeln!(writer, "{} users failed; see the log", summary.failed_users)?;
    }
    Ok(())
}
