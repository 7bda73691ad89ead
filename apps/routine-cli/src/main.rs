//! Routine CLI - HTTP API server and maintenance commands

use anyhow::{bail, Context};
use clap::Parser;
use routine_cli::{
    build_service, health::print_health, load_config, logging::init_logging,
    print_sweep_report, print_sweep_summary, scheduler::spawn_sweep_scheduler,
    server::{self, AppState},
    Cli, Commands, UserCommand,
};
use routine_core::{ConfigLoader, CreateUserRequest, Principal, RoutineDatabase};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { path } = &cli.command {
        ConfigLoader::create_sample_config(path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli).context("Failed to load configuration")?;
    let _log_guard = init_logging(&config)?;

    let db = Arc::new(
        RoutineDatabase::from_connection_string(&config.database_url)
            .await
            .with_context(|| format!("Failed to open {}", config.database_url))?,
    );

    match cli.command {
        Commands::Serve { .. } => {
            let service = build_service(Arc::clone(&db), &config)?;

            if let Some(secs) = config.sweep_interval_secs {
                let _scheduler = spawn_sweep_scheduler(service.clone(), Duration::from_secs(secs));
            }

            #[allow(unused_mut)]
            let mut state = AppState::new(service, db);
            #[cfg(feature = "observability")]
            {
                state = state.with_metrics(routine_cli::metrics::install_recorder()?);
            }

            server::serve(&config, state).await?;
        }
        Commands::Sweep { user } => {
            if !db.user_exists(user).await? {
                bail!("User not found: {user}");
            }
            let service = build_service(db, &config)?;
            let report = service.sweep(Principal::new(user)).await?;
            print_sweep_report(&report, &mut std::io::stdout())?;
        }
        Commands::SweepAll => {
            let service = build_service(db, &config)?;
            let summary = service.sweep_all().await?;
            print_sweep_summary(&summary, &mut std::io::stdout())?;
        }
        Commands::User {
            command: UserCommand::Create { email, name },
        } => {
            let user = db
                .create_user(&CreateUserRequest { email, name }, chrono::Utc::now())
                .await?;
            info!(user_id = %user.id, "Created user");
            println!("{}", user.id);
        }
        Commands::Health => {
            print_health(&db, &mut std::io::stdout()).await?;
        }
        // Written before configuration is loaded
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}
