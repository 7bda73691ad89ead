//! Command line parsing and configuration resolution

use clap::Parser;
use routine_cli::{load_config, Cli, Commands, UserCommand};
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_parse_serve_with_overrides() {
    let cli = Cli::try_parse_from(["routine", "serve", "--host", "0.0.0.0", "--port", "9000"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Serve {
            host: Some("0.0.0.0".to_string()),
            port: Some(9000),
        }
    );

    let layer = cli.config_overrides();
    assert_eq!(layer.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(layer.port, Some(9000));
    assert!(layer.log_level.is_none());
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "routine",
        "sweep-all",
        "--database-url",
        "sqlite::memory:",
        "--verbose",
    ])
    .unwrap();
    assert_eq!(cli.command, Commands::SweepAll);
    assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));

    let layer = cli.config_overrides();
    assert_eq!(layer.log_level.as_deref(), Some("debug"));
    assert_eq!(layer.database_url.as_deref(), Some("sqlite::memory:"));
}

#[test]
fn test_parse_sweep_requires_valid_uuid() {
    assert!(Cli::try_parse_from(["routine", "sweep"]).is_err());
    assert!(Cli::try_parse_from(["routine", "sweep", "--user", "not-a-uuid"]).is_err());

    let id = uuid::Uuid::new_v4();
    let cli = Cli::try_parse_from(["routine", "sweep", "--user", &id.to_string()]).unwrap();
    assert_eq!(cli.command, Commands::Sweep { user: id });
}

#[test]
fn test_parse_user_create() {
    let cli = Cli::try_parse_from([
        "routine",
        "user",
        "create",
        "--email",
        "ada@example.com",
        "--name",
        "Ada",
    ])
    .unwrap();
    assert_eq!(
        cli.command,
        Commands::User {
            command: UserCommand::Create {
                email: "ada@example.com".to_string(),
                name: "Ada".to_string(),
            }
        }
    );
}

#[test]
fn test_parse_init_config() {
    let cli = Cli::try_parse_from(["routine", "init-config", "routine.yaml"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::InitConfig {
            path: PathBuf::from("routine.yaml")
        }
    );
}

#[test]
fn test_unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["routine", "launch"]).is_err());
}

#[test]
#[serial]
fn test_load_config_file_then_flags() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("routine.yaml");
    std::fs::write(&path, "port: 7000\nlog_level: warn\nsweep_interval_secs: 60\n").unwrap();

    let cli = Cli::try_parse_from([
        "routine",
        "--config",
        path.to_str().unwrap(),
        "serve",
        "--port",
        "7100",
    ])
    .unwrap();
    let config = load_config(&cli).unwrap();

    assert_eq!(config.port, 7100);
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.sweep_interval_secs, Some(60));
}

#[test]
#[serial]
fn test_load_config_missing_file_is_an_error() {
    let cli = Cli::try_parse_from([
        "routine",
        "--config",
        "/nonexistent/routine.yaml",
        "health",
    ])
    .unwrap();
    let err = load_config(&cli).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}
