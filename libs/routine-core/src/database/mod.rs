//! Database module - SQLite persistence for every routine entity

mod core;
pub mod mappers;
pub mod schema;

pub use core::*;

pub use mappers::{map_away_period_row, map_gym_progress_row, map_streak_row, map_task_row};
