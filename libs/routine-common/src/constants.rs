//! Constants shared across the routine crates

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Maximum page size for list endpoints
pub const MAX_PAGE_SIZE: usize = 100;

/// Default HTTP port for the API server
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default SQLite database URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite://routine.db";

/// Task titles are limited to this many characters
pub const MAX_TITLE_LENGTH: usize = 200;

/// Rolling window after which a completed weekly task returns to pending
pub const WEEKLY_RESET_DAYS: i64 = 7;

/// Streak length at which the bronze theme is unlocked
pub const BRONZE_STREAK: u32 = 7;

/// Streak length at which the silver theme is unlocked
pub const SILVER_STREAK: u32 = 30;

/// Streak length at which the gold theme is unlocked
pub const GOLD_STREAK: u32 = 90;

/// 1000 lb expressed in kilograms
pub const THOUSAND_LB_CLUB_KG: f64 = 453.6;

/// Hour of day (UTC) used for calendar events of tasks without a due date
pub const DEFAULT_EVENT_HOUR: u32 = 9;

/// Length of a synced calendar event in minutes
pub const EVENT_DURATION_MINUTES: i64 = 60;

/// Calendar event descriptions are limited to this many characters
pub const MAX_EVENT_DESCRIPTION_LENGTH: usize = 2000;

/// Calendar event locations are limited to this many characters
pub const MAX_EVENT_LOCATION_LENGTH: usize = 200;

/// Days covered by an event listing without an explicit `time_max`
pub const EVENT_LIST_DAYS: i64 = 30;

/// Header carrying the authenticated principal
pub const PRINCIPAL_HEADER: &str = "x-user-id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_sizes() {
        assert_eq!(DEFAULT_PAGE_SIZE, 50);
        assert_eq!(MAX_PAGE_SIZE, 100);
        assert!(DEFAULT_PAGE_SIZE <= MAX_PAGE_SIZE);
    }

    #[test]
    fn test_streak_thresholds_are_ordered() {
        assert!(BRONZE_STREAK < SILVER_STREAK);
        assert!(SILVER_STREAK < GOLD_STREAK);
    }
}
