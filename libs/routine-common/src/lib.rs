//! Routine Common - Shared constants and helpers for the routine backend
//!
//! # Examples
//!
//! ```
//! use routine_common::{previous_month, year_month, DEFAULT_PAGE_SIZE};
//! use chrono::NaiveDate;
//!
//! assert_eq!(DEFAULT_PAGE_SIZE, 50);
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! assert_eq!(previous_month(year_month(&date)), (2023, 12));
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;
