//! Calendar arithmetic shared by the reset and streak rules

use chrono::Datelike;

/// `(year, month)` pair of a date, used for calendar-month comparisons
#[must_use]
pub fn year_month<D: Datelike>(date: &D) -> (i32, u32) {
    (date.year(), date.month())
}

/// `(year, month)` of the month preceding the given one
#[must_use]
pub fn previous_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}
