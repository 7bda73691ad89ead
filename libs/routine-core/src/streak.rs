//! Streak tracking and milestone themes
//!
//! [`Streak::increment_streak`] and [`Streak::break_streak`] are the raw
//! counter operations. [`Streak::record_completion`] and
//! [`Streak::has_lapsed`] add the per-period policy used when wiring streaks
//! to task completion and sweep events. A lapse is applied before a new
//! completion is counted, so a late completion starts a fresh run.

use crate::models::{Streak, TaskKind, VisualTheme};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use routine_common::{
    previous_month, year_month, BRONZE_STREAK, GOLD_STREAK, SILVER_STREAK, WEEKLY_RESET_DAYS,
};

impl VisualTheme {
    /// Theme for a streak length; highest threshold wins
    #[must_use]
    pub fn for_streak(current_streak: u32) -> Self {
        if current_streak >= GOLD_STREAK {
            VisualTheme::Gold
        } else if current_streak >= SILVER_STREAK {
            VisualTheme::Silver
        } else if current_streak >= BRONZE_STREAK {
            VisualTheme::Bronze
        } else {
            VisualTheme::Basic
        }
    }
}

impl Streak {
    /// Count one more completion at `now`
    pub fn increment_streak(&mut self, now: DateTime<Utc>) {
        self.current_streak = self.current_streak.saturating_add(1);
        self.last_completed_date = Some(now.date_naive());
        if self.current_streak > self.longest_streak {
            self.longest_streak = self.current_streak;
        }
        self.update_visual_theme();
    }

    /// Reset the current run; `longest_streak` is kept
    pub fn break_streak(&mut self) {
        self.current_streak = 0;
        self.visual_theme = VisualTheme::Basic;
    }

    /// Recompute the theme from `current_streak`
    pub fn update_visual_theme(&mut self) {
        self.visual_theme = VisualTheme::for_streak(self.current_streak);
    }

    /// Count a completion unless one was already counted in the same period.
    ///
    /// Returns whether the streak was incremented.
    pub fn record_completion(&mut self, kind: TaskKind, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        if let Some(last) = self.last_completed_date {
            if same_period(kind, last, today) {
                return false;
            }
        }
        self.increment_streak(now);
        true
    }

    /// Break the streak if a whole period passed without a completion.
    ///
    /// Returns whether it was broken.
    pub fn break_if_lapsed(&mut self, kind: TaskKind, today: NaiveDate) -> bool {
        if !self.has_lapsed(kind, today) {
            return false;
        }
        self.break_streak();
        true
    }

    /// Whether a whole period passed without a completion
    #[must_use]
    pub fn has_lapsed(&self, kind: TaskKind, today: NaiveDate) -> bool {
        if self.current_streak == 0 {
            return false;
        }
        let Some(last) = self.last_completed_date else {
            return false;
        };

        match kind {
            TaskKind::Daily => last < today - Duration::days(1),
            TaskKind::Weekly => today - last >= Duration::days(2 * WEEKLY_RESET_DAYS),
            TaskKind::Monthly => year_month(&last) < previous_month(year_month(&today)),
            TaskKind::LongTerm | TaskKind::GymWorkout => false,
        }
    }
}

/// Whether two completion dates fall in the same recurrence period
fn same_period(kind: TaskKind, last: NaiveDate, today: NaiveDate) -> bool {
    match kind {
        TaskKind::Daily | TaskKind::LongTerm | TaskKind::GymWorkout => last == today,
        TaskKind::Weekly => today - last < Duration::days(WEEKLY_RESET_DAYS),
        TaskKind::Monthly => year_month(&last) == year_month(&today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn streak() -> Streak {
        Streak::new(Uuid::new_v4(), Uuid::new_v4())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
    }

    #[test]
    fn test_theme_milestones() {
        let mut s = streak();
        let now = noon(day(2024, 1, 1));
        let mut themes = Vec::new();
        for _ in 0..90 {
            s.increment_streak(now);
            themes.push(s.visual_theme);
        }

        assert_eq!(themes[5], VisualTheme::Basic); // 6
        assert_eq!(themes[6], VisualTheme::Bronze); // 7
        assert_eq!(themes[28], VisualTheme::Bronze); // 29
        assert_eq!(themes[29], VisualTheme::Silver); // 30
        assert_eq!(themes[88], VisualTheme::Silver); // 89
        assert_eq!(themes[89], VisualTheme::Gold); // 90
    }

    #[test]
    fn test_increment_sets_last_completed_date() {
        let mut s = streak();
        s.increment_streak(noon(day(2024, 2, 29)));

        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 1);
        assert_eq!(s.last_completed_date, Some(day(2024, 2, 29)));
    }

    #[test]
    fn test_break_keeps_longest() {
        let mut s = streak();
        for _ in 0..12 {
            s.increment_streak(noon(day(2024, 1, 1)));
        }
        s.break_streak();

        assert_eq!(s.current_streak, 0);
        assert_eq!(s.longest_streak, 12);
        assert_eq!(s.visual_theme, VisualTheme::Basic);

        s.increment_streak(noon(day(2024, 1, 5)));
        assert_eq!(s.current_streak, 1);
        assert_eq!(s.longest_streak, 12);
    }

    #[test]
    fn test_record_completion_once_per_day_for_daily() {
        let mut s = streak();
        assert!(s.record_completion(TaskKind::Daily, noon(day(2024, 3, 1))));
        assert!(!s.record_completion(TaskKind::Daily, noon(day(2024, 3, 1))));
        assert!(s.record_completion(TaskKind::Daily, noon(day(2024, 3, 2))));
        assert_eq!(s.current_streak, 2);
    }

    #[test]
    fn test_record_completion_weekly_window() {
        let mut s = streak();
        assert!(s.record_completion(TaskKind::Weekly, noon(day(2024, 3, 1))));
        assert!(!s.record_completion(TaskKind::Weekly, noon(day(2024, 3, 7))));
        assert!(s.record_completion(TaskKind::Weekly, noon(day(2024, 3, 8))));
    }

    #[test]
    fn test_record_completion_monthly_calendar_month() {
        let mut s = streak();
        assert!(s.record_completion(TaskKind::Monthly, noon(day(2024, 1, 31))));
        assert!(!s.record_completion(TaskKind::Monthly, noon(day(2024, 1, 1))));
        assert!(s.record_completion(TaskKind::Monthly, noon(day(2024, 2, 1))));
    }

    #[test]
    fn test_daily_lapse() {
        let mut s = streak();
        s.increment_streak(noon(day(2024, 3, 1)));

        assert!(!s.has_lapsed(TaskKind::Daily, day(2024, 3, 1)));
        assert!(!s.has_lapsed(TaskKind::Daily, day(2024, 3, 2)));
        assert!(s.has_lapsed(TaskKind::Daily, day(2024, 3, 3)));
    }

    #[test]
    fn test_weekly_lapse() {
        let mut s = streak();
        s.increment_streak(noon(day(2024, 3, 1)));

        assert!(!s.has_lapsed(TaskKind::Weekly, day(2024, 3, 14)));
        assert!(s.has_lapsed(TaskKind::Weekly, day(2024, 3, 15)));
    }

    #[test]
    fn test_monthly_lapse() {
        let mut s = streak();
        s.increment_streak(noon(day(2023, 12, 20)));

        assert!(!s.has_lapsed(TaskKind::Monthly, day(2024, 1, 31)));
        assert!(s.has_lapsed(TaskKind::Monthly, day(2024, 2, 1)));
    }

    #[test]
    fn test_break_if_lapsed_before_late_completion() {
        let mut s = streak();
        s.increment_streak(noon(day(2024, 3, 1)));
        s.increment_streak(noon(day(2024, 3, 2)));

        assert!(!s.break_if_lapsed(TaskKind::Daily, day(2024, 3, 3)));
        assert_eq!(s.current_streak, 2);

        assert!(s.break_if_lapsed(TaskKind::Daily, day(2024, 3, 6)));
        assert_eq!(s.current_streak, 0);
        assert_eq!(s.longest_streak, 2);
        assert!(s.record_completion(TaskKind::Daily, noon(day(2024, 3, 6))));
        assert_eq!(s.current_streak, 1);
    }

    #[test]
    fn test_never_lapses_for_open_ended_kinds_or_empty_streaks() {
        let mut s = streak();
        assert!(!s.has_lapsed(TaskKind::Daily, day(2030, 1, 1)));

        s.increment_streak(noon(day(2020, 1, 1)));
        assert!(!s.has_lapsed(TaskKind::LongTerm, day(2030, 1, 1)));
        assert!(!s.has_lapsed(TaskKind::GymWorkout, day(2030, 1, 1)));
    }

    proptest! {
        #[test]
        fn prop_theme_matches_thresholds(n in 0u32..500) {
            let expected = match n {
                0..=6 => VisualTheme::Basic,
                7..=29 => VisualTheme::Bronze,
                30..=89 => VisualTheme::Silver,
                _ => VisualTheme::Gold,
            };
            prop_assert_eq!(VisualTheme::for_streak(n), expected);
        }

        #[test]
        fn prop_longest_never_below_current(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut s = streak();
            let now = noon(day(2024, 1, 1));
            let mut longest_seen = 0;
            for increment in ops {
                if increment {
                    s.increment_streak(now);
                } else {
                    s.break_streak();
                }
                prop_assert!(s.longest_streak >= s.current_streak);
                prop_assert!(s.longest_streak >= longest_seen);
                prop_assert_eq!(s.visual_theme, VisualTheme::for_streak(s.current_streak));
                longest_seen = s.longest_streak;
            }
        }
    }
}
