//! Derived gym metrics

use crate::models::GymProgress;
use routine_common::THOUSAND_LB_CLUB_KG;
use serde::{Deserialize, Serialize};

impl GymProgress {
    /// Squat + bench + deadlift; `None` when no lift is recorded or every
    /// recorded lift is zero
    #[must_use]
    pub fn total(&self) -> Option<f64> {
        let lifts = [self.squat_1rm, self.bench_1rm, self.deadlift_1rm];
        if !lifts.iter().flatten().any(|weight| *weight != 0.0) {
            return None;
        }
        Some(lifts.iter().flatten().sum())
    }

    /// Total of at least 1000 lb
    #[must_use]
    pub fn is_1000lb_club(&self) -> bool {
        self.total().is_some_and(|total| total >= THOUSAND_LB_CLUB_KG)
    }
}

/// A log entry with its derived metrics, as returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GymProgressSummary {
    #[serde(flatten)]
    pub entry: GymProgress,
    pub total: Option<f64>,
    pub is_1000lb_club: bool,
}

impl From<GymProgress> for GymProgressSummary {
    fn from(entry: GymProgress) -> Self {
        let total = entry.total();
        let is_1000lb_club = entry.is_1000lb_club();
        Self {
            entry,
            total,
            is_1000lb_club,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn entry(squat: Option<f64>, bench: Option<f64>, deadlift: Option<f64>) -> GymProgress {
        GymProgress {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            bodyweight: Some(82.5),
            squat_1rm: squat,
            bench_1rm: bench,
            deadlift_1rm: deadlift,
            notes: None,
        }
    }

    #[test]
    fn test_total_absent_without_lifts() {
        let e = entry(None, None, None);
        assert_eq!(e.total(), None);
        assert!(!e.is_1000lb_club());
    }

    #[test]
    fn test_total_absent_when_all_lifts_zero() {
        let e = entry(Some(0.0), Some(0.0), None);
        assert_eq!(e.total(), None);

        let summary = GymProgressSummary::from(e);
        assert_eq!(summary.total, None);
        assert!(!summary.is_1000lb_club);
    }

    #[test]
    fn test_total_sums_present_lifts() {
        let e = entry(Some(140.0), None, Some(180.0));
        assert_eq!(e.total(), Some(320.0));
    }

    #[test]
    fn test_thousand_pound_club_threshold() {
        assert!(!entry(Some(150.0), Some(100.0), Some(203.5)).is_1000lb_club());
        assert!(entry(Some(150.0), Some(100.0), Some(204.0)).is_1000lb_club());
    }

    #[test]
    fn test_summary_serializes_flat() {
        let summary = GymProgressSummary::from(entry(Some(100.0), Some(80.0), Some(120.0)));
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["total"], 300.0);
        assert_eq!(json["is_1000lb_club"], false);
        assert_eq!(json["squat_1rm"], 100.0);
    }
}
