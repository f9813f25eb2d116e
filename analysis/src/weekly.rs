use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Progress toward the weekly training goal for the ISO week containing
/// `today` (Monday through Sunday).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyCompletion {
    pub week_start: NaiveDate,
    pub training_days: u32,
    pub goal: u32,
    /// `training_days / goal`, capped at 1.0.
    pub ratio: f64,
}

pub fn weekly_completion(days: &[NaiveDate], today: NaiveDate, goal: u32) -> WeeklyCompletion {
    let goal = goal.max(1);
    let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

    let training_days = days
        .iter()
        .copied()
        .filter(|d| *d >= week_start && *d <= today)
        .collect::<BTreeSet<_>>()
        .len() as u32;

    WeeklyCompletion {
        week_start,
        training_days,
        goal,
        ratio: (f64::from(training_days) / f64::from(goal)).min(1.0),
    }
}
