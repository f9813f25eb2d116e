//! Strength-trend detection.
//!
//! Training frequency is irregular, so instead of fitting a trendline we
//! compare the best estimated one-rep max in a recent window against the best
//! in the window before it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::session::CompletedSession;

/// The recent window covers days `0..=14` before today.
pub const RECENT_WINDOW_DAYS: i64 = 14;

/// The previous window covers days `15..=60` before today.
pub const PREVIOUS_WINDOW_END_DAYS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrengthTrend {
    pub exercise_id: String,
    pub exercise_name: String,
    pub previous_best: f64,
    pub recent_best: f64,
    /// `recent_best - previous_best`, always positive.
    pub improvement: f64,
    pub improvement_pct: f64,
    /// Sessions across both windows.
    pub sessions: u32,
}

#[derive(Default)]
struct WindowStats {
    name: String,
    recent_best: Option<f64>,
    previous_best: Option<f64>,
    sessions: u32,
}

/// Exercises whose recent best beats their previous best, largest gain first.
///
/// An exercise qualifies only with at least one session in each window and
/// at least two sessions overall.
pub fn strength_trends(sessions: &[CompletedSession], today: NaiveDate) -> Vec<StrengthTrend> {
    let mut stats: BTreeMap<&str, WindowStats> = BTreeMap::new();

    for session in sessions {
        let days_ago = (today - session.day).num_days();
        if !(0..=PREVIOUS_WINDOW_END_DAYS).contains(&days_ago) {
            continue;
        }
        let recent = days_ago <= RECENT_WINDOW_DAYS;

        for performance in &session.exercises {
            if performance.best_one_rep_max <= 0.0 {
                continue;
            }
            let entry = stats.entry(performance.exercise_id.as_str()).or_default();
            if entry.name.is_empty() {
                entry.name = performance.exercise_name.clone();
            }
            entry.sessions += 1;
            let slot = if recent {
                &mut entry.recent_best
            } else {
                &mut entry.previous_best
            };
            *slot = Some(slot.map_or(performance.best_one_rep_max, |best| {
                best.max(performance.best_one_rep_max)
            }));
        }
    }

    let mut trends: Vec<StrengthTrend> = stats
        .into_iter()
        .filter_map(|(exercise_id, window)| {
            let recent_best = window.recent_best?;
            let previous_best = window.previous_best?;
            if window.sessions < 2 {
                return None;
            }
            let improvement = recent_best - previous_best;
            if improvement <= 0.0 {
                return None;
            }
            Some(StrengthTrend {
                exercise_id: exercise_id.to_string(),
                exercise_name: window.name,
                previous_best,
                recent_best,
                improvement,
                improvement_pct: improvement / previous_best * 100.0,
                sessions: window.sessions,
            })
        })
        .collect();

    trends.sort_by(|a, b| b.improvement.total_cmp(&a.improvement));
    trends
}
