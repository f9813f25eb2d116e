//! Training streaks over calendar days.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Consecutive days with at least one completed workout, counted backward
/// from the most recent one.
///
/// The streak is only alive when the most recent workout happened today or
/// yesterday; otherwise it is 0. Days after `today` are ignored.
pub fn current_streak(days: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = days.iter().copied().filter(|d| *d <= today).collect();

    let Some(&latest) = days.last() else {
        return 0;
    };
    if today - latest > Duration::days(1) {
        return 0;
    }

    let mut streak = 0;
    let mut day = latest;
    while days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive training days anywhere in the history.
pub fn longest_streak(days: &[NaiveDate]) -> u32 {
    let days: BTreeSet<NaiveDate> = days.iter().copied().collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 20).unwrap() + Duration::days(offset)
    }

    #[test]
    fn test_three_consecutive_days() {
        assert_eq!(current_streak(&[d(0), d(-1), d(-2)], d(0)), 3);
    }

    #[test]
    fn test_gap_stops_the_walk() {
        assert_eq!(current_streak(&[d(0), d(-1), d(-2), d(-4), d(-5)], d(0)), 3);
    }

    #[test]
    fn test_old_activity_has_no_streak() {
        assert_eq!(current_streak(&[d(-5)], d(0)), 0);
    }

    #[test]
    fn test_streak_alive_from_yesterday() {
        assert_eq!(current_streak(&[d(-1), d(-2)], d(0)), 2);
    }

    #[test]
    fn test_two_days_ago_breaks_streak() {
        assert_eq!(current_streak(&[d(-2), d(-3)], d(0)), 0);
    }

    #[test]
    fn test_duplicates_and_order_do_not_matter() {
        assert_eq!(current_streak(&[d(-1), d(0), d(0), d(-1)], d(0)), 2);
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(current_streak(&[], d(0)), 0);
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn test_future_days_are_ignored() {
        assert_eq!(current_streak(&[d(1), d(0)], d(0)), 1);
    }

    #[test]
    fn test_longest_streak() {
        let days = [d(-10), d(-9), d(-8), d(-7), d(-3), d(-2), d(0)];
        assert_eq!(longest_streak(&days), 4);
    }
}
