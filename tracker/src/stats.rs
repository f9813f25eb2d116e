//! Analytics over finalized workouts.
//!
//! Only completed workouts feed these numbers; the active workout never
//! counts toward a streak or a trend until it is finalized.

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

use analysis::{CompletedSession, StrengthTrend, WeeklyCompletion, PREVIOUS_WINDOW_END_DAYS};

use crate::clock::Clock;
use crate::persistence::traits::WorkoutRepository;
use crate::persistence::PersistenceError;

/// Everything the stats screen shows, computed at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub today: NaiveDate,
    pub total_workouts: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub weekly: WeeklyCompletion,
    pub trends: Vec<StrengthTrend>,
}

pub struct AnalyticsAggregator<W> {
    workouts: Arc<W>,
    clock: Arc<dyn Clock>,
    /// Offset used to turn completion instants into calendar days.
    offset: FixedOffset,
}

impl<W: WorkoutRepository> AnalyticsAggregator<W> {
    pub fn new(workouts: Arc<W>, clock: Arc<dyn Clock>, offset: FixedOffset) -> Self {
        Self {
            workouts,
            clock,
            offset,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    /// Calendar day of every completed workout, newest first.
    async fn training_days(&self) -> Result<Vec<NaiveDate>, PersistenceError> {
        let times = self.workouts.completion_times().await?;
        Ok(times
            .into_iter()
            .map(|t| t.with_timezone(&self.offset).date_naive())
            .collect())
    }

    pub async fn current_streak(&self) -> Result<u32, PersistenceError> {
        let days = self.training_days().await?;
        Ok(analysis::current_streak(&days, self.today()))
    }

    pub async fn longest_streak(&self) -> Result<u32, PersistenceError> {
        let days = self.training_days().await?;
        Ok(analysis::longest_streak(&days))
    }

    pub async fn weekly_completion(&self, goal: u32) -> Result<WeeklyCompletion, PersistenceError> {
        let days = self.training_days().await?;
        Ok(analysis::weekly_completion(&days, self.today(), goal))
    }

    pub async fn strength_trends(&self) -> Result<Vec<StrengthTrend>, PersistenceError> {
        let today = self.today();
        let sessions = self.sessions_since(today).await?;
        Ok(analysis::strength_trends(&sessions, today))
    }

    /// Completed sessions inside the trend lookback window.
    async fn sessions_since(&self, today: NaiveDate) -> Result<Vec<CompletedSession>, PersistenceError> {
        // One extra day so the window edge survives any offset.
        let since = self.clock.now() - Duration::days(PREVIOUS_WINDOW_END_DAYS + 1);
        let trees = self.workouts.list_completed_workouts(Some(since)).await?;
        Ok(trees
            .iter()
            .filter_map(|tree| CompletedSession::from_tree(tree, &self.offset))
            .filter(|session| session.day <= today)
            .collect())
    }

    pub async fn report(&self, weekly_goal: u32) -> Result<StatsReport, PersistenceError> {
        let today = self.today();
        let days = self.training_days().await?;
        let sessions = self.sessions_since(today).await?;

        let report = StatsReport {
            today,
            total_workouts: days.len(),
            current_streak: analysis::current_streak(&days, today),
            longest_streak: analysis::longest_streak(&days),
            weekly: analysis::weekly_completion(&days, today, weekly_goal),
            trends: analysis::strength_trends(&sessions, today),
        };
        tracing::debug!(
            workouts = report.total_workouts,
            streak = report.current_streak,
            trends = report.trends.len(),
            "Stats computed"
        );
        Ok(report)
    }
}
