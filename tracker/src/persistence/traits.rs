//! Async repository trait definitions for the persistence layer.
//!
//! Each trait abstracts over one aggregate and is used through static
//! dispatch. Methods return `impl Future + Send` so that callers can move
//! the futures into `tokio::spawn`.

use chrono::{DateTime, Utc};
use std::future::Future;
use training::{Exercise, Routine, SetEntry, WorkoutRecord, WorkoutTree};

use super::{ExportBundle, ImportReport, PersistenceError};

/// Repository for workouts with their exercises and sets.
///
/// Every method that touches more than one row runs inside a single
/// transaction: readers never observe a half-written tree.
pub trait WorkoutRepository: Send + Sync {
    /// Insert a new active workout together with its exercises and sets.
    ///
    /// Fails with [`PersistenceError::ActiveWorkoutExists`] when another
    /// workout is already active.
    fn create_workout(
        &self,
        tree: &WorkoutTree,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn load_workout_tree(
        &self,
        workout_id: &str,
    ) -> impl Future<Output = Result<Option<WorkoutTree>, PersistenceError>> + Send;

    /// Replace the full set list of one workout exercise.
    fn replace_sets(
        &self,
        workout_exercise_id: &str,
        sets: &[SetEntry],
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Overwrite notes, exercises and sets of an active workout.
    fn save_workout_tree(
        &self,
        tree: &WorkoutTree,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// Write the final tree and stamp completion in one transaction.
    fn finalize_workout(
        &self,
        tree: &WorkoutTree,
        completed_at: DateTime<Utc>,
        duration_secs: i64,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn delete_workout(
        &self,
        workout_id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    fn find_active_workout(
        &self,
    ) -> impl Future<Output = Result<Option<WorkoutRecord>, PersistenceError>> + Send;

    /// Id of the active workout, read without decoding the rest of its row.
    fn find_active_workout_id(
        &self,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    /// Completed sets of the most recent completed workout, started before
    /// `before`, in which `exercise_id` had at least one completed set.
    fn find_previous_performance(
        &self,
        exercise_id: &str,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Vec<SetEntry>>, PersistenceError>> + Send;

    /// Completed workouts, most recent first, optionally limited to those
    /// completed at or after `since`.
    fn list_completed_workouts(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<WorkoutTree>, PersistenceError>> + Send;

    /// Completion timestamps of every completed workout, most recent first.
    fn completion_times(
        &self,
    ) -> impl Future<Output = Result<Vec<DateTime<Utc>>, PersistenceError>> + Send;
}

/// Repository for the exercise catalog and routine templates.
pub trait CatalogRepository: Send + Sync {
    fn save_exercise(
        &self,
        exercise: &Exercise,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_exercise(
        &self,
        exercise_id: &str,
    ) -> impl Future<Output = Result<Option<Exercise>, PersistenceError>> + Send;
    fn list_exercises(
        &self,
    ) -> impl Future<Output = Result<Vec<Exercise>, PersistenceError>> + Send;

    /// Insert or replace a routine and its ordered exercise list.
    fn save_routine(
        &self,
        routine: &Routine,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn load_routine(
        &self,
        routine_id: &str,
    ) -> impl Future<Output = Result<Option<Routine>, PersistenceError>> + Send;
    fn list_routines(
        &self,
    ) -> impl Future<Output = Result<Vec<Routine>, PersistenceError>> + Send;
    fn delete_routine(
        &self,
        routine_id: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// Key/value store for user preferences.
pub trait PreferenceRepository: Send + Sync {
    fn get_preference(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;
    fn set_preference(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn delete_preference(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
    fn list_preferences(
        &self,
    ) -> impl Future<Output = Result<Vec<(String, String)>, PersistenceError>> + Send;
}

/// Whole-database export and import.
pub trait TransferRepository: Send + Sync {
    fn export_bundle(
        &self,
        exported_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ExportBundle, PersistenceError>> + Send;

    /// Import a bundle atomically: either every record lands or none does.
    fn import_bundle(
        &self,
        bundle: &ExportBundle,
    ) -> impl Future<Output = Result<ImportReport, PersistenceError>> + Send;
}
