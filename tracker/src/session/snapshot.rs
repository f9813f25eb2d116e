use chrono::{DateTime, Utc};
use serde::Serialize;
use training::{SetEntry, WorkoutTree};

use super::autosave::SaveStatus;

/// Identity of a workout the engine is working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkoutHandle {
    pub workout_id: String,
    pub routine_id: Option<String>,
    pub routine_name: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl WorkoutHandle {
    pub(crate) fn from_tree(tree: &WorkoutTree) -> Self {
        Self {
            workout_id: tree.workout.id.clone(),
            routine_id: tree.workout.routine_id.clone(),
            routine_name: tree.workout.routine_name.clone(),
            started_at: tree.workout.started_at,
        }
    }
}

/// Immutable view of the active session, taken at the moment of the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub workout_id: String,
    pub routine_name: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Wall-clock time since `started_at`, recomputed on every view.
    pub elapsed_secs: i64,
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseView>,
    pub completed_sets: u32,
    pub save_status: SaveStatus,
    pub unsaved_changes: bool,
    pub failed_saves: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseView {
    pub index: usize,
    pub exercise_id: String,
    pub name: String,
    pub planned_sets: u32,
    pub completed_sets: u32,
    pub sets: Vec<SetEntry>,
}

/// Best estimated one-rep max of one exercise in a finished workout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseBest {
    pub exercise_id: String,
    pub name: String,
    pub one_rep_max_kg: f64,
}

/// Returned by finalize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub workout_id: String,
    pub routine_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub exercise_count: usize,
    pub completed_sets: u32,
    pub total_volume_kg: f64,
    pub bests: Vec<ExerciseBest>,
}

impl WorkoutSummary {
    pub(crate) fn from_tree(
        tree: &WorkoutTree,
        completed_at: DateTime<Utc>,
        duration_secs: i64,
    ) -> Self {
        let bests = tree
            .exercises
            .iter()
            .filter_map(|exercise| {
                exercise.best_one_rep_max().map(|best| ExerciseBest {
                    exercise_id: exercise.exercise_id.clone(),
                    name: exercise.exercise_name.clone(),
                    one_rep_max_kg: best,
                })
            })
            .collect();

        Self {
            workout_id: tree.workout.id.clone(),
            routine_name: tree.workout.routine_name.clone(),
            started_at: tree.workout.started_at,
            completed_at,
            duration_secs,
            exercise_count: tree.exercises.len(),
            completed_sets: tree.completed_sets(),
            total_volume_kg: tree.exercises.iter().map(|e| e.completed_volume_kg()).sum(),
            bests,
        }
    }
}

/// An active workout found at cold start that no session was attached to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbandonedWorkoutInfo {
    pub workout_id: String,
    pub routine_id: Option<String>,
    pub routine_name: Option<String>,
    /// `None` when the stored header itself cannot be decoded.
    pub started_at: Option<DateTime<Utc>>,
    pub exercise_count: usize,
    pub completed_sets: u32,
    /// False when the stored tree fails validation; `problem` says why.
    pub resumable: bool,
    pub problem: Option<String>,
}
