use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use training::WorkoutTree;

/// Best performance of one exercise within a completed workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExercisePerformance {
    pub exercise_id: String,
    pub exercise_name: String,
    pub best_one_rep_max: f64,
}

/// A finalized workout reduced to what analytics needs: its calendar day and
/// per-exercise best estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub workout_id: String,
    pub day: NaiveDate,
    pub exercises: Vec<ExercisePerformance>,
}

impl CompletedSession {
    /// Returns `None` for workouts that are still active.
    pub fn from_tree(tree: &WorkoutTree, offset: &FixedOffset) -> Option<Self> {
        let completed_at = tree.workout.completed_at?;
        let day = completed_at.with_timezone(offset).date_naive();
        let exercises = tree
            .exercises
            .iter()
            .filter_map(|exercise| {
                exercise
                    .best_one_rep_max()
                    .map(|best_one_rep_max| ExercisePerformance {
                        exercise_id: exercise.exercise_id.clone(),
                        exercise_name: exercise.exercise_name.clone(),
                        best_one_rep_max,
                    })
            })
            .collect();

        Some(Self {
            workout_id: tree.workout.id.clone(),
            day,
            exercises,
        })
    }
}
