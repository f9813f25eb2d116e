//! Canonical training data model shared by persistence, the session engine
//! and analytics. Weights are always kilograms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::one_rep_max::estimate_one_rep_max;

/// Optional training-intensity tag on a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Heavy,
    Moderate,
    Light,
}

impl Intensity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heavy => "heavy",
            Self::Moderate => "moderate",
            Self::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "heavy" => Some(Self::Heavy),
            "moderate" => Some(Self::Moderate),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseCategory {
    Barbell,
    Dumbbell,
    Machine,
    Cable,
    Bodyweight,
    Cardio,
    Other,
}

impl ExerciseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Barbell => "barbell",
            Self::Dumbbell => "dumbbell",
            Self::Machine => "machine",
            Self::Cable => "cable",
            Self::Bodyweight => "bodyweight",
            Self::Cardio => "cardio",
            Self::Other => "other",
        }
    }

    /// Unknown categories decode as `Other` rather than failing.
    pub fn parse(value: &str) -> Self {
        match value {
            "barbell" => Self::Barbell,
            "dumbbell" => Self::Dumbbell,
            "machine" => Self::Machine,
            "cable" => Self::Cable,
            "bodyweight" => Self::Bodyweight,
            "cardio" => Self::Cardio,
            _ => Self::Other,
        }
    }
}

/// Catalog entry, built-in or user-created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub primary_muscle: String,
    pub secondary_muscles: Vec<String>,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineExercise {
    pub exercise_id: String,
    pub target_sets: u32,
}

/// Reusable workout template: ordered exercises with planned set counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    pub name: String,
    pub exercises: Vec<RoutineExercise>,
    pub created_at: DateTime<Utc>,
}

/// The values a new set is seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetTemplate {
    pub reps: u32,
    pub weight_kg: f64,
    pub rest_seconds: u32,
}

impl Default for SetTemplate {
    fn default() -> Self {
        Self {
            reps: 10,
            weight_kg: 0.0,
            rest_seconds: 90,
        }
    }
}

/// One logged attempt within a workout exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    /// 1-based and contiguous within its exercise.
    pub set_number: u32,
    pub reps: u32,
    pub weight_kg: f64,
    pub rest_seconds: u32,
    pub completed: bool,
    pub intensity: Option<Intensity>,
    pub note: Option<String>,
}

impl SetEntry {
    pub fn from_template(set_number: u32, template: SetTemplate) -> Self {
        Self {
            set_number,
            reps: template.reps,
            weight_kg: template.weight_kg,
            rest_seconds: template.rest_seconds,
            completed: false,
            intensity: None,
            note: None,
        }
    }

    pub fn template(&self) -> SetTemplate {
        SetTemplate {
            reps: self.reps,
            weight_kg: self.weight_kg,
            rest_seconds: self.rest_seconds,
        }
    }

    pub fn estimated_one_rep_max(&self) -> f64 {
        estimate_one_rep_max(self.weight_kg, self.reps)
    }

    pub fn volume_kg(&self) -> f64 {
        self.weight_kg * f64::from(self.reps)
    }
}

/// One exercise instance inside a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutExercise {
    pub id: String,
    pub exercise_id: String,
    /// Catalog name at load time; not stored on the workout row.
    pub exercise_name: String,
    pub position: u32,
    /// Planned set count copied from the routine when the workout started.
    pub planned_sets: u32,
    pub sets: Vec<SetEntry>,
}

impl WorkoutExercise {
    pub fn count_completed(&self) -> u32 {
        self.sets.iter().filter(|s| s.completed).count() as u32
    }

    /// Best estimated one-rep max over completed sets with real load.
    pub fn best_one_rep_max(&self) -> Option<f64> {
        self.sets
            .iter()
            .filter(|s| s.completed && s.reps > 0 && s.weight_kg > 0.0)
            .map(SetEntry::estimated_one_rep_max)
            .fold(None, |best, value| match best {
                Some(b) if b >= value => Some(b),
                _ => Some(value),
            })
    }

    pub fn completed_volume_kg(&self) -> f64 {
        self.sets
            .iter()
            .filter(|s| s.completed)
            .map(SetEntry::volume_kg)
            .sum()
    }
}

/// Workout header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: String,
    pub routine_id: Option<String>,
    pub routine_name: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub notes: Option<String>,
}

impl WorkoutRecord {
    /// A workout without a completion timestamp is active.
    pub fn is_active(&self) -> bool {
        self.completed_at.is_none()
    }
}

/// A workout together with its exercises and sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTree {
    pub workout: WorkoutRecord,
    pub exercises: Vec<WorkoutExercise>,
}

impl WorkoutTree {
    /// Check the structural invariants a stored tree must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        for (index, exercise) in self.exercises.iter().enumerate() {
            for (offset, set) in exercise.sets.iter().enumerate() {
                let expected = offset as u32 + 1;
                if set.set_number != expected {
                    return Err(format!(
                        "exercise {} has set {} where set {} was expected",
                        index, set.set_number, expected
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn completed_sets(&self) -> u32 {
        self.exercises.iter().map(WorkoutExercise::count_completed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(n: u32, reps: u32, weight: f64, completed: bool) -> SetEntry {
        SetEntry {
            set_number: n,
            reps,
            weight_kg: weight,
            rest_seconds: 90,
            completed,
            intensity: None,
            note: None,
        }
    }

    fn exercise(sets: Vec<SetEntry>) -> WorkoutExercise {
        WorkoutExercise {
            id: "we-1".to_string(),
            exercise_id: "squat".to_string(),
            exercise_name: "Squat".to_string(),
            position: 0,
            planned_sets: sets.len() as u32,
            sets,
        }
    }

    fn tree(exercises: Vec<WorkoutExercise>) -> WorkoutTree {
        WorkoutTree {
            workout: WorkoutRecord {
                id: "w-1".to_string(),
                routine_id: None,
                routine_name: None,
                started_at: Utc::now(),
                completed_at: None,
                duration_secs: None,
                notes: None,
            },
            exercises,
        }
    }

    #[test]
    fn test_intensity_roundtrip() {
        for tag in [Intensity::Heavy, Intensity::Moderate, Intensity::Light] {
            assert_eq!(Intensity::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(Intensity::parse("brutal"), None);
    }

    #[test]
    fn test_unknown_category_decodes_as_other() {
        assert_eq!(ExerciseCategory::parse("kettlebell"), ExerciseCategory::Other);
        assert_eq!(ExerciseCategory::parse("cable"), ExerciseCategory::Cable);
    }

    #[test]
    fn test_best_one_rep_max_ignores_incomplete_sets() {
        let ex = exercise(vec![
            set(1, 5, 100.0, true),
            set(2, 1, 200.0, false),
            set(3, 8, 0.0, true),
        ]);
        let best = ex.best_one_rep_max().unwrap();
        assert!(best > 100.0 && best < 200.0);
        assert_eq!(ex.count_completed(), 2);
    }

    #[test]
    fn test_best_one_rep_max_none_without_completed_sets() {
        let ex = exercise(vec![set(1, 5, 100.0, false)]);
        assert_eq!(ex.best_one_rep_max(), None);
    }

    #[test]
    fn test_completed_volume() {
        let ex = exercise(vec![set(1, 5, 100.0, true), set(2, 5, 100.0, false)]);
        assert_eq!(ex.completed_volume_kg(), 500.0);
    }

    #[test]
    fn test_validate_accepts_contiguous_sets() {
        let t = tree(vec![exercise(vec![set(1, 5, 60.0, true), set(2, 5, 60.0, false)])]);
        assert!(t.validate().is_ok());
        assert!(t.workout.is_active());
    }

    #[test]
    fn test_validate_rejects_gaps() {
        let t = tree(vec![exercise(vec![set(1, 5, 60.0, true), set(3, 5, 60.0, false)])]);
        let err = t.validate().unwrap_err();
        assert!(err.contains("set 3"));
    }

    #[test]
    fn test_seeded_set_is_incomplete() {
        let entry = SetEntry::from_template(2, SetTemplate::default());
        assert_eq!(entry.set_number, 2);
        assert!(!entry.completed);
        assert_eq!(entry.template(), SetTemplate::default());
    }
}
