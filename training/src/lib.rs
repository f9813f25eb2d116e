pub mod one_rep_max;
pub mod types;
pub mod units;

pub use one_rep_max::{brzycki, epley, estimate_one_rep_max, lombardi, MAX_RELIABLE_REPS};
pub use types::{
    Exercise, ExerciseCategory, Intensity, Routine, RoutineExercise, SetEntry, SetTemplate,
    WorkoutExercise, WorkoutRecord, WorkoutTree,
};
pub use units::{LengthUnit, MassUnit, UnitParseError};
