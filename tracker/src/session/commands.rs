use tokio::sync::oneshot;
use training::{Intensity, MassUnit};

use super::lifecycle::{LifecycleOutcome, LifecycleSignal};
use super::snapshot::{AbandonedWorkoutInfo, SessionView, WorkoutHandle, WorkoutSummary};
use crate::persistence::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("A workout is already active")]
    AlreadyActive { workout_id: Option<String> },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Workout {0} is already finalized")]
    AlreadyFinalized(String),
    #[error("No active workout session")]
    NoActiveSession,
    #[error("The last remaining set cannot be removed")]
    LastSetProtected,
    #[error("A completed set cannot be removed")]
    SetCompletedProtected,
    #[error("Exercise {index} out of range (workout has {len})")]
    ExerciseOutOfRange { index: usize, len: usize },
    #[error("Set {set_number} out of range (exercise has {len})")]
    SetOutOfRange { set_number: u32, len: usize },
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Workout {workout_id} cannot be resumed: {reason}")]
    CorruptSession { workout_id: String, reason: String },
    #[error("Persistence failure: {message}")]
    PersistenceFailure { retryable: bool, message: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PersistenceError> for EngineError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::ActiveWorkoutExists => Self::AlreadyActive { workout_id: None },
            PersistenceError::WorkoutNotActive(id) => Self::AlreadyFinalized(id),
            PersistenceError::NotFound(what) => Self::NotFound(what),
            other => Self::PersistenceFailure {
                retryable: other.is_retryable(),
                message: other.to_string(),
            },
        }
    }
}

/// Partial edit of one set. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetUpdate {
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rest_seconds: Option<u32>,
    pub completed: Option<bool>,
    /// `Some(None)` clears the tag.
    pub intensity: Option<Option<Intensity>>,
    /// `Some(None)` clears the note.
    pub note: Option<Option<String>>,
}

impl SetUpdate {
    /// Mark a set done with the given reps and load.
    pub fn completed(reps: u32, weight_kg: f64) -> Self {
        Self {
            reps: Some(reps),
            weight_kg: Some(weight_kg),
            completed: Some(true),
            ..Self::default()
        }
    }

    /// Set the load from a value in the user's display unit.
    pub fn with_weight(mut self, value: f64, unit: MassUnit) -> Self {
        self.weight_kg = Some(unit.to_kg(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject loads SQLite cannot store or that make no sense on a bar.
    pub fn validate(&self) -> Result<(), EngineError> {
        match self.weight_kg {
            Some(w) if !w.is_finite() || w < 0.0 => {
                Err(EngineError::InvalidValue(format!("weight {w} kg")))
            }
            _ => Ok(()),
        }
    }
}

/// Where a new workout's structure comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRequest {
    /// Copy exercises and planned set counts from a routine.
    Routine(String),
    /// Start with the given exercises and the default set count.
    Exercises(Vec<String>),
}

/// Commands sent to the engine actor. Each embeds a oneshot for the reply.
pub enum EngineCommand {
    Start {
        request: StartRequest,
        reply: oneshot::Sender<Result<WorkoutHandle, EngineError>>,
    },
    Resume {
        workout_id: String,
        reply: oneshot::Sender<Result<WorkoutHandle, EngineError>>,
    },
    LogSet {
        exercise_index: usize,
        set_number: u32,
        update: SetUpdate,
        reply: oneshot::Sender<Result<SessionView, EngineError>>,
    },
    AddSet {
        exercise_index: usize,
        reply: oneshot::Sender<Result<SessionView, EngineError>>,
    },
    RemoveSet {
        exercise_index: usize,
        reply: oneshot::Sender<Result<SessionView, EngineError>>,
    },
    AddExercise {
        exercise_id: String,
        reply: oneshot::Sender<Result<SessionView, EngineError>>,
    },
    SetNotes {
        notes: Option<String>,
        reply: oneshot::Sender<Result<SessionView, EngineError>>,
    },
    Finalize {
        reply: oneshot::Sender<Result<WorkoutSummary, EngineError>>,
    },
    Discard {
        workout_id: String,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    RecoverAbandoned {
        reply: oneshot::Sender<Result<Option<AbandonedWorkoutInfo>, EngineError>>,
    },
    GetSession {
        reply: oneshot::Sender<Option<SessionView>>,
    },
    IsActive {
        reply: oneshot::Sender<bool>,
    },
    Lifecycle {
        signal: LifecycleSignal,
        reply: oneshot::Sender<Result<LifecycleOutcome, EngineError>>,
    },
    Shutdown {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
}
