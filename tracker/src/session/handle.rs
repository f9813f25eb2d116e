use tokio::sync::{mpsc, oneshot};

use super::commands::{EngineCommand, EngineError, SetUpdate, StartRequest};
use super::lifecycle::{LifecycleOutcome, LifecycleSignal};
use super::snapshot::{AbandonedWorkoutInfo, SessionView, WorkoutHandle, WorkoutSummary};

/// Cheap, cloneable handle to the engine actor.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<EngineCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn start(&self, request: StartRequest) -> Result<WorkoutHandle, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Start { request, reply: tx })
            .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn resume(&self, workout_id: &str) -> Result<WorkoutHandle, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Resume {
            workout_id: workout_id.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn log_set(
        &self,
        exercise_index: usize,
        set_number: u32,
        update: SetUpdate,
    ) -> Result<SessionView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::LogSet {
            exercise_index,
            set_number,
            update,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn add_set(&self, exercise_index: usize) -> Result<SessionView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::AddSet {
            exercise_index,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn remove_set(&self, exercise_index: usize) -> Result<SessionView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::RemoveSet {
            exercise_index,
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn add_exercise(&self, exercise_id: &str) -> Result<SessionView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::AddExercise {
            exercise_id: exercise_id.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn set_notes(&self, notes: Option<String>) -> Result<SessionView, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::SetNotes { notes, reply: tx })
            .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn finalize(&self) -> Result<WorkoutSummary, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Finalize { reply: tx }).await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn discard(&self, workout_id: &str) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Discard {
            workout_id: workout_id.to_string(),
            reply: tx,
        })
        .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn recover_abandoned(&self) -> Result<Option<AbandonedWorkoutInfo>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::RecoverAbandoned { reply: tx })
            .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    pub async fn current_session(&self) -> Result<Option<SessionView>, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::GetSession { reply: tx }).await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))
    }

    pub async fn is_active(&self) -> Result<bool, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::IsActive { reply: tx }).await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))
    }

    pub async fn lifecycle(&self, signal: LifecycleSignal) -> Result<LifecycleOutcome, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Lifecycle { signal, reply: tx })
            .await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    /// Flush pending state and stop the actor.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineCommand::Shutdown { reply: tx }).await?;
        rx.await
            .map_err(|_| EngineError::Internal("Reply dropped".into()))?
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| EngineError::Internal("Engine actor closed".into()))
    }
}
