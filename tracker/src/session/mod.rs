//! The workout session engine.
//!
//! [`WorkoutEngine`] owns the single active workout. Mutations apply to
//! memory synchronously; durability follows one of two paths:
//!
//! - **Debounced**: set logging and note edits request a save that the
//!   periodic [`WorkoutEngine::tick`] starts on a background task once the
//!   debounce window has passed.
//! - **Urgent**: structural changes, suspension, finalize and shutdown wait
//!   for any running background write, then write inline and surface errors.
//!
//! The engine runs inside an actor (see [`actor`]) and is reached through a
//! cloneable [`EngineHandle`].

pub mod actor;
pub mod autosave;
pub mod commands;
pub mod handle;
pub mod lifecycle;
pub mod seeding;
pub mod snapshot;
pub(crate) mod state;

use chrono::SubsecRound;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use training::{WorkoutExercise, WorkoutRecord, WorkoutTree};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::persistence::traits::{CatalogRepository, WorkoutRepository};
use crate::persistence::{generate_id, PersistenceError};
use autosave::Autosave;
pub use commands::{EngineError, SetUpdate, StartRequest};
pub use handle::EngineHandle;
pub use lifecycle::{LifecycleCoordinator, LifecycleOutcome, LifecycleSignal};
pub use snapshot::{AbandonedWorkoutInfo, SessionView, WorkoutHandle, WorkoutSummary};
use state::ActiveSession;

/// A background write started by [`WorkoutEngine::tick`].
struct InFlightSave {
    workout_id: String,
    revision: u64,
    task: JoinHandle<Result<(), PersistenceError>>,
}

pub struct WorkoutEngine<W, C> {
    workouts: Arc<W>,
    catalog: Arc<C>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    session: Option<ActiveSession>,
    autosave: Autosave,
    in_flight: Option<InFlightSave>,
}

impl<W, C> WorkoutEngine<W, C>
where
    W: WorkoutRepository + 'static,
    C: CatalogRepository + 'static,
{
    pub fn new(
        workouts: Arc<W>,
        catalog: Arc<C>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let autosave = Autosave::new(config.autosave_debounce, config.autosave_cooldown);
        Self {
            workouts,
            catalog,
            clock,
            config,
            session: None,
            autosave,
            in_flight: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a workout is loaded in this engine.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_session(&self) -> Option<SessionView> {
        self.session.as_ref().map(|session| {
            let mut view = session.view(self.clock.now());
            view.save_status = self.autosave.status();
            view.failed_saves = self.autosave.consecutive_failures();
            view
        })
    }

    fn view(&self) -> Result<SessionView, EngineError> {
        self.current_session().ok_or(EngineError::NoActiveSession)
    }

    fn session_mut(&mut self) -> Result<&mut ActiveSession, EngineError> {
        self.session.as_mut().ok_or(EngineError::NoActiveSession)
    }

    fn attach(&mut self, session: ActiveSession) {
        self.autosave.reset();
        self.session = Some(session);
    }

    // ── Lifecycle of a workout ─────────────────────────────────────────

    /// Create and persist a new active workout.
    pub async fn start(&mut self, request: StartRequest) -> Result<WorkoutHandle, EngineError> {
        if let Some(session) = &self.session {
            return Err(EngineError::AlreadyActive {
                workout_id: Some(session.workout_id().to_string()),
            });
        }
        // Another process may own an active workout.
        if let Some(workout_id) = self.workouts.find_active_workout_id().await? {
            return Err(EngineError::AlreadyActive {
                workout_id: Some(workout_id),
            });
        }

        let started_at = self.clock.now().trunc_subsecs(0);
        let (routine_id, routine_name, plan) = match request {
            StartRequest::Routine(routine_id) => {
                let routine = self
                    .catalog
                    .load_routine(&routine_id)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("routine {routine_id}")))?;
                let plan: Vec<(String, u32)> = routine
                    .exercises
                    .into_iter()
                    .map(|e| (e.exercise_id, e.target_sets.max(1)))
                    .collect();
                (Some(routine.id), Some(routine.name), plan)
            }
            StartRequest::Exercises(ids) => {
                let sets = self.config.default_exercise_sets;
                (None, None, ids.into_iter().map(|id| (id, sets)).collect())
            }
        };

        let mut exercises = Vec::with_capacity(plan.len());
        let mut history = Vec::with_capacity(plan.len());
        for (position, (exercise_id, planned_sets)) in plan.into_iter().enumerate() {
            let (exercise, prior) = self
                .prepare_exercise(exercise_id, planned_sets, started_at)
                .await?;
            exercises.push(WorkoutExercise {
                position: position as u32,
                ..exercise
            });
            history.push(prior);
        }

        let tree = WorkoutTree {
            workout: WorkoutRecord {
                id: generate_id(),
                routine_id,
                routine_name,
                started_at,
                completed_at: None,
                duration_secs: None,
                notes: None,
            },
            exercises,
        };

        match self.workouts.create_workout(&tree).await {
            Ok(()) => {}
            Err(PersistenceError::ActiveWorkoutExists) => {
                let workout_id = self.workouts.find_active_workout_id().await.ok().flatten();
                return Err(EngineError::AlreadyActive { workout_id });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            workout_id = %tree.workout.id,
            routine = tree.workout.routine_name.as_deref().unwrap_or("-"),
            exercises = tree.exercises.len(),
            "Workout started"
        );
        let handle = WorkoutHandle::from_tree(&tree);
        self.attach(ActiveSession::new(tree, history));
        Ok(handle)
    }

    /// Build a seeded exercise for the workout. Position is left at 0.
    async fn prepare_exercise(
        &self,
        exercise_id: String,
        planned_sets: u32,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(WorkoutExercise, Vec<training::SetEntry>), EngineError> {
        let exercise = self
            .catalog
            .load_exercise(&exercise_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("exercise {exercise_id}")))?;
        let prior = self
            .workouts
            .find_previous_performance(&exercise_id, started_at)
            .await?
            .unwrap_or_default();
        let sets = seeding::initial_sets(&prior, planned_sets, self.config.default_set);

        Ok((
            WorkoutExercise {
                id: generate_id(),
                exercise_id,
                exercise_name: exercise.name,
                position: 0,
                planned_sets,
                sets,
            },
            prior,
        ))
    }

    /// Load a persisted active workout into memory.
    pub async fn resume(&mut self, workout_id: &str) -> Result<WorkoutHandle, EngineError> {
        if let Some(session) = &self.session {
            if session.workout_id() == workout_id {
                return Ok(WorkoutHandle::from_tree(session.tree()));
            }
            return Err(EngineError::AlreadyActive {
                workout_id: Some(session.workout_id().to_string()),
            });
        }

        let tree = match self.workouts.load_workout_tree(workout_id).await {
            Ok(Some(tree)) => tree,
            Ok(None) => return Err(EngineError::NotFound(format!("workout {workout_id}"))),
            Err(PersistenceError::Corrupt(reason)) => {
                return Err(EngineError::CorruptSession {
                    workout_id: workout_id.to_string(),
                    reason,
                })
            }
            Err(e) => return Err(e.into()),
        };
        if !tree.workout.is_active() {
            return Err(EngineError::AlreadyFinalized(workout_id.to_string()));
        }
        tree.validate()
            .map_err(|reason| EngineError::CorruptSession {
                workout_id: workout_id.to_string(),
                reason,
            })?;

        let mut history = Vec::with_capacity(tree.exercises.len());
        for exercise in &tree.exercises {
            let prior = self
                .workouts
                .find_previous_performance(&exercise.exercise_id, tree.workout.started_at)
                .await?
                .unwrap_or_default();
            history.push(prior);
        }

        tracing::info!(workout_id = %workout_id, "Workout resumed");
        let handle = WorkoutHandle::from_tree(&tree);
        self.attach(ActiveSession::new(tree, history));
        Ok(handle)
    }

    /// Stamp completion and persist the final tree in one transaction.
    pub async fn finalize(&mut self) -> Result<WorkoutSummary, EngineError> {
        if self.session.is_none() {
            return Err(EngineError::NoActiveSession);
        }
        self.settle().await;

        let session = self.session.as_ref().ok_or(EngineError::NoActiveSession)?;
        let completed_at = self.clock.now().trunc_subsecs(0);
        let duration_secs = (completed_at - session.started_at()).num_seconds().max(0);

        self.autosave.begin(Instant::now());
        let result = self
            .workouts
            .finalize_workout(session.tree(), completed_at, duration_secs)
            .await;
        self.autosave.finish(Instant::now(), result.is_ok());

        match result {
            Ok(()) => {}
            Err(PersistenceError::WorkoutNotActive(id)) => {
                // Finished or discarded elsewhere; nothing left to attach to.
                tracing::warn!(workout_id = %id, "Workout no longer active in storage");
                self.session = None;
                self.autosave.reset();
                return Err(EngineError::AlreadyFinalized(id));
            }
            Err(e) => {
                tracing::error!(error = %e, "Finalize failed");
                return Err(e.into());
            }
        }

        let Some(session) = self.session.take() else {
            return Err(EngineError::NoActiveSession);
        };
        self.autosave.reset();

        let tree = session.into_tree();
        let summary = WorkoutSummary::from_tree(&tree, completed_at, duration_secs);
        tracing::info!(
            workout_id = %summary.workout_id,
            duration_secs,
            completed_sets = summary.completed_sets,
            "Workout finalized"
        );
        Ok(summary)
    }

    /// Delete an active workout at the user's request.
    pub async fn discard(&mut self, workout_id: &str) -> Result<(), EngineError> {
        self.settle().await;

        let attached = self
            .session
            .as_ref()
            .is_some_and(|s| s.workout_id() == workout_id);
        if !attached {
            match self.workouts.load_workout_tree(workout_id).await {
                Ok(None) => return Err(EngineError::NotFound(format!("workout {workout_id}"))),
                Ok(Some(tree)) if !tree.workout.is_active() => {
                    return Err(EngineError::AlreadyFinalized(workout_id.to_string()))
                }
                Ok(Some(_)) | Err(PersistenceError::Corrupt(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }

        self.workouts.delete_workout(workout_id).await?;
        if attached {
            self.session = None;
            self.autosave.reset();
        }
        tracing::info!(workout_id = %workout_id, "Workout discarded");
        Ok(())
    }

    /// Surface an active workout left behind by a previous process.
    ///
    /// Never resumes, finalizes or discards on its own.
    pub async fn recover_abandoned(&mut self) -> Result<Option<AbandonedWorkoutInfo>, EngineError> {
        if self.session.is_some() {
            return Ok(None);
        }
        let record = match self.workouts.find_active_workout().await {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(None),
            Err(PersistenceError::Corrupt(reason)) => {
                let Some(workout_id) = self.workouts.find_active_workout_id().await? else {
                    return Ok(None);
                };
                tracing::warn!(%workout_id, %reason, "Found abandoned workout with a corrupt header");
                return Ok(Some(AbandonedWorkoutInfo {
                    workout_id,
                    routine_id: None,
                    routine_name: None,
                    started_at: None,
                    exercise_count: 0,
                    completed_sets: 0,
                    resumable: false,
                    problem: Some(reason),
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let info = match self.workouts.load_workout_tree(&record.id).await {
            Ok(None) => return Ok(None),
            Ok(Some(tree)) => {
                let problem = tree.validate().err();
                AbandonedWorkoutInfo {
                    workout_id: record.id,
                    routine_id: record.routine_id,
                    routine_name: record.routine_name,
                    started_at: Some(record.started_at),
                    exercise_count: tree.exercises.len(),
                    completed_sets: tree.completed_sets(),
                    resumable: problem.is_none(),
                    problem,
                }
            }
            Err(PersistenceError::Corrupt(reason)) => AbandonedWorkoutInfo {
                workout_id: record.id,
                routine_id: record.routine_id,
                routine_name: record.routine_name,
                started_at: Some(record.started_at),
                exercise_count: 0,
                completed_sets: 0,
                resumable: false,
                problem: Some(reason),
            },
            Err(e) => return Err(e.into()),
        };

        tracing::warn!(
            workout_id = %info.workout_id,
            resumable = info.resumable,
            "Found abandoned workout"
        );
        Ok(Some(info))
    }

    // ── Mutations ──────────────────────────────────────────────────────

    pub async fn log_set(
        &mut self,
        exercise_index: usize,
        set_number: u32,
        update: SetUpdate,
    ) -> Result<SessionView, EngineError> {
        self.session_mut()?
            .log_set(exercise_index, set_number, &update)?;
        self.autosave.request(Instant::now());
        self.view()
    }

    pub async fn add_set(&mut self, exercise_index: usize) -> Result<SessionView, EngineError> {
        let fallback = self.config.default_set;
        self.session_mut()?.add_set(exercise_index, fallback)?;
        self.save_urgent().await?;
        self.view()
    }

    pub async fn remove_set(&mut self, exercise_index: usize) -> Result<SessionView, EngineError> {
        self.session_mut()?.remove_set(exercise_index)?;
        self.save_urgent().await?;
        self.view()
    }

    pub async fn add_exercise(&mut self, exercise_id: &str) -> Result<SessionView, EngineError> {
        let started_at = self
            .session
            .as_ref()
            .ok_or(EngineError::NoActiveSession)?
            .started_at();
        let planned_sets = self.config.default_exercise_sets;
        let (exercise, prior) = self
            .prepare_exercise(exercise_id.to_string(), planned_sets, started_at)
            .await?;

        self.session_mut()?.add_exercise(exercise, prior);
        self.save_urgent().await?;
        self.view()
    }

    pub async fn set_notes(&mut self, notes: Option<String>) -> Result<SessionView, EngineError> {
        self.session_mut()?.set_notes(notes);
        self.autosave.request(Instant::now());
        self.view()
    }

    // ── Durability ─────────────────────────────────────────────────────

    /// Drive the debounced autosave. Called from the actor's interval.
    pub async fn tick(&mut self) {
        if self
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.task.is_finished())
        {
            self.settle().await;
        }
        if self.in_flight.is_some() {
            return;
        }

        let now = Instant::now();
        if !self.autosave.is_due(now) {
            return;
        }
        let Some(session) = &self.session else {
            self.autosave.reset();
            return;
        };
        let Some(write) = session.pending_write() else {
            self.autosave.reset();
            return;
        };

        let workout_id = session.workout_id().to_string();
        let revision = session.revision();
        tracing::debug!(kind = write.kind(), revision, "Starting background save");

        self.autosave.begin(now);
        let repo = Arc::clone(&self.workouts);
        let task = tokio::spawn(async move { write.apply(repo.as_ref()).await });
        self.in_flight = Some(InFlightSave {
            workout_id,
            revision,
            task,
        });
    }

    /// Wait for the running background write, if any, and record its outcome.
    pub async fn settle(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            let result = flight.task.await;
            self.complete_background_save(&flight.workout_id, flight.revision, result);
        }
    }

    fn complete_background_save(
        &mut self,
        workout_id: &str,
        revision: u64,
        result: Result<Result<(), PersistenceError>, JoinError>,
    ) {
        let now = Instant::now();
        let outcome = match result {
            Ok(inner) => inner.map_err(|e| e.to_string()),
            Err(join) => Err(join.to_string()),
        };
        match outcome {
            Ok(()) => {
                if let Some(session) = self
                    .session
                    .as_mut()
                    .filter(|s| s.workout_id() == workout_id)
                {
                    session.mark_saved(revision);
                }
                self.autosave.finish(now, true);
                tracing::debug!(workout_id = %workout_id, revision, "Background save complete");
            }
            Err(message) => {
                self.autosave.finish(now, false);
                tracing::warn!(
                    workout_id = %workout_id,
                    failures = self.autosave.consecutive_failures(),
                    "Background save failed, will retry: {}",
                    message
                );
            }
        }
    }

    /// Persist everything unsaved right now, after any running write.
    async fn save_urgent(&mut self) -> Result<(), EngineError> {
        self.settle().await;

        let Some(session) = &self.session else {
            return Ok(());
        };
        let Some(write) = session.pending_write() else {
            return Ok(());
        };
        let revision = session.revision();

        self.autosave.begin(Instant::now());
        let result = write.apply(self.workouts.as_ref()).await;
        self.autosave.finish(Instant::now(), result.is_ok());

        match result {
            Ok(()) => {
                if let Some(session) = self.session.as_mut() {
                    session.mark_saved(revision);
                }
                tracing::debug!(kind = write.kind(), revision, "Urgent save complete");
                Ok(())
            }
            Err(e) => {
                tracing::error!(kind = write.kind(), error = %e, "Urgent save failed");
                Err(e.into())
            }
        }
    }

    pub async fn handle_lifecycle(
        &mut self,
        signal: LifecycleSignal,
    ) -> Result<LifecycleOutcome, EngineError> {
        tracing::debug!(?signal, "Lifecycle signal");
        match signal {
            LifecycleSignal::AppWillSuspend => {
                self.save_urgent().await?;
                Ok(LifecycleOutcome::Flushed {
                    workout_id: self.session.as_ref().map(|s| s.workout_id().to_string()),
                })
            }
            LifecycleSignal::AppDidResume => {
                self.tick().await;
                Ok(LifecycleOutcome::Resumed {
                    elapsed_secs: self.current_session().map(|v| v.elapsed_secs),
                })
            }
            LifecycleSignal::AppDidColdStart => Ok(LifecycleOutcome::ColdStart {
                abandoned: self.recover_abandoned().await?,
            }),
        }
    }

    /// Flush pending state before the engine goes away.
    pub async fn shutdown(&mut self) -> Result<(), EngineError> {
        let result = self.save_urgent().await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Unsaved changes at shutdown");
        }
        result
    }
}
