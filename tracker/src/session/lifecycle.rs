//! Application lifecycle signals and their routing into the engine.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use super::commands::EngineError;
use super::handle::EngineHandle;
use super::snapshot::AbandonedWorkoutInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleSignal {
    /// The process may be suspended or killed at any moment after this.
    AppWillSuspend,
    /// The process is running again after a suspension.
    AppDidResume,
    /// First signal of a fresh process.
    AppDidColdStart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LifecycleOutcome {
    /// Pending state was flushed (or there was nothing to flush).
    Flushed { workout_id: Option<String> },
    /// Elapsed time of the active session, re-derived from its start instant.
    Resumed { elapsed_secs: Option<i64> },
    /// An active workout left over from a previous process, if any.
    ColdStart {
        abandoned: Option<AbandonedWorkoutInfo>,
    },
}

/// Forwards platform lifecycle events to the engine actor.
///
/// Cold-start recovery runs at most once per coordinator.
pub struct LifecycleCoordinator {
    engine: EngineHandle,
    cold_started: AtomicBool,
}

impl LifecycleCoordinator {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            cold_started: AtomicBool::new(false),
        }
    }

    pub async fn app_will_suspend(&self) -> Result<LifecycleOutcome, EngineError> {
        self.engine.lifecycle(LifecycleSignal::AppWillSuspend).await
    }

    pub async fn app_did_resume(&self) -> Result<LifecycleOutcome, EngineError> {
        self.engine.lifecycle(LifecycleSignal::AppDidResume).await
    }

    /// Returns `ColdStart { abandoned: None }` on repeated calls.
    pub async fn app_did_cold_start(&self) -> Result<LifecycleOutcome, EngineError> {
        if self.cold_started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Cold start already handled");
            return Ok(LifecycleOutcome::ColdStart { abandoned: None });
        }
        self.engine.lifecycle(LifecycleSignal::AppDidColdStart).await
    }
}
