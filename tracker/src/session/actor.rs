use tokio::sync::mpsc;
use tokio::time;
use tracing::Instrument;

use super::commands::EngineCommand;
use super::handle::EngineHandle;
use super::WorkoutEngine;
use crate::persistence::traits::{CatalogRepository, WorkoutRepository};

const COMMAND_BUFFER: usize = 32;

/// Spawn the engine actor and return a handle to it.
pub fn spawn_engine<W, C>(engine: WorkoutEngine<W, C>) -> (EngineHandle, tokio::task::JoinHandle<()>)
where
    W: WorkoutRepository + 'static,
    C: CatalogRepository + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run_engine_actor(engine, cmd_rx));
    (EngineHandle::new(cmd_tx), task)
}

/// The engine actor loop.
/// Owns the engine. Processes commands and autosave ticks sequentially.
pub(crate) async fn run_engine_actor<W, C>(
    engine: WorkoutEngine<W, C>,
    cmd_rx: mpsc::Receiver<EngineCommand>,
) where
    W: WorkoutRepository + 'static,
    C: CatalogRepository + 'static,
{
    run_engine_actor_inner(engine, cmd_rx)
        .instrument(tracing::info_span!("engine"))
        .await;
}

async fn run_engine_actor_inner<W, C>(
    mut engine: WorkoutEngine<W, C>,
    mut cmd_rx: mpsc::Receiver<EngineCommand>,
) where
    W: WorkoutRepository + 'static,
    C: CatalogRepository + 'static,
{
    tracing::info!("Engine actor started");

    let mut autosave_interval = time::interval(engine.config().autosave_interval);
    autosave_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(EngineCommand::Shutdown { reply }) => {
                        tracing::info!("Engine actor shutting down");
                        let _ = reply.send(engine.shutdown().await);
                        break;
                    }
                    None => {
                        tracing::info!("All handles dropped, flushing");
                        let _ = engine.shutdown().await;
                        break;
                    }
                    Some(cmd) => handle_command(&mut engine, cmd).await,
                }
            }

            _ = autosave_interval.tick() => {
                engine.tick().await;
            }
        }
    }

    tracing::info!("Engine actor exited");
}

async fn handle_command<W, C>(engine: &mut WorkoutEngine<W, C>, cmd: EngineCommand)
where
    W: WorkoutRepository + 'static,
    C: CatalogRepository + 'static,
{
    match cmd {
        EngineCommand::Start { request, reply } => {
            let _ = reply.send(engine.start(request).await);
        }
        EngineCommand::Resume { workout_id, reply } => {
            let _ = reply.send(engine.resume(&workout_id).await);
        }
        EngineCommand::LogSet {
            exercise_index,
            set_number,
            update,
            reply,
        } => {
            let _ = reply.send(engine.log_set(exercise_index, set_number, update).await);
        }
        EngineCommand::AddSet {
            exercise_index,
            reply,
        } => {
            let _ = reply.send(engine.add_set(exercise_index).await);
        }
        EngineCommand::RemoveSet {
            exercise_index,
            reply,
        } => {
            let _ = reply.send(engine.remove_set(exercise_index).await);
        }
        EngineCommand::AddExercise { exercise_id, reply } => {
            let _ = reply.send(engine.add_exercise(&exercise_id).await);
        }
        EngineCommand::SetNotes { notes, reply } => {
            let _ = reply.send(engine.set_notes(notes).await);
        }
        EngineCommand::Finalize { reply } => {
            let _ = reply.send(engine.finalize().await);
        }
        EngineCommand::Discard { workout_id, reply } => {
            let _ = reply.send(engine.discard(&workout_id).await);
        }
        EngineCommand::RecoverAbandoned { reply } => {
            let _ = reply.send(engine.recover_abandoned().await);
        }
        EngineCommand::GetSession { reply } => {
            let _ = reply.send(engine.current_session());
        }
        EngineCommand::IsActive { reply } => {
            let _ = reply.send(engine.is_active());
        }
        EngineCommand::Lifecycle { signal, reply } => {
            let _ = reply.send(engine.handle_lifecycle(signal).await);
        }
        EngineCommand::Shutdown { .. } => unreachable!(),
    }
}
