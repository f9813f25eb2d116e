//! `liftlog` command-line host.
//!
//! Each invocation is one process lifetime: the engine actor is spawned, the
//! cold-start signal is forwarded, one command runs, then the suspend signal
//! flushes pending state and the actor shuts down.
//!
//! Commands that act on the current workout (`log`, `add-set`, `finish`, ...)
//! attach to the workout left active by a previous invocation. Running one of
//! them is the user's decision to continue that workout.

use anyhow::{bail, Context};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tracker::persistence::sqlite::{
    Database, SqliteCatalogRepository, SqlitePreferenceRepository, SqliteTransferRepository,
    SqliteWorkoutRepository,
};
use tracker::persistence::traits::{CatalogRepository, PreferenceRepository, TransferRepository};
use tracker::persistence::{generate_id, ExportBundle};
use tracker::session::AbandonedWorkoutInfo;
use tracker::{
    config, spawn_engine, AnalyticsAggregator, EngineConfig, EngineHandle, LifecycleCoordinator,
    LifecycleOutcome, Preferences, SetUpdate, StartRequest, SystemClock, WorkoutEngine,
};
use training::{Exercise, ExerciseCategory, Intensity, MassUnit, Routine, RoutineExercise};

#[derive(Parser)]
#[command(name = "liftlog", about = "Workout tracker with crash-safe sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workout left active by a previous run, if any.
    Status,
    /// Start a new workout from a routine or a list of exercises.
    Start {
        #[arg(long, conflicts_with = "exercise")]
        routine: Option<String>,
        /// Exercise id; repeat for several.
        #[arg(long)]
        exercise: Vec<String>,
    },
    /// Continue an active workout. Defaults to the abandoned one.
    Resume { workout_id: Option<String> },
    /// Update one set of the current workout.
    Log {
        /// Exercise number, starting at 1.
        exercise: usize,
        /// Set number, starting at 1.
        set: u32,
        #[arg(long)]
        reps: Option<u32>,
        /// Load in `--unit`, or the preferred mass unit.
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        unit: Option<MassUnit>,
        /// Rest after the set, in seconds.
        #[arg(long)]
        rest: Option<u32>,
        #[arg(long, value_parser = parse_intensity)]
        intensity: Option<Intensity>,
        #[arg(long)]
        note: Option<String>,
        /// Mark the set as not done instead of done.
        #[arg(long)]
        undo: bool,
    },
    /// Append a set to an exercise.
    AddSet { exercise: usize },
    /// Remove the last set of an exercise.
    RemoveSet { exercise: usize },
    /// Add a catalog exercise to the current workout.
    AddExercise { exercise_id: String },
    /// Replace the workout notes. Omit the text to clear them.
    Notes { text: Option<String> },
    /// Finalize the current workout.
    Finish,
    /// Delete an active workout. Defaults to the abandoned one.
    Discard { workout_id: Option<String> },
    /// Streaks, weekly progress and strength trends.
    Stats,
    /// Write completed history to a JSON file.
    Export { path: PathBuf },
    /// Load a JSON export into this database.
    Import { path: PathBuf },
    /// Show preferences, read one key, or set one.
    Prefs {
        key: Option<String>,
        value: Option<String>,
    },
    /// Manage the exercise catalog.
    Exercise {
        #[command(subcommand)]
        action: ExerciseAction,
    },
    /// Manage routines.
    Routine {
        #[command(subcommand)]
        action: RoutineAction,
    },
}

#[derive(Subcommand)]
enum ExerciseAction {
    Add {
        id: String,
        name: String,
        #[arg(long, default_value = "other")]
        category: String,
        #[arg(long, default_value = "")]
        primary_muscle: String,
        /// Secondary muscle; repeat for several.
        #[arg(long)]
        secondary: Vec<String>,
    },
    List,
}

#[derive(Subcommand)]
enum RoutineAction {
    Add {
        name: String,
        /// `exercise_id[:sets]`; repeat in order.
        #[arg(long = "exercise", required = true, value_parser = parse_routine_entry)]
        exercises: Vec<RoutineExercise>,
    },
    List,
}

fn parse_intensity(value: &str) -> Result<Intensity, String> {
    Intensity::parse(value).ok_or_else(|| format!("expected heavy, moderate or light, got '{value}'"))
}

fn parse_routine_entry(value: &str) -> Result<RoutineExercise, String> {
    let (exercise_id, target_sets) = match value.split_once(':') {
        Some((id, sets)) => (
            id,
            sets.parse::<u32>()
                .map_err(|e| format!("invalid set count in '{value}': {e}"))?,
        ),
        None => (value, config::DEFAULT_EXERCISE_SETS),
    };
    if exercise_id.is_empty() {
        return Err(format!("missing exercise id in '{value}'"));
    }
    Ok(RoutineExercise {
        exercise_id: exercise_id.to_string(),
        target_sets,
    })
}

/// Convert a 1-based exercise number from the command line.
fn exercise_index(number: usize) -> anyhow::Result<usize> {
    match number.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("Exercise numbers start at 1"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Everything one command needs.
struct Host {
    handle: EngineHandle,
    abandoned: Option<AbandonedWorkoutInfo>,
    workouts: Arc<SqliteWorkoutRepository>,
    catalog: Arc<SqliteCatalogRepository>,
    preferences: SqlitePreferenceRepository,
    transfer: SqliteTransferRepository,
}

impl Host {
    /// Load the abandoned workout so session commands can act on it.
    async fn attach(&self) -> anyhow::Result<()> {
        let Some(info) = &self.abandoned else {
            bail!("No active workout. Start one with `liftlog start`.");
        };
        if !info.resumable {
            bail!(
                "Workout {} cannot be resumed ({}). Discard it with `liftlog discard`.",
                info.workout_id,
                info.problem.as_deref().unwrap_or("unknown problem")
            );
        }
        self.handle.resume(&info.workout_id).await?;
        Ok(())
    }

    fn abandoned_id(&self, explicit: Option<String>) -> anyhow::Result<String> {
        match explicit.or_else(|| self.abandoned.as_ref().map(|a| a.workout_id.clone())) {
            Some(id) => Ok(id),
            None => bail!("No active workout"),
        }
    }

    async fn execute(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Status => match &self.abandoned {
                Some(info) => print_json(info)?,
                None => println!("No active workout"),
            },
            Commands::Start { routine, exercise } => {
                let request = match routine {
                    Some(routine_id) => StartRequest::Routine(routine_id),
                    None if !exercise.is_empty() => StartRequest::Exercises(exercise),
                    None => bail!("Pass --routine or at least one --exercise"),
                };
                self.handle.start(request).await?;
                print_json(&self.handle.current_session().await?)?;
            }
            Commands::Resume { workout_id } => {
                let id = self.abandoned_id(workout_id)?;
                self.handle.resume(&id).await?;
                print_json(&self.handle.current_session().await?)?;
            }
            Commands::Log {
                exercise,
                set,
                reps,
                weight,
                unit,
                rest,
                intensity,
                note,
                undo,
            } => {
                let index = exercise_index(exercise)?;
                let mut update = SetUpdate {
                    reps,
                    rest_seconds: rest,
                    completed: Some(!undo),
                    intensity: intensity.map(Some),
                    note: note.map(Some),
                    ..SetUpdate::default()
                };
                if let Some(value) = weight {
                    let unit = match unit {
                        Some(unit) => unit,
                        None => Preferences::load(&self.preferences).await?.mass_unit,
                    };
                    update = update.with_weight(value, unit);
                }
                self.attach().await?;
                print_json(&self.handle.log_set(index, set, update).await?)?;
            }
            Commands::AddSet { exercise } => {
                let index = exercise_index(exercise)?;
                self.attach().await?;
                print_json(&self.handle.add_set(index).await?)?;
            }
            Commands::RemoveSet { exercise } => {
                let index = exercise_index(exercise)?;
                self.attach().await?;
                print_json(&self.handle.remove_set(index).await?)?;
            }
            Commands::AddExercise { exercise_id } => {
                self.attach().await?;
                print_json(&self.handle.add_exercise(&exercise_id).await?)?;
            }
            Commands::Notes { text } => {
                self.attach().await?;
                print_json(&self.handle.set_notes(text).await?)?;
            }
            Commands::Finish => {
                self.attach().await?;
                print_json(&self.handle.finalize().await?)?;
            }
            Commands::Discard { workout_id } => {
                let id = self.abandoned_id(workout_id)?;
                self.handle.discard(&id).await?;
                println!("Discarded workout {id}");
            }
            Commands::Stats => {
                let prefs = Preferences::load(&self.preferences).await?;
                let offset = *Local::now().offset();
                let stats =
                    AnalyticsAggregator::new(Arc::clone(&self.workouts), Arc::new(SystemClock), offset);
                print_json(&stats.report(prefs.weekly_goal).await?)?;
            }
            Commands::Export { path } => {
                let bundle = self.transfer.export_bundle(Utc::now()).await?;
                bundle.write_to(&path)?;
                println!(
                    "Exported {} workouts to {}",
                    bundle.workouts.len(),
                    path.display()
                );
            }
            Commands::Import { path } => {
                let bundle = ExportBundle::read_from(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                print_json(&self.transfer.import_bundle(&bundle).await?)?;
            }
            Commands::Prefs { key, value } => match (key, value) {
                (Some(key), Some(value)) => {
                    let mut prefs = Preferences::load(&self.preferences).await?;
                    prefs.set(&self.preferences, &key, &value).await?;
                    print_json(&prefs)?;
                }
                (Some(key), None) => match self.preferences.get_preference(&key).await? {
                    Some(value) => println!("{value}"),
                    None => println!("{key} is not set"),
                },
                (None, _) => print_json(&Preferences::load(&self.preferences).await?)?,
            },
            Commands::Exercise { action } => match action {
                ExerciseAction::Add {
                    id,
                    name,
                    category,
                    primary_muscle,
                    secondary,
                } => {
                    let exercise = Exercise {
                        id,
                        name,
                        category: ExerciseCategory::parse(&category.to_ascii_lowercase()),
                        primary_muscle,
                        secondary_muscles: secondary,
                        is_custom: true,
                    };
                    self.catalog.save_exercise(&exercise).await?;
                    print_json(&exercise)?;
                }
                ExerciseAction::List => print_json(&self.catalog.list_exercises().await?)?,
            },
            Commands::Routine { action } => match action {
                RoutineAction::Add { name, exercises } => {
                    for entry in &exercises {
                        if self.catalog.load_exercise(&entry.exercise_id).await?.is_none() {
                            bail!("Unknown exercise '{}'", entry.exercise_id);
                        }
                    }
                    let routine = Routine {
                        id: generate_id(),
                        name,
                        exercises,
                        created_at: Utc::now(),
                    };
                    self.catalog.save_routine(&routine).await?;
                    print_json(&routine)?;
                }
                RoutineAction::List => print_json(&self.catalog.list_routines().await?)?,
            },
        }
        Ok(())
    }
}

/// Log to stderr, or to a daily file when `LIFTLOG_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir).ok();
            let file_appender = tracing_appender::rolling::daily(log_dir, "liftlog");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing();

    let db_path = config::get_database_path();
    tracing::debug!("Using database: {}", db_path.display());
    let db = Database::open(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;

    let workouts = Arc::new(SqliteWorkoutRepository::new(db.pool().clone()));
    let catalog = Arc::new(SqliteCatalogRepository::new(db.pool().clone()));
    let engine = WorkoutEngine::new(
        Arc::clone(&workouts),
        Arc::clone(&catalog),
        Arc::new(SystemClock),
        EngineConfig::from_env(),
    );
    let (handle, task) = spawn_engine(engine);
    let lifecycle = LifecycleCoordinator::new(handle.clone());

    let abandoned = match lifecycle.app_did_cold_start().await? {
        LifecycleOutcome::ColdStart { abandoned } => abandoned,
        _ => None,
    };

    let host = Host {
        handle: handle.clone(),
        abandoned,
        workouts,
        catalog,
        preferences: SqlitePreferenceRepository::new(db.pool().clone()),
        transfer: SqliteTransferRepository::new(db.pool().clone()),
    };
    let result = host.execute(cli.command).await;

    // The process ends here: flush like a suspending app would.
    if let Err(e) = lifecycle.app_will_suspend().await {
        tracing::error!(error = %e, "Flush before exit failed");
    }
    let shutdown = handle.shutdown().await;
    task.await?;
    db.close().await;
    result?;
    shutdown?;
    Ok(())
}
