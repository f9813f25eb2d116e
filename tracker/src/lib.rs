//! LiftLog workout tracker.
//!
//! The session engine, its SQLite persistence and the analytics built on top
//! of finalized workouts. Pure domain types live in `training`; the pure
//! analytics math lives in `analysis`.

pub mod clock;
pub mod config;
pub mod persistence;
pub mod session;
pub mod stats;

pub use clock::{Clock, SystemClock};
pub use config::EngineConfig;
pub use persistence::{PersistenceError, Preferences};
pub use session::actor::spawn_engine;
pub use session::{
    EngineError, EngineHandle, LifecycleCoordinator, LifecycleOutcome, LifecycleSignal,
    SetUpdate, StartRequest, WorkoutEngine,
};
pub use stats::{AnalyticsAggregator, StatsReport};
