//! Configuration for the workout tracker.
//!
//! Data directory precedence:
//! 1. LIFTLOG_DATA_DIR environment variable
//! 2. The platform data directory (e.g. ~/.local/share/liftlog)
//! 3. ./data (fallback for development)
//!
//! Autosave timing can be tuned with LIFTLOG_AUTOSAVE_INTERVAL_MS and
//! LIFTLOG_AUTOSAVE_DEBOUNCE_MS. Invalid values are ignored with a warning.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;
use training::SetTemplate;

const DEV_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "liftlog.db";

pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1500);
pub const DEFAULT_EXERCISE_SETS: u32 = 3;

/// Get the data directory for persistence.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LIFTLOG_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = ProjectDirs::from("", "", "liftlog") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

pub fn get_database_path() -> PathBuf {
    get_data_dir().join(DATABASE_FILE)
}

/// Directory for rolling log files, if file logging is enabled.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var("LIFTLOG_LOG_DIR").ok().map(PathBuf::from)
}

/// Tunables for the session engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// How often the engine checks whether a scheduled save is due.
    pub autosave_interval: Duration,
    /// Delay between the first unsaved change and its background save.
    pub autosave_debounce: Duration,
    /// Minimum spacing between two background save attempts.
    pub autosave_cooldown: Duration,
    /// Set count for exercises added mid-workout.
    pub default_exercise_sets: u32,
    /// Values for sets with no history to seed from.
    pub default_set: SetTemplate,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            autosave_cooldown: DEFAULT_AUTOSAVE_DEBOUNCE,
            default_exercise_sets: DEFAULT_EXERCISE_SETS,
            default_set: SetTemplate::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(interval) = duration_from_env("LIFTLOG_AUTOSAVE_INTERVAL_MS") {
            config.autosave_interval = interval;
        }
        if let Some(debounce) = duration_from_env("LIFTLOG_AUTOSAVE_DEBOUNCE_MS") {
            config.autosave_debounce = debounce;
            config.autosave_cooldown = debounce;
        }
        config
    }
}

fn duration_from_env(name: &str) -> Option<Duration> {
    let raw = std::env::var(name).ok()?;
    parse_millis(&raw).or_else(|| {
        tracing::warn!(var = name, value = %raw, "Ignoring invalid duration");
        None
    })
}

/// Parse a positive millisecond count.
fn parse_millis(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => None,
    }
}
