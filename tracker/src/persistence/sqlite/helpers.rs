//! Shared encode/decode helpers for SQLite ↔ domain type conversions.

use chrono::{DateTime, Utc};
use training::{ExerciseCategory, Intensity};

use crate::persistence::PersistenceError;

// ── Timestamps ─────────────────────────────────────────────────────────

/// Timestamps are stored as whole UTC seconds.
pub fn encode_time(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

pub fn decode_time(secs: i64) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| PersistenceError::Corrupt(format!("timestamp {secs} out of range")))
}

pub fn decode_optional_time(secs: Option<i64>) -> Result<Option<DateTime<Utc>>, PersistenceError> {
    secs.map(decode_time).transpose()
}

// ── Intensity ──────────────────────────────────────────────────────────

pub fn encode_intensity(intensity: Option<Intensity>) -> Option<&'static str> {
    intensity.map(Intensity::as_str)
}

/// The column has a CHECK constraint, so an unknown tag means the file was
/// edited outside the application.
pub fn decode_intensity(value: Option<&str>) -> Result<Option<Intensity>, PersistenceError> {
    match value {
        None => Ok(None),
        Some(tag) => Intensity::parse(tag)
            .map(Some)
            .ok_or_else(|| PersistenceError::Corrupt(format!("unknown intensity '{tag}'"))),
    }
}

// ── Exercise metadata ──────────────────────────────────────────────────

pub fn encode_category(category: ExerciseCategory) -> &'static str {
    category.as_str()
}

pub fn decode_category(value: &str) -> ExerciseCategory {
    ExerciseCategory::parse(value)
}

/// Secondary muscles are a JSON array in a TEXT column.
pub fn encode_muscles(muscles: &[String]) -> Result<String, PersistenceError> {
    Ok(serde_json::to_string(muscles)?)
}

pub fn decode_muscles(value: &str) -> Result<Vec<String>, PersistenceError> {
    Ok(serde_json::from_str(value)?)
}

// ── Counts ─────────────────────────────────────────────────────────────

/// Decode a non-negative INTEGER column into `u32`.
pub fn decode_count(column: &str, value: i64) -> Result<u32, PersistenceError> {
    u32::try_from(value)
        .map_err(|_| PersistenceError::Corrupt(format!("{column} has invalid value {value}")))
}
