pub mod preferences;
pub mod sqlite;
pub mod traits;
pub mod transfer;

pub use preferences::Preferences;
pub use transfer::{ExportBundle, ImportReport, EXPORT_VERSION};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Another workout is already active")]
    ActiveWorkoutExists,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Workout {0} is not active")]
    WorkoutNotActive(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
    #[error("Unsupported export version {0}")]
    UnsupportedVersion(u32),
    #[error("Import rejected: {0}")]
    InvalidImport(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// SQLite primary result codes for a busy or locked database.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl PersistenceError {
    /// Whether the same operation could succeed if attempted again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Sqlx(err) => match err {
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db) => db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether this is a unique-constraint violation reported by the database.
    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation())
    }
}

/// Generate a unique identifier for a new record.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_retryable_classification() {
        let io = PersistenceError::Io(std::io::Error::other("disk"));
        assert!(io.is_retryable());
        assert!(PersistenceError::Sqlx(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!PersistenceError::Sqlx(sqlx::Error::RowNotFound).is_retryable());
        assert!(!PersistenceError::ActiveWorkoutExists.is_retryable());
        assert!(!PersistenceError::Corrupt("bad".to_string()).is_retryable());
    }
}
