//! Versioned JSON export/import bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use training::{Exercise, Routine, WorkoutTree};

use super::PersistenceError;

pub const EXPORT_VERSION: u32 = 1;

/// Everything needed to rebuild a user's history on another install.
/// Active workouts are never exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub exercises: Vec<Exercise>,
    pub routines: Vec<Routine>,
    pub workouts: Vec<WorkoutTree>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub exercises: usize,
    pub routines: usize,
    pub workouts: usize,
}

impl ExportBundle {
    /// Reject bundles that cannot be imported as-is.
    pub fn validate(&self) -> Result<(), PersistenceError> {
        if self.version != EXPORT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(self.version));
        }
        for tree in &self.workouts {
            if tree.workout.is_active() {
                return Err(PersistenceError::InvalidImport(format!(
                    "workout {} has no completion time",
                    tree.workout.id
                )));
            }
            tree.validate().map_err(|reason| {
                PersistenceError::InvalidImport(format!("workout {}: {reason}", tree.workout.id))
            })?;
        }
        Ok(())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, PersistenceError> {
        let json = std::fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&json)?;
        Ok(bundle)
    }
}
