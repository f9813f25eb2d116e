//! Whole-database export and atomic import.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::catalog_repo::{upsert_exercise, upsert_routine};
use super::workout_repo::{insert_workout_row, write_exercises};
use super::{SqliteCatalogRepository, SqliteWorkoutRepository};
use crate::persistence::traits::{CatalogRepository, TransferRepository, WorkoutRepository};
use crate::persistence::{ExportBundle, ImportReport, PersistenceError, EXPORT_VERSION};

/// SQLite implementation of [`TransferRepository`].
pub struct SqliteTransferRepository {
    pool: SqlitePool,
    catalog: SqliteCatalogRepository,
    workouts: SqliteWorkoutRepository,
}

impl SqliteTransferRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            catalog: SqliteCatalogRepository::new(pool.clone()),
            workouts: SqliteWorkoutRepository::new(pool.clone()),
            pool,
        }
    }
}

impl TransferRepository for SqliteTransferRepository {
    async fn export_bundle(
        &self,
        exported_at: DateTime<Utc>,
    ) -> Result<ExportBundle, PersistenceError> {
        let mut workouts = self.workouts.list_completed_workouts(None).await?;
        workouts.reverse();

        Ok(ExportBundle {
            version: EXPORT_VERSION,
            exported_at,
            exercises: self.catalog.list_exercises().await?,
            routines: self.catalog.list_routines().await?,
            workouts,
        })
    }

    async fn import_bundle(&self, bundle: &ExportBundle) -> Result<ImportReport, PersistenceError> {
        bundle.validate()?;

        let mut tx = self.pool.begin().await?;

        for exercise in &bundle.exercises {
            upsert_exercise(&mut tx, exercise).await?;
        }
        for routine in &bundle.routines {
            upsert_routine(&mut tx, routine).await?;
        }
        for tree in &bundle.workouts {
            // Re-importing the same bundle replaces rather than duplicates.
            sqlx::query("DELETE FROM workouts WHERE workout_id = ?")
                .bind(&tree.workout.id)
                .execute(&mut *tx)
                .await?;
            insert_workout_row(&mut tx, &tree.workout).await?;
            write_exercises(&mut tx, tree).await?;
        }

        tx.commit().await?;

        let report = ImportReport {
            exercises: bundle.exercises.len(),
            routines: bundle.routines.len(),
            workouts: bundle.workouts.len(),
        };
        tracing::info!(
            exercises = report.exercises,
            routines = report.routines,
            workouts = report.workouts,
            "Import committed"
        );
        Ok(report)
    }
}
