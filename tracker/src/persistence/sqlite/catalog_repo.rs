//! SQLite-backed repository for the exercise catalog and routines.

use sqlx::{SqliteConnection, SqlitePool};
use training::{Exercise, Routine, RoutineExercise};

use super::helpers::{
    decode_category, decode_count, decode_muscles, decode_time, encode_category, encode_muscles,
    encode_time,
};
use crate::persistence::traits::CatalogRepository;
use crate::persistence::PersistenceError;

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    exercise_id: String,
    name: String,
    category: String,
    primary_muscle: String,
    secondary_muscles: String,
    is_custom: bool,
}

impl ExerciseRow {
    fn into_exercise(self) -> Result<Exercise, PersistenceError> {
        Ok(Exercise {
            id: self.exercise_id,
            name: self.name,
            category: decode_category(&self.category),
            primary_muscle: self.primary_muscle,
            secondary_muscles: decode_muscles(&self.secondary_muscles)?,
            is_custom: self.is_custom,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoutineRow {
    routine_id: String,
    name: String,
    created_at: i64,
}

#[derive(sqlx::FromRow)]
struct RoutineExerciseRow {
    exercise_id: String,
    target_sets: i64,
}

/// SQLite implementation of [`CatalogRepository`].
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for SqliteCatalogRepository {
    async fn save_exercise(&self, exercise: &Exercise) -> Result<(), PersistenceError> {
        let mut conn = self.pool.acquire().await?;
        upsert_exercise(&mut conn, exercise).await
    }

    async fn load_exercise(&self, exercise_id: &str) -> Result<Option<Exercise>, PersistenceError> {
        let row: Option<ExerciseRow> = sqlx::query_as(
            r#"
            SELECT exercise_id, name, category, primary_muscle, secondary_muscles, is_custom
            FROM exercises
            WHERE exercise_id = ?
            "#,
        )
        .bind(exercise_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ExerciseRow::into_exercise).transpose()
    }

    async fn list_exercises(&self) -> Result<Vec<Exercise>, PersistenceError> {
        let rows: Vec<ExerciseRow> = sqlx::query_as(
            r#"
            SELECT exercise_id, name, category, primary_muscle, secondary_muscles, is_custom
            FROM exercises
            ORDER BY name COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ExerciseRow::into_exercise).collect()
    }

    async fn save_routine(&self, routine: &Routine) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;
        upsert_routine(&mut tx, routine).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_routine(&self, routine_id: &str) -> Result<Option<Routine>, PersistenceError> {
        let row: Option<RoutineRow> = sqlx::query_as(
            "SELECT routine_id, name, created_at FROM routines WHERE routine_id = ?",
        )
        .bind(routine_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(load_routine_exercises(&self.pool, row).await?)),
        }
    }

    async fn list_routines(&self) -> Result<Vec<Routine>, PersistenceError> {
        let rows: Vec<RoutineRow> = sqlx::query_as(
            "SELECT routine_id, name, created_at FROM routines ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut routines = Vec::with_capacity(rows.len());
        for row in rows {
            routines.push(load_routine_exercises(&self.pool, row).await?);
        }
        Ok(routines)
    }

    async fn delete_routine(&self, routine_id: &str) -> Result<(), PersistenceError> {
        // Past workouts keep their data; their routine_id is nulled by the schema.
        sqlx::query("DELETE FROM routines WHERE routine_id = ?")
            .bind(routine_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub(super) async fn upsert_exercise(
    conn: &mut SqliteConnection,
    exercise: &Exercise,
) -> Result<(), PersistenceError> {
    let secondary = encode_muscles(&exercise.secondary_muscles)?;
    sqlx::query(
        r#"
        INSERT INTO exercises
            (exercise_id, name, category, primary_muscle, secondary_muscles, is_custom)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(exercise_id) DO UPDATE SET
            name = excluded.name,
            category = excluded.category,
            primary_muscle = excluded.primary_muscle,
            secondary_muscles = excluded.secondary_muscles,
            is_custom = excluded.is_custom
        "#,
    )
    .bind(&exercise.id)
    .bind(&exercise.name)
    .bind(encode_category(exercise.category))
    .bind(&exercise.primary_muscle)
    .bind(secondary)
    .bind(exercise.is_custom)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Upsert the routine row and rewrite its exercise list. `INSERT OR REPLACE`
/// is avoided because replacing the row would null `workouts.routine_id`.
pub(super) async fn upsert_routine(
    conn: &mut SqliteConnection,
    routine: &Routine,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
        INSERT INTO routines (routine_id, name, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(routine_id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(&routine.id)
    .bind(&routine.name)
    .bind(encode_time(routine.created_at))
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM routine_exercises WHERE routine_id = ?")
        .bind(&routine.id)
        .execute(&mut *conn)
        .await?;

    for (position, entry) in routine.exercises.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO routine_exercises (routine_id, position, exercise_id, target_sets)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&routine.id)
        .bind(position as i64)
        .bind(&entry.exercise_id)
        .bind(i64::from(entry.target_sets))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load_routine_exercises(
    pool: &SqlitePool,
    row: RoutineRow,
) -> Result<Routine, PersistenceError> {
    let entries: Vec<RoutineExerciseRow> = sqlx::query_as(
        r#"
        SELECT exercise_id, target_sets
        FROM routine_exercises
        WHERE routine_id = ?
        ORDER BY position ASC
        "#,
    )
    .bind(&row.routine_id)
    .fetch_all(pool)
    .await?;

    let exercises = entries
        .into_iter()
        .map(|e| {
            Ok(RoutineExercise {
                exercise_id: e.exercise_id,
                target_sets: decode_count("target_sets", e.target_sets)?,
            })
        })
        .collect::<Result<Vec<_>, PersistenceError>>()?;

    Ok(Routine {
        id: row.routine_id,
        name: row.name,
        exercises,
        created_at: decode_time(row.created_at)?,
    })
}
