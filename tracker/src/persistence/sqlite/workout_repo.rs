//! SQLite-backed repository for workouts, their exercises and sets.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use training::{SetEntry, WorkoutExercise, WorkoutRecord, WorkoutTree};

use super::helpers::{
    decode_count, decode_intensity, decode_optional_time, decode_time, encode_intensity,
    encode_time,
};
use crate::persistence::traits::WorkoutRepository;
use crate::persistence::PersistenceError;

const WORKOUT_SELECT: &str = r#"
    SELECT w.workout_id, w.routine_id, r.name AS routine_name,
           w.started_at, w.completed_at, w.duration_secs, w.notes
    FROM workouts w
    LEFT JOIN routines r ON r.routine_id = w.routine_id
"#;

#[derive(sqlx::FromRow)]
struct WorkoutRow {
    workout_id: String,
    routine_id: Option<String>,
    routine_name: Option<String>,
    started_at: i64,
    completed_at: Option<i64>,
    duration_secs: Option<i64>,
    notes: Option<String>,
}

impl WorkoutRow {
    fn into_record(self) -> Result<WorkoutRecord, PersistenceError> {
        Ok(WorkoutRecord {
            id: self.workout_id,
            routine_id: self.routine_id,
            routine_name: self.routine_name,
            started_at: decode_time(self.started_at)?,
            completed_at: decode_optional_time(self.completed_at)?,
            duration_secs: self.duration_secs,
            notes: self.notes,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    workout_exercise_id: String,
    exercise_id: String,
    exercise_name: String,
    position: i64,
    planned_sets: i64,
}

#[derive(sqlx::FromRow)]
struct SetRow {
    set_number: i64,
    reps: i64,
    weight_kg: f64,
    rest_seconds: i64,
    completed: bool,
    intensity: Option<String>,
    note: Option<String>,
}

impl SetRow {
    fn into_entry(self) -> Result<SetEntry, PersistenceError> {
        Ok(SetEntry {
            set_number: decode_count("set_number", self.set_number)?,
            reps: decode_count("reps", self.reps)?,
            weight_kg: self.weight_kg,
            rest_seconds: decode_count("rest_seconds", self.rest_seconds)?,
            completed: self.completed,
            intensity: decode_intensity(self.intensity.as_deref())?,
            note: self.note,
        })
    }
}

/// SQLite implementation of [`WorkoutRepository`].
pub struct SqliteWorkoutRepository {
    pool: SqlitePool,
}

impl SqliteWorkoutRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl WorkoutRepository for SqliteWorkoutRepository {
    async fn create_workout(&self, tree: &WorkoutTree) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        insert_workout_row(&mut tx, &tree.workout)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    PersistenceError::ActiveWorkoutExists
                } else {
                    e
                }
            })?;
        write_exercises(&mut tx, tree).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_workout_tree(
        &self,
        workout_id: &str,
    ) -> Result<Option<WorkoutTree>, PersistenceError> {
        let row: Option<WorkoutRow> =
            sqlx::query_as(&format!("{WORKOUT_SELECT} WHERE w.workout_id = ?"))
                .bind(workout_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(load_tree(&self.pool, row.into_record()?).await?)),
        }
    }

    async fn replace_sets(
        &self,
        workout_exercise_id: &str,
        sets: &[SetEntry],
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let parent: Option<(String, bool)> = sqlx::query_as(
            r#"
            SELECT w.workout_id, w.completed_at IS NULL
            FROM workout_exercises we
            JOIN workouts w ON w.workout_id = we.workout_id
            WHERE we.workout_exercise_id = ?
            "#,
        )
        .bind(workout_exercise_id)
        .fetch_optional(&mut *tx)
        .await?;

        match parent {
            None => {
                return Err(PersistenceError::NotFound(format!(
                    "workout exercise {workout_exercise_id}"
                )))
            }
            Some((workout_id, false)) => return Err(PersistenceError::WorkoutNotActive(workout_id)),
            Some((_, true)) => {}
        }

        sqlx::query("DELETE FROM workout_sets WHERE workout_exercise_id = ?")
            .bind(workout_exercise_id)
            .execute(&mut *tx)
            .await?;
        insert_sets(&mut tx, workout_exercise_id, sets).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn save_workout_tree(&self, tree: &WorkoutTree) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE workouts SET notes = ? WHERE workout_id = ? AND completed_at IS NULL",
        )
        .bind(&tree.workout.notes)
        .bind(&tree.workout.id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(PersistenceError::WorkoutNotActive(tree.workout.id.clone()));
        }
        write_exercises(&mut tx, tree).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn finalize_workout(
        &self,
        tree: &WorkoutTree,
        completed_at: DateTime<Utc>,
        duration_secs: i64,
    ) -> Result<(), PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE workouts
            SET notes = ?, completed_at = ?, duration_secs = ?
            WHERE workout_id = ? AND completed_at IS NULL
            "#,
        )
        .bind(&tree.workout.notes)
        .bind(encode_time(completed_at))
        .bind(duration_secs)
        .bind(&tree.workout.id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(PersistenceError::WorkoutNotActive(tree.workout.id.clone()));
        }
        write_exercises(&mut tx, tree).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_workout(&self, workout_id: &str) -> Result<(), PersistenceError> {
        // Exercises and sets go with it via ON DELETE CASCADE.
        sqlx::query("DELETE FROM workouts WHERE workout_id = ?")
            .bind(workout_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_active_workout(&self) -> Result<Option<WorkoutRecord>, PersistenceError> {
        let row: Option<WorkoutRow> = sqlx::query_as(&format!(
            "{WORKOUT_SELECT} WHERE w.completed_at IS NULL ORDER BY w.started_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.map(WorkoutRow::into_record).transpose()
    }

    async fn find_active_workout_id(&self) -> Result<Option<String>, PersistenceError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT workout_id FROM workouts WHERE completed_at IS NULL ORDER BY started_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn find_previous_performance(
        &self,
        exercise_id: &str,
        before: DateTime<Utc>,
    ) -> Result<Option<Vec<SetEntry>>, PersistenceError> {
        let source: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT we.workout_exercise_id
            FROM workout_exercises we
            JOIN workouts w ON w.workout_id = we.workout_id
            WHERE we.exercise_id = ?
              AND w.completed_at IS NOT NULL
              AND w.started_at < ?
              AND EXISTS (
                  SELECT 1 FROM workout_sets s
                  WHERE s.workout_exercise_id = we.workout_exercise_id AND s.completed = 1
              )
            ORDER BY w.started_at DESC, we.position ASC
            LIMIT 1
            "#,
        )
        .bind(exercise_id)
        .bind(encode_time(before))
        .fetch_optional(&self.pool)
        .await?;

        let Some((workout_exercise_id,)) = source else {
            return Ok(None);
        };

        let sets = load_sets(&self.pool, &workout_exercise_id)
            .await?
            .into_iter()
            .filter(|s| s.completed)
            .collect();
        Ok(Some(sets))
    }

    async fn list_completed_workouts(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<WorkoutTree>, PersistenceError> {
        let since = since.map(encode_time);
        let rows: Vec<WorkoutRow> = sqlx::query_as(&format!(
            r#"{WORKOUT_SELECT}
            WHERE w.completed_at IS NOT NULL AND (? IS NULL OR w.completed_at >= ?)
            ORDER BY w.completed_at DESC"#
        ))
        .bind(since)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut trees = Vec::with_capacity(rows.len());
        for row in rows {
            trees.push(load_tree(&self.pool, row.into_record()?).await?);
        }
        Ok(trees)
    }

    async fn completion_times(&self) -> Result<Vec<DateTime<Utc>>, PersistenceError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            r#"
            SELECT completed_at FROM workouts
            WHERE completed_at IS NOT NULL
            ORDER BY completed_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|(secs,)| decode_time(secs)).collect()
    }
}

/// Insert the workout header row.
pub(super) async fn insert_workout_row(
    conn: &mut SqliteConnection,
    record: &WorkoutRecord,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
        INSERT INTO workouts
            (workout_id, routine_id, started_at, completed_at, duration_secs, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.routine_id)
    .bind(encode_time(record.started_at))
    .bind(record.completed_at.map(encode_time))
    .bind(record.duration_secs)
    .bind(&record.notes)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Replace every exercise and set of the workout with the contents of `tree`.
pub(super) async fn write_exercises(
    conn: &mut SqliteConnection,
    tree: &WorkoutTree,
) -> Result<(), PersistenceError> {
    sqlx::query("DELETE FROM workout_exercises WHERE workout_id = ?")
        .bind(&tree.workout.id)
        .execute(&mut *conn)
        .await?;

    for exercise in &tree.exercises {
        sqlx::query(
            r#"
            INSERT INTO workout_exercises
                (workout_exercise_id, workout_id, position, exercise_id, planned_sets)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&exercise.id)
        .bind(&tree.workout.id)
        .bind(i64::from(exercise.position))
        .bind(&exercise.exercise_id)
        .bind(i64::from(exercise.planned_sets))
        .execute(&mut *conn)
        .await?;

        insert_sets(conn, &exercise.id, &exercise.sets).await?;
    }
    Ok(())
}

async fn insert_sets(
    conn: &mut SqliteConnection,
    workout_exercise_id: &str,
    sets: &[SetEntry],
) -> Result<(), PersistenceError> {
    for set in sets {
        sqlx::query(
            r#"
            INSERT INTO workout_sets
                (workout_exercise_id, set_number, reps, weight_kg, rest_seconds,
                 completed, intensity, note)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(workout_exercise_id)
        .bind(i64::from(set.set_number))
        .bind(i64::from(set.reps))
        .bind(set.weight_kg)
        .bind(i64::from(set.rest_seconds))
        .bind(set.completed)
        .bind(encode_intensity(set.intensity))
        .bind(&set.note)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Attach exercises and sets to a workout header.
async fn load_tree(
    pool: &SqlitePool,
    workout: WorkoutRecord,
) -> Result<WorkoutTree, PersistenceError> {
    let rows: Vec<ExerciseRow> = sqlx::query_as(
        r#"
        SELECT we.workout_exercise_id, we.exercise_id,
               COALESCE(e.name, we.exercise_id) AS exercise_name,
               we.position, we.planned_sets
        FROM workout_exercises we
        LEFT JOIN exercises e ON e.exercise_id = we.exercise_id
        WHERE we.workout_id = ?
        ORDER BY we.position ASC
        "#,
    )
    .bind(&workout.id)
    .fetch_all(pool)
    .await?;

    let mut exercises = Vec::with_capacity(rows.len());
    for row in rows {
        let sets = load_sets(pool, &row.workout_exercise_id).await?;
        exercises.push(WorkoutExercise {
            id: row.workout_exercise_id,
            exercise_id: row.exercise_id,
            exercise_name: row.exercise_name,
            position: decode_count("position", row.position)?,
            planned_sets: decode_count("planned_sets", row.planned_sets)?,
            sets,
        });
    }

    Ok(WorkoutTree { workout, exercises })
}

async fn load_sets(
    pool: &SqlitePool,
    workout_exercise_id: &str,
) -> Result<Vec<SetEntry>, PersistenceError> {
    let rows: Vec<SetRow> = sqlx::query_as(
        r#"
        SELECT set_number, reps, weight_kg, rest_seconds, completed, intensity, note
        FROM workout_sets
        WHERE workout_exercise_id = ?
        ORDER BY set_number ASC
        "#,
    )
    .bind(workout_exercise_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(SetRow::into_entry).collect()
}
