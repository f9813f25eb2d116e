use chrono::{DateTime, Duration, TimeZone, Utc};
use training::{
    Exercise, ExerciseCategory, Intensity, Routine, RoutineExercise, SetEntry, WorkoutExercise,
    WorkoutRecord, WorkoutTree,
};

use super::{
    Database, SqliteCatalogRepository, SqlitePreferenceRepository, SqliteTransferRepository,
    SqliteWorkoutRepository,
};
use crate::persistence::preferences::{KEY_MASS_UNIT, KEY_WEEKLY_GOAL};
use crate::persistence::traits::{
    CatalogRepository, PreferenceRepository, TransferRepository, WorkoutRepository,
};
use crate::persistence::{PersistenceError, Preferences};

fn t(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, day, hour, 0, 0).unwrap()
}

fn sample_exercise(id: &str) -> Exercise {
    Exercise {
        id: id.to_string(),
        name: format!("Exercise {id}"),
        category: ExerciseCategory::Barbell,
        primary_muscle: "quads".to_string(),
        secondary_muscles: vec!["glutes".to_string()],
        is_custom: false,
    }
}

fn sample_set(n: u32, reps: u32, weight: f64, completed: bool) -> SetEntry {
    SetEntry {
        set_number: n,
        reps,
        weight_kg: weight,
        rest_seconds: 120,
        completed,
        intensity: None,
        note: None,
    }
}

fn sample_tree(id: &str, started_at: DateTime<Utc>, exercise_ids: &[&str]) -> WorkoutTree {
    WorkoutTree {
        workout: WorkoutRecord {
            id: id.to_string(),
            routine_id: None,
            routine_name: None,
            started_at,
            completed_at: None,
            duration_secs: None,
            notes: None,
        },
        exercises: exercise_ids
            .iter()
            .enumerate()
            .map(|(i, ex)| WorkoutExercise {
                id: format!("{id}-we-{i}"),
                exercise_id: ex.to_string(),
                exercise_name: format!("Exercise {ex}"),
                position: i as u32,
                planned_sets: 2,
                sets: vec![sample_set(1, 5, 100.0, false), sample_set(2, 5, 100.0, false)],
            })
            .collect(),
    }
}

async fn setup() -> (Database, SqliteWorkoutRepository, SqliteCatalogRepository) {
    let db = Database::new_in_memory().await.unwrap();
    let catalog = SqliteCatalogRepository::new(db.pool().clone());
    for id in ["squat", "bench", "row"] {
        catalog.save_exercise(&sample_exercise(id)).await.unwrap();
    }
    let workouts = SqliteWorkoutRepository::new(db.pool().clone());
    (db, workouts, catalog)
}

/// Start, complete every set and finalize a workout.
async fn complete_workout(
    repo: &SqliteWorkoutRepository,
    id: &str,
    started_at: DateTime<Utc>,
    exercise_ids: &[&str],
    weight: f64,
) -> WorkoutTree {
    let mut tree = sample_tree(id, started_at, exercise_ids);
    for exercise in &mut tree.exercises {
        for set in &mut exercise.sets {
            set.completed = true;
            set.weight_kg = weight;
        }
    }
    repo.create_workout(&tree).await.unwrap();
    let completed_at = started_at + Duration::minutes(45);
    repo.finalize_workout(&tree, completed_at, 45 * 60)
        .await
        .unwrap();
    tree.workout.completed_at = Some(completed_at);
    tree.workout.duration_secs = Some(45 * 60);
    tree
}

// ── Workouts ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_and_load_roundtrip() {
    let (_db, repo, _) = setup().await;
    let mut tree = sample_tree("w1", t(1, 9), &["squat", "bench"]);
    tree.exercises[0].sets[0].intensity = Some(Intensity::Heavy);
    tree.exercises[0].sets[0].note = Some("belt".to_string());
    tree.exercises[1].sets[1].weight_kg = 62.5;

    repo.create_workout(&tree).await.unwrap();
    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded, tree);
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let (_db, repo, _) = setup().await;
    assert!(repo.load_workout_tree("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_active_workout_rejected() {
    let (_db, repo, _) = setup().await;
    repo.create_workout(&sample_tree("w1", t(1, 9), &["squat"]))
        .await
        .unwrap();

    let result = repo
        .create_workout(&sample_tree("w2", t(1, 10), &["bench"]))
        .await;
    assert!(matches!(result, Err(PersistenceError::ActiveWorkoutExists)));

    // The failed insert left nothing behind.
    assert!(repo.load_workout_tree("w2").await.unwrap().is_none());
    let active = repo.find_active_workout().await.unwrap().unwrap();
    assert_eq!(active.id, "w1");
}

#[tokio::test]
async fn test_finalize_frees_the_active_slot() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "w1", t(1, 9), &["squat"], 100.0).await;
    assert!(repo.find_active_workout().await.unwrap().is_none());

    repo.create_workout(&sample_tree("w2", t(2, 9), &["squat"]))
        .await
        .unwrap();
    assert_eq!(repo.find_active_workout().await.unwrap().unwrap().id, "w2");
}

#[tokio::test]
async fn test_active_id_readable_when_header_is_corrupt() {
    let (db, repo, _) = setup().await;
    assert_eq!(repo.find_active_workout_id().await.unwrap(), None);

    sqlx::query("INSERT INTO workouts (workout_id, started_at) VALUES ('w1', ?)")
        .bind(i64::MAX)
        .execute(db.pool())
        .await
        .unwrap();
    assert!(matches!(
        repo.find_active_workout().await,
        Err(PersistenceError::Corrupt(_))
    ));
    assert_eq!(repo.find_active_workout_id().await.unwrap().as_deref(), Some("w1"));
}

#[tokio::test]
async fn test_finalize_twice_fails() {
    let (_db, repo, _) = setup().await;
    let tree = complete_workout(&repo, "w1", t(1, 9), &["squat"], 100.0).await;
    let result = repo.finalize_workout(&tree, t(1, 11), 7200).await;
    assert!(matches!(result, Err(PersistenceError::WorkoutNotActive(id)) if id == "w1"));

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.workout.duration_secs, Some(45 * 60));
}

#[tokio::test]
async fn test_replace_sets() {
    let (_db, repo, _) = setup().await;
    let tree = sample_tree("w1", t(1, 9), &["squat", "bench"]);
    repo.create_workout(&tree).await.unwrap();

    let sets = vec![
        sample_set(1, 8, 80.0, true),
        sample_set(2, 8, 80.0, true),
        sample_set(3, 6, 85.0, false),
    ];
    repo.replace_sets("w1-we-1", &sets).await.unwrap();

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.exercises[1].sets, sets);
    assert_eq!(loaded.exercises[0].sets, tree.exercises[0].sets);
}

#[tokio::test]
async fn test_replace_sets_rejects_completed_and_unknown() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "w1", t(1, 9), &["squat"], 100.0).await;

    let result = repo.replace_sets("w1-we-0", &[]).await;
    assert!(matches!(result, Err(PersistenceError::WorkoutNotActive(_))));

    let result = repo.replace_sets("missing", &[]).await;
    assert!(matches!(result, Err(PersistenceError::NotFound(_))));

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.exercises[0].sets.len(), 2);
}

#[tokio::test]
async fn test_save_tree_replaces_structure() {
    let (_db, repo, _) = setup().await;
    let mut tree = sample_tree("w1", t(1, 9), &["squat", "bench"]);
    repo.create_workout(&tree).await.unwrap();

    tree.exercises.remove(0);
    tree.exercises[0].position = 0;
    tree.exercises.push(WorkoutExercise {
        id: "w1-we-extra".to_string(),
        exercise_id: "row".to_string(),
        exercise_name: "Exercise row".to_string(),
        position: 1,
        planned_sets: 1,
        sets: vec![sample_set(1, 12, 40.0, true)],
    });
    tree.workout.notes = Some("short on time".to_string());
    repo.save_workout_tree(&tree).await.unwrap();

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded, tree);
}

#[tokio::test]
async fn test_save_tree_of_missing_workout_fails() {
    let (_db, repo, _) = setup().await;
    let tree = sample_tree("ghost", t(1, 9), &["squat"]);
    let result = repo.save_workout_tree(&tree).await;
    assert!(matches!(result, Err(PersistenceError::WorkoutNotActive(_))));
    assert!(repo.load_workout_tree("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_cascades() {
    let (db, repo, _) = setup().await;
    repo.create_workout(&sample_tree("w1", t(1, 9), &["squat", "bench"]))
        .await
        .unwrap();
    repo.delete_workout("w1").await.unwrap();

    assert!(repo.load_workout_tree("w1").await.unwrap().is_none());
    let (sets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workout_sets")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(sets, 0);
    let (exercises,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workout_exercises")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(exercises, 0);
}

#[tokio::test]
async fn test_exercise_name_comes_from_catalog() {
    let (_db, repo, catalog) = setup().await;
    repo.create_workout(&sample_tree("w1", t(1, 9), &["squat"]))
        .await
        .unwrap();
    let mut renamed = sample_exercise("squat");
    renamed.name = "Back Squat".to_string();
    catalog.save_exercise(&renamed).await.unwrap();

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.exercises[0].exercise_name, "Back Squat");
}

// ── History queries ────────────────────────────────────────────────────

#[tokio::test]
async fn test_previous_performance_uses_most_recent_completed() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "old", t(1, 9), &["squat"], 90.0).await;
    complete_workout(&repo, "new", t(3, 9), &["squat", "bench"], 100.0).await;
    complete_workout(&repo, "other", t(4, 9), &["bench"], 60.0).await;

    let sets = repo
        .find_previous_performance("squat", t(5, 9))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sets.len(), 2);
    assert!(sets.iter().all(|s| s.weight_kg == 100.0 && s.completed));

    // Only workouts started before the cutoff count.
    let sets = repo
        .find_previous_performance("squat", t(2, 9))
        .await
        .unwrap()
        .unwrap();
    assert!(sets.iter().all(|s| s.weight_kg == 90.0));

    assert!(repo
        .find_previous_performance("row", t(5, 9))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_previous_performance_skips_unperformed_and_active() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "done", t(1, 9), &["squat"], 90.0).await;

    // Finalized without completing any squat set.
    let skipped = sample_tree("skipped", t(2, 9), &["squat"]);
    repo.create_workout(&skipped).await.unwrap();
    repo.finalize_workout(&skipped, t(2, 10), 3600).await.unwrap();

    // Active workout with completed sets.
    let mut active = sample_tree("active", t(3, 9), &["squat"]);
    active.exercises[0].sets[0].completed = true;
    active.exercises[0].sets[0].weight_kg = 140.0;
    repo.create_workout(&active).await.unwrap();

    let sets = repo
        .find_previous_performance("squat", t(4, 9))
        .await
        .unwrap()
        .unwrap();
    assert!(sets.iter().all(|s| s.weight_kg == 90.0));
}

#[tokio::test]
async fn test_list_completed_since_and_order() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "a", t(1, 9), &["squat"], 90.0).await;
    complete_workout(&repo, "b", t(5, 9), &["squat"], 95.0).await;
    complete_workout(&repo, "c", t(9, 9), &["squat"], 100.0).await;
    repo.create_workout(&sample_tree("active", t(10, 9), &["squat"]))
        .await
        .unwrap();

    let all = repo.list_completed_workouts(None).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|w| w.workout.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b", "a"]);

    let recent = repo.list_completed_workouts(Some(t(5, 0))).await.unwrap();
    let ids: Vec<&str> = recent.iter().map(|w| w.workout.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "b"]);
}

#[tokio::test]
async fn test_completion_times() {
    let (_db, repo, _) = setup().await;
    complete_workout(&repo, "a", t(1, 9), &["squat"], 90.0).await;
    complete_workout(&repo, "b", t(2, 9), &["squat"], 90.0).await;

    let times = repo.completion_times().await.unwrap();
    assert_eq!(
        times,
        vec![t(2, 9) + Duration::minutes(45), t(1, 9) + Duration::minutes(45)]
    );
}

// ── Catalog ────────────────────────────────────────────────────────────

fn sample_routine(id: &str) -> Routine {
    Routine {
        id: id.to_string(),
        name: "Leg Day".to_string(),
        exercises: vec![
            RoutineExercise {
                exercise_id: "squat".to_string(),
                target_sets: 5,
            },
            RoutineExercise {
                exercise_id: "row".to_string(),
                target_sets: 0,
            },
        ],
        created_at: t(1, 8),
    }
}

#[tokio::test]
async fn test_exercise_catalog_roundtrip() {
    let (_db, _, catalog) = setup().await;
    let mut custom = sample_exercise("zercher");
    custom.name = "Zercher Squat".to_string();
    custom.is_custom = true;
    custom.secondary_muscles = vec![];
    catalog.save_exercise(&custom).await.unwrap();

    assert_eq!(catalog.load_exercise("zercher").await.unwrap(), Some(custom));
    assert!(catalog.load_exercise("missing").await.unwrap().is_none());
    assert_eq!(catalog.list_exercises().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_routine_roundtrip_and_update() {
    let (_db, _, catalog) = setup().await;
    let mut routine = sample_routine("r1");
    catalog.save_routine(&routine).await.unwrap();
    assert_eq!(catalog.load_routine("r1").await.unwrap(), Some(routine.clone()));

    routine.name = "Legs".to_string();
    routine.exercises.pop();
    catalog.save_routine(&routine).await.unwrap();
    assert_eq!(catalog.load_routine("r1").await.unwrap(), Some(routine));
    assert_eq!(catalog.list_routines().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_routine_name_joins_onto_workout() {
    let (_db, repo, catalog) = setup().await;
    catalog.save_routine(&sample_routine("r1")).await.unwrap();
    let mut tree = sample_tree("w1", t(1, 9), &["squat"]);
    tree.workout.routine_id = Some("r1".to_string());
    repo.create_workout(&tree).await.unwrap();

    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.workout.routine_name.as_deref(), Some("Leg Day"));

    // Updating the routine must not detach the workout.
    catalog.save_routine(&sample_routine("r1")).await.unwrap();
    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.workout.routine_id.as_deref(), Some("r1"));

    catalog.delete_routine("r1").await.unwrap();
    let loaded = repo.load_workout_tree("w1").await.unwrap().unwrap();
    assert_eq!(loaded.workout.routine_id, None);
    assert_eq!(loaded.workout.routine_name, None);
    assert_eq!(loaded.exercises.len(), 1);
}

// ── Preferences ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_preferences_crud() {
    let db = Database::new_in_memory().await.unwrap();
    let repo = SqlitePreferenceRepository::new(db.pool().clone());

    assert!(repo.get_preference(KEY_MASS_UNIT).await.unwrap().is_none());
    repo.set_preference(KEY_MASS_UNIT, "kg").await.unwrap();
    repo.set_preference(KEY_MASS_UNIT, "lb").await.unwrap();
    assert_eq!(
        repo.get_preference(KEY_MASS_UNIT).await.unwrap().as_deref(),
        Some("lb")
    );

    repo.delete_preference(KEY_MASS_UNIT).await.unwrap();
    assert!(repo.list_preferences().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_typed_preferences() {
    let db = Database::new_in_memory().await.unwrap();
    let repo = SqlitePreferenceRepository::new(db.pool().clone());

    let mut prefs = Preferences::load(&repo).await.unwrap();
    assert_eq!(prefs, Preferences::default());

    prefs.set(&repo, KEY_WEEKLY_GOAL, "4").await.unwrap();
    let result = prefs.set(&repo, KEY_MASS_UNIT, "stone").await;
    assert!(matches!(result, Err(PersistenceError::InvalidValue(_))));

    // A value written behind our back is ignored on load.
    repo.set_preference(KEY_MASS_UNIT, "stone").await.unwrap();
    let reloaded = Preferences::load(&repo).await.unwrap();
    assert_eq!(reloaded.weekly_goal, 4);
    assert_eq!(reloaded.mass_unit, training::MassUnit::Kg);
}

// ── Transfer ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_export_import_into_fresh_database() {
    let (db, repo, catalog) = setup().await;
    catalog.save_routine(&sample_routine("r1")).await.unwrap();
    complete_workout(&repo, "a", t(1, 9), &["squat"], 90.0).await;
    complete_workout(&repo, "b", t(2, 9), &["bench", "row"], 50.0).await;
    repo.create_workout(&sample_tree("active", t(3, 9), &["squat"]))
        .await
        .unwrap();

    let source = SqliteTransferRepository::new(db.pool().clone());
    let bundle = source.export_bundle(t(3, 12)).await.unwrap();
    assert_eq!(bundle.workouts.len(), 2);
    assert_eq!(bundle.workouts[0].workout.id, "a");

    let target_db = Database::new_in_memory().await.unwrap();
    let target = SqliteTransferRepository::new(target_db.pool().clone());
    let report = target.import_bundle(&bundle).await.unwrap();
    assert_eq!(report.exercises, 3);
    assert_eq!(report.routines, 1);
    assert_eq!(report.workouts, 2);

    // Importing twice is idempotent.
    target.import_bundle(&bundle).await.unwrap();
    let reexported = target.export_bundle(t(3, 12)).await.unwrap();
    assert_eq!(reexported, bundle);
}

#[tokio::test]
async fn test_import_is_all_or_nothing() {
    let (db, repo, _) = setup().await;
    complete_workout(&repo, "a", t(1, 9), &["squat"], 90.0).await;
    let source = SqliteTransferRepository::new(db.pool().clone());
    let mut bundle = source.export_bundle(t(2, 9)).await.unwrap();

    // A workout referencing an exercise nobody knows about breaks the import.
    let mut broken = bundle.workouts[0].clone();
    broken.workout.id = "broken".to_string();
    broken.exercises[0].id = "broken-we".to_string();
    broken.exercises[0].exercise_id = "unknown".to_string();
    bundle.workouts.push(broken);

    let target_db = Database::new_in_memory().await.unwrap();
    let target = SqliteTransferRepository::new(target_db.pool().clone());
    assert!(target.import_bundle(&bundle).await.is_err());

    let empty = target.export_bundle(t(2, 9)).await.unwrap();
    assert!(empty.exercises.is_empty());
    assert!(empty.workouts.is_empty());
}
