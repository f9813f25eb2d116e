//! In-memory state of the active workout.

use chrono::{DateTime, Utc};
use training::{SetEntry, SetTemplate, WorkoutExercise, WorkoutTree};

use super::commands::{EngineError, SetUpdate};
use super::seeding;
use super::snapshot::{ExerciseView, SessionView};
use crate::persistence::traits::WorkoutRepository;
use crate::persistence::PersistenceError;

/// What changed since the last successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirtyScope {
    Clean,
    /// Only the sets of one exercise changed.
    Sets(usize),
    Tree,
}

/// A write captured from the session, detached from it so it can run on
/// another task.
#[derive(Debug, Clone)]
pub(crate) enum PendingWrite {
    Sets {
        workout_exercise_id: String,
        sets: Vec<SetEntry>,
    },
    Tree(WorkoutTree),
}

impl PendingWrite {
    pub(crate) async fn apply<W: WorkoutRepository>(&self, repo: &W) -> Result<(), PersistenceError> {
        match self {
            Self::Sets {
                workout_exercise_id,
                sets,
            } => repo.replace_sets(workout_exercise_id, sets).await,
            Self::Tree(tree) => repo.save_workout_tree(tree).await,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Sets { .. } => "sets",
            Self::Tree(_) => "tree",
        }
    }
}

pub(crate) struct ActiveSession {
    tree: WorkoutTree,
    /// Completed sets per exercise, maintained by delta.
    completed: Vec<u32>,
    /// Prior performance per exercise, used to seed appended sets.
    history: Vec<Vec<SetEntry>>,
    revision: u64,
    saved_revision: u64,
    scope: DirtyScope,
}

impl ActiveSession {
    /// Wrap a tree that matches what is stored.
    pub(crate) fn new(tree: WorkoutTree, history: Vec<Vec<SetEntry>>) -> Self {
        let completed = tree
            .exercises
            .iter()
            .map(WorkoutExercise::count_completed)
            .collect();
        Self {
            tree,
            completed,
            history,
            revision: 0,
            saved_revision: 0,
            scope: DirtyScope::Clean,
        }
    }

    pub(crate) fn tree(&self) -> &WorkoutTree {
        &self.tree
    }

    pub(crate) fn workout_id(&self) -> &str {
        &self.tree.workout.id
    }

    pub(crate) fn started_at(&self) -> DateTime<Utc> {
        self.tree.workout.started_at
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub(crate) fn completed_sets(&self, exercise_index: usize) -> Option<u32> {
        self.completed.get(exercise_index).copied()
    }

    /// Smallest write that brings storage up to date, if any.
    pub(crate) fn pending_write(&self) -> Option<PendingWrite> {
        match self.scope {
            DirtyScope::Clean => None,
            DirtyScope::Sets(index) => {
                let exercise = &self.tree.exercises[index];
                Some(PendingWrite::Sets {
                    workout_exercise_id: exercise.id.clone(),
                    sets: exercise.sets.clone(),
                })
            }
            DirtyScope::Tree => Some(PendingWrite::Tree(self.tree.clone())),
        }
    }

    /// Storage now holds everything up to `revision`.
    pub(crate) fn mark_saved(&mut self, revision: u64) {
        self.saved_revision = self.saved_revision.max(revision);
        if self.saved_revision == self.revision {
            self.scope = DirtyScope::Clean;
        }
    }

    fn touch_sets(&mut self, exercise_index: usize) {
        self.revision += 1;
        self.scope = match self.scope {
            DirtyScope::Clean => DirtyScope::Sets(exercise_index),
            DirtyScope::Sets(index) if index == exercise_index => DirtyScope::Sets(index),
            _ => DirtyScope::Tree,
        };
    }

    fn touch_tree(&mut self) {
        self.revision += 1;
        self.scope = DirtyScope::Tree;
    }

    fn exercise_mut(&mut self, index: usize) -> Result<&mut WorkoutExercise, EngineError> {
        let len = self.tree.exercises.len();
        self.tree
            .exercises
            .get_mut(index)
            .ok_or(EngineError::ExerciseOutOfRange { index, len })
    }

    pub(crate) fn log_set(
        &mut self,
        exercise_index: usize,
        set_number: u32,
        update: &SetUpdate,
    ) -> Result<(), EngineError> {
        update.validate()?;
        let exercise = self.exercise_mut(exercise_index)?;
        let len = exercise.sets.len();
        let set = set_number
            .checked_sub(1)
            .and_then(|i| exercise.sets.get_mut(i as usize))
            .ok_or(EngineError::SetOutOfRange { set_number, len })?;

        let was_completed = set.completed;
        if let Some(reps) = update.reps {
            set.reps = reps;
        }
        if let Some(weight_kg) = update.weight_kg {
            set.weight_kg = weight_kg;
        }
        if let Some(rest_seconds) = update.rest_seconds {
            set.rest_seconds = rest_seconds;
        }
        if let Some(completed) = update.completed {
            set.completed = completed;
        }
        if let Some(intensity) = update.intensity {
            set.intensity = intensity;
        }
        if let Some(note) = &update.note {
            set.note = note.clone();
        }

        match (was_completed, set.completed) {
            (false, true) => self.completed[exercise_index] += 1,
            (true, false) => self.completed[exercise_index] -= 1,
            _ => {}
        }
        self.touch_sets(exercise_index);
        Ok(())
    }

    /// Append a seeded set and return its number.
    pub(crate) fn add_set(
        &mut self,
        exercise_index: usize,
        fallback: SetTemplate,
    ) -> Result<u32, EngineError> {
        let history = self
            .history
            .get(exercise_index)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let len = self.tree.exercises.len();
        let exercise = self
            .tree
            .exercises
            .get_mut(exercise_index)
            .ok_or(EngineError::ExerciseOutOfRange {
                index: exercise_index,
                len,
            })?;

        let template = seeding::next_set(history, &exercise.sets, fallback);
        let set_number = exercise.sets.len() as u32 + 1;
        exercise.sets.push(SetEntry::from_template(set_number, template));
        self.touch_sets(exercise_index);
        Ok(set_number)
    }

    /// Remove the trailing set. Only an incomplete tail may go, and never
    /// the last remaining set.
    pub(crate) fn remove_set(&mut self, exercise_index: usize) -> Result<(), EngineError> {
        let exercise = self.exercise_mut(exercise_index)?;
        if exercise.sets.len() <= 1 {
            return Err(EngineError::LastSetProtected);
        }
        if exercise.sets.last().is_some_and(|s| s.completed) {
            return Err(EngineError::SetCompletedProtected);
        }
        exercise.sets.pop();
        self.touch_sets(exercise_index);
        Ok(())
    }

    pub(crate) fn add_exercise(&mut self, mut exercise: WorkoutExercise, history: Vec<SetEntry>) {
        exercise.position = self.tree.exercises.len() as u32;
        self.completed.push(exercise.count_completed());
        self.tree.exercises.push(exercise);
        self.history.push(history);
        self.touch_tree();
    }

    pub(crate) fn set_notes(&mut self, notes: Option<String>) {
        self.tree.workout.notes = notes.filter(|n| !n.trim().is_empty());
        self.touch_tree();
    }

    pub(crate) fn into_tree(self) -> WorkoutTree {
        self.tree
    }

    /// Base view; the engine fills in autosave fields.
    pub(crate) fn view(&self, now: DateTime<Utc>) -> SessionView {
        let exercises = self
            .tree
            .exercises
            .iter()
            .enumerate()
            .map(|(index, exercise)| ExerciseView {
                index,
                exercise_id: exercise.exercise_id.clone(),
                name: exercise.exercise_name.clone(),
                planned_sets: exercise.planned_sets,
                completed_sets: self.completed_sets(index).unwrap_or_default(),
                sets: exercise.sets.clone(),
            })
            .collect();

        SessionView {
            workout_id: self.tree.workout.id.clone(),
            routine_name: self.tree.workout.routine_name.clone(),
            started_at: self.started_at(),
            elapsed_secs: (now - self.started_at()).num_seconds().max(0),
            notes: self.tree.workout.notes.clone(),
            exercises,
            completed_sets: self.completed.iter().sum(),
            save_status: super::autosave::SaveStatus::Idle,
            unsaved_changes: self.is_dirty(),
            failed_saves: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use training::{MassUnit, WorkoutRecord};

    fn set(n: u32, completed: bool) -> SetEntry {
        SetEntry {
            set_number: n,
            reps: 5,
            weight_kg: 100.0,
            rest_seconds: 120,
            completed,
            intensity: None,
            note: None,
        }
    }

    fn exercise(id: &str, sets: Vec<SetEntry>) -> WorkoutExercise {
        WorkoutExercise {
            id: format!("we-{id}"),
            exercise_id: id.to_string(),
            exercise_name: id.to_uppercase(),
            position: 0,
            planned_sets: sets.len() as u32,
            sets,
        }
    }

    fn session() -> ActiveSession {
        let mut tree = WorkoutTree {
            workout: WorkoutRecord {
                id: "w1".to_string(),
                routine_id: None,
                routine_name: None,
                started_at: Utc.with_ymd_and_hms(2026, 3, 3, 18, 0, 0).unwrap(),
                completed_at: None,
                duration_secs: None,
                notes: None,
            },
            exercises: vec![
                exercise("squat", vec![set(1, true), set(2, false)]),
                exercise("bench", vec![set(1, false)]),
            ],
        };
        tree.exercises[1].position = 1;
        ActiveSession::new(tree, vec![vec![], vec![]])
    }

    #[test]
    fn test_new_session_is_clean() {
        let s = session();
        assert!(!s.is_dirty());
        assert!(s.pending_write().is_none());
        assert_eq!(s.completed_sets(0), Some(1));
    }

    #[test]
    fn test_log_set_updates_counter_by_delta() {
        let mut s = session();
        s.log_set(0, 2, &SetUpdate::completed(5, 100.0)).unwrap();
        assert_eq!(s.completed_sets(0), Some(2));

        // Re-completing an already completed set does not double count.
        s.log_set(0, 2, &SetUpdate::completed(6, 100.0)).unwrap();
        assert_eq!(s.completed_sets(0), Some(2));

        let undo = SetUpdate {
            completed: Some(false),
            ..SetUpdate::default()
        };
        s.log_set(0, 1, &undo).unwrap();
        assert_eq!(s.completed_sets(0), Some(1));
        assert_eq!(s.tree().exercises[0].sets[1].reps, 6);
    }

    #[test]
    fn test_log_set_rejects_unstorable_weight() {
        let mut s = session();
        for update in [
            SetUpdate::completed(5, f64::NAN),
            SetUpdate::completed(5, -50.0),
            SetUpdate::default().with_weight(f64::INFINITY, MassUnit::Lb),
        ] {
            assert!(matches!(
                s.log_set(0, 2, &update),
                Err(EngineError::InvalidValue(_))
            ));
        }
        assert!(!s.is_dirty());
        assert_eq!(s.completed_sets(0), Some(1));
        assert_eq!(s.tree().exercises[0].sets[1].weight_kg, 100.0);

        // Zero is a valid bodyweight load.
        s.log_set(0, 2, &SetUpdate::completed(12, 0.0)).unwrap();
        assert_eq!(s.completed_sets(0), Some(2));
    }

    #[test]
    fn test_log_set_bounds() {
        let mut s = session();
        assert_eq!(
            s.log_set(5, 1, &SetUpdate::default()),
            Err(EngineError::ExerciseOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(
            s.log_set(0, 0, &SetUpdate::default()),
            Err(EngineError::SetOutOfRange {
                set_number: 0,
                len: 2
            })
        );
        assert_eq!(
            s.log_set(0, 3, &SetUpdate::default()),
            Err(EngineError::SetOutOfRange {
                set_number: 3,
                len: 2
            })
        );
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_log_set_can_clear_tags() {
        let mut s = session();
        let tag = SetUpdate {
            intensity: Some(Some(training::Intensity::Light)),
            note: Some(Some("easy".to_string())),
            ..SetUpdate::default()
        };
        s.log_set(1, 1, &tag).unwrap();
        assert_eq!(s.tree().exercises[1].sets[0].note.as_deref(), Some("easy"));

        let clear = SetUpdate {
            intensity: Some(None),
            note: Some(None),
            ..SetUpdate::default()
        };
        s.log_set(1, 1, &clear).unwrap();
        assert_eq!(s.tree().exercises[1].sets[0].intensity, None);
        assert_eq!(s.tree().exercises[1].sets[0].note, None);
    }

    #[test]
    fn test_add_then_remove_is_net_zero() {
        let mut s = session();
        assert_eq!(s.add_set(1, SetTemplate::default()).unwrap(), 2);
        s.remove_set(1).unwrap();
        assert_eq!(s.tree().exercises[1].sets.len(), 1);
    }

    #[test]
    fn test_remove_completed_tail_is_rejected() {
        let mut s = session();
        let number = s.add_set(1, SetTemplate::default()).unwrap();
        s.log_set(1, number, &SetUpdate::completed(5, 50.0)).unwrap();
        assert_eq!(s.remove_set(1), Err(EngineError::SetCompletedProtected));
        assert_eq!(s.tree().exercises[1].sets.len(), 2);
    }

    #[test]
    fn test_last_set_is_protected() {
        let mut s = session();
        assert_eq!(s.remove_set(1), Err(EngineError::LastSetProtected));
    }

    #[test]
    fn test_add_set_copies_previous_set() {
        let mut s = session();
        s.log_set(0, 2, &SetUpdate::completed(3, 120.0)).unwrap();
        s.add_set(0, SetTemplate::default()).unwrap();
        let added = &s.tree().exercises[0].sets[2];
        assert_eq!((added.set_number, added.reps, added.weight_kg), (3, 3, 120.0));
        assert!(!added.completed);
    }

    #[test]
    fn test_dirty_scope_narrows_to_one_exercise() {
        let mut s = session();
        s.log_set(0, 1, &SetUpdate::completed(5, 100.0)).unwrap();
        s.add_set(0, SetTemplate::default()).unwrap();
        match s.pending_write() {
            Some(PendingWrite::Sets {
                workout_exercise_id,
                sets,
            }) => {
                assert_eq!(workout_exercise_id, "we-squat");
                assert_eq!(sets.len(), 3);
            }
            other => panic!("expected a sets write, got {other:?}"),
        }

        s.log_set(1, 1, &SetUpdate::completed(5, 100.0)).unwrap();
        assert!(matches!(s.pending_write(), Some(PendingWrite::Tree(_))));
    }

    #[test]
    fn test_mark_saved_keeps_later_changes_dirty() {
        let mut s = session();
        s.set_notes(Some("felt strong".to_string()));
        let saved_at = s.revision();
        s.log_set(0, 2, &SetUpdate::completed(5, 100.0)).unwrap();

        s.mark_saved(saved_at);
        assert!(s.is_dirty());
        assert!(s.pending_write().is_some());

        s.mark_saved(s.revision());
        assert!(!s.is_dirty());
        assert!(s.pending_write().is_none());
    }

    #[test]
    fn test_add_exercise_sets_position() {
        let mut s = session();
        s.add_exercise(exercise("row", vec![set(1, false)]), vec![]);
        assert_eq!(s.tree().exercises[2].position, 2);
        assert_eq!(s.completed_sets(2), Some(0));
        assert!(matches!(s.pending_write(), Some(PendingWrite::Tree(_))));
    }

    #[test]
    fn test_view_elapsed() {
        let s = session();
        let now = s.started_at() + chrono::Duration::minutes(30);
        let view = s.view(now);
        assert_eq!(view.elapsed_secs, 1800);
        assert_eq!(view.completed_sets, 1);
        assert_eq!(view.exercises[1].name, "BENCH");

        // A clock behind the start never reports negative time.
        assert_eq!(s.view(s.started_at() - chrono::Duration::minutes(1)).elapsed_secs, 0);
    }
}
