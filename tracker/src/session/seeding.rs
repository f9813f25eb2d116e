//! Default values for newly created sets.
//!
//! New sets copy reps, weight and rest from the exercise's most recent prior
//! performance, matched set-for-set.

use training::{SetEntry, SetTemplate};

/// Template for the set at zero-based `index` given prior performance.
/// Falls back to the last known set when `index` runs past the history.
pub fn from_history(history: &[SetEntry], index: usize) -> Option<SetTemplate> {
    history
        .get(index)
        .or_else(|| history.last())
        .map(SetEntry::template)
}

/// Seed `count` sets for a freshly added exercise.
pub fn initial_sets(history: &[SetEntry], count: u32, fallback: SetTemplate) -> Vec<SetEntry> {
    (0..count)
        .map(|index| {
            let template = from_history(history, index as usize).unwrap_or(fallback);
            SetEntry::from_template(index + 1, template)
        })
        .collect()
}

/// Template for a set appended to `existing`.
///
/// An exact set-for-set match in the history wins; otherwise the previous
/// set in this workout is repeated, then the last known historical set, then
/// `fallback`.
pub fn next_set(history: &[SetEntry], existing: &[SetEntry], fallback: SetTemplate) -> SetTemplate {
    history
        .get(existing.len())
        .or_else(|| existing.last())
        .or_else(|| history.last())
        .map(SetEntry::template)
        .unwrap_or(fallback)
}
