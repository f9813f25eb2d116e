//! Autosave scheduling state machine.
//!
//! Pure bookkeeping: callers pass in the current instant and perform the
//! actual writes. At most one write is ever in flight; requests that arrive
//! while a write is running are folded into a single follow-up save.

use serde::Serialize;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing unsaved, or nothing scheduled.
    Idle,
    /// A background save will run once `due` has passed.
    Scheduled { due: Instant },
    /// A write is running and nothing changed since it started.
    InFlight,
    /// A write is running and more changes arrived meanwhile.
    InFlightPending,
}

/// Serializable summary of [`SaveState`] for snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Scheduled,
    Saving,
}

#[derive(Debug, Clone)]
pub struct Autosave {
    state: SaveState,
    debounce: Duration,
    cooldown: Duration,
    last_attempt: Option<Instant>,
    consecutive_failures: u32,
}

impl Autosave {
    pub fn new(debounce: Duration, cooldown: Duration) -> Self {
        Self {
            state: SaveState::Idle,
            debounce,
            cooldown,
            last_attempt: None,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn status(&self) -> SaveStatus {
        match self.state {
            SaveState::Idle => SaveStatus::Idle,
            SaveState::Scheduled { .. } => SaveStatus::Scheduled,
            SaveState::InFlight | SaveState::InFlightPending => SaveStatus::Saving,
        }
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Record that there is something new to save.
    ///
    /// An existing schedule keeps its deadline so a steady stream of edits
    /// cannot postpone the save indefinitely.
    pub fn request(&mut self, now: Instant) {
        self.state = match self.state {
            SaveState::Idle => SaveState::Scheduled {
                due: now + self.debounce,
            },
            SaveState::Scheduled { due } => SaveState::Scheduled { due },
            SaveState::InFlight | SaveState::InFlightPending => SaveState::InFlightPending,
        };
    }

    /// Whether a background save should start now.
    pub fn is_due(&self, now: Instant) -> bool {
        let SaveState::Scheduled { due } = self.state else {
            return false;
        };
        let cooled_down = self
            .last_attempt
            .map_or(true, |last| now.saturating_duration_since(last) >= self.cooldown);
        now >= due && cooled_down
    }

    /// A write (background or urgent) has started.
    pub fn begin(&mut self, now: Instant) {
        self.state = SaveState::InFlight;
        self.last_attempt = Some(now);
    }

    /// The running write finished.
    pub fn finish(&mut self, now: Instant, succeeded: bool) {
        if succeeded {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
        }
        self.state = match (self.state, succeeded) {
            (SaveState::InFlight, true) => SaveState::Idle,
            (SaveState::InFlightPending, _) | (SaveState::InFlight, false) => {
                SaveState::Scheduled {
                    due: now + self.debounce,
                }
            }
            (other, _) => other,
        };
    }

    /// Drop any schedule, e.g. after the session was discarded.
    pub fn reset(&mut self) {
        self.state = SaveState::Idle;
        self.consecutive_failures = 0;
    }
}
