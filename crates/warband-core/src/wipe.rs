//! Full-squad wipe detection across lossy, unordered death reports.
//!
//! Every agent that dies broadcasts a death notification tagged with the
//! task key it was working and the participant set as it knew it. Peers
//! union the reports: when the set of dead members covers the full
//! participant set, that is one *wipe* (everyone on the task died), and
//! the per-task wipe counter increments exactly once before the death set
//! resets for the next attempt.
//!
//! Counting full-set coverage instead of single deaths makes the tracker
//! resilient to staggered deaths delivered out of order, duplicated, or
//! partially lost: a missing report just delays the increment until a
//! rebroadcast or the next death fills the set.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use warband_types::AgentName;

/// Per-task state while a squad attempt is in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TaskDeaths {
    /// Everyone known to be assigned to this task (union of all reports).
    participants: BTreeSet<AgentName>,
    /// Members reported dead during the current attempt.
    dead: BTreeSet<AgentName>,
}

/// Tracks deaths and full-squad wipes per task key.
///
/// Wipe counts are monotonic for a given task key and reset only when the
/// task key itself is abandoned (a new target or mode).
#[derive(Debug, Clone, Default)]
pub struct WipeTracker {
    /// In-flight death sets per task key.
    deaths: BTreeMap<String, TaskDeaths>,
    /// Completed wipe counts per task key.
    wipes: BTreeMap<String, u32>,
}

impl WipeTracker {
    /// Create an empty tracker.
    pub const fn new() -> Self {
        Self {
            deaths: BTreeMap::new(),
            wipes: BTreeMap::new(),
        }
    }

    /// Record one member's death against a task.
    ///
    /// `participants` is the full participant set as the reporter knew it;
    /// sets from different reporters are unioned, so a stale or partial
    /// view never shrinks the squad. Returns `true` when this report
    /// completed a full-squad wipe (the counter incremented).
    pub fn record_death(
        &mut self,
        task_key: &str,
        participants: &[AgentName],
        who_died: &AgentName,
    ) -> bool {
        let entry = self.deaths.entry(task_key.to_owned()).or_default();
        entry
            .participants
            .extend(participants.iter().cloned());
        entry.participants.insert(who_died.clone());
        entry.dead.insert(who_died.clone());

        let wiped = !entry.participants.is_empty()
            && entry.dead.is_superset(&entry.participants);
        if wiped {
            let count = self.wipes.entry(task_key.to_owned()).or_insert(0);
            *count += 1;
            debug!(task_key, wipes = *count, "full squad wipe recorded");
            // Both sets reset: the next attempt may run with a different
            // squad under the same task key.
            entry.dead.clear();
            entry.participants.clear();
        }
        wiped
    }

    /// Completed full-squad wipes for a task key.
    pub fn wipes(&self, task_key: &str) -> u32 {
        self.wipes.get(task_key).copied().unwrap_or(0)
    }

    /// Drop all state except the given task key.
    ///
    /// Called when the active assignment moves to a new task: old keys can
    /// no longer trigger the circuit breaker and their death sets are
    /// meaningless for the new target.
    pub fn retain(&mut self, task_key: &str) {
        self.deaths.retain(|key, _| key == task_key);
        self.wipes.retain(|key, _| key == task_key);
    }
}
