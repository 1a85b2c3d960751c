//! The leader's task directive and its supporting types.
//!
//! One [`Assignment`] per coordination cycle is the single authoritative
//! description of who farms what. It is created by the elected leader,
//! broadcast to every peer, and superseded by the next assignment with a
//! different signature. Stale assignments are never deleted, only ignored.
//!
//! The `task_key` is the content-stable identity of the *logical task*
//! (mode + hunt target + world event): two assignments with equal task keys
//! are the same task even if role membership changed between cycles, which
//! is what lets wipe counts accumulate across re-rosters.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentName;
use crate::combat::TargetId;

/// Hard cap on concurrently active farmers (crab + monsterhunt).
pub const MAX_ACTIVE_FARMERS: usize = 3;

// ---------------------------------------------------------------------------
// Point / EventRef
// ---------------------------------------------------------------------------

/// A world position used as a travel or rally destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// Map the coordinates live on.
    pub map: String,
}

impl Point {
    /// Create a point on the given map.
    pub fn new(x: f64, y: f64, map: impl Into<String>) -> Self {
        Self {
            x,
            y,
            map: map.into(),
        }
    }
}

/// Reference to a joinable world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRef {
    /// Event name (also its identity for task-key purposes).
    pub name: String,
    /// The event boss, when the event has one.
    pub target: Option<TargetId>,
    /// Where to gather for the event.
    pub rally: Option<Point>,
}

// ---------------------------------------------------------------------------
// AssignmentMode
// ---------------------------------------------------------------------------

/// The coordination mode the leader selected for this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Ordinary farming: crab filler plus a hunt pair.
    Default,
    /// Target classified difficult: trio with a priest anchor.
    Difficult,
    /// Weak target: ranger burst composition.
    Weak,
    /// A joinable world event takes precedence over farming.
    WorldEvent,
    /// A recent danger report on the target: add support before engaging.
    HelpRequested,
    /// An ally is in trouble: redirect all farmers to save them.
    AssistFocus,
    /// Too many full-squad wipes: collapse roles and fall back to a rally.
    RegroupTracker,
}

impl AssignmentMode {
    /// Stable snake\_case name, used in task keys and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Difficult => "difficult",
            Self::Weak => "weak",
            Self::WorldEvent => "world_event",
            Self::HelpRequested => "help_requested",
            Self::AssistFocus => "assist_focus",
            Self::RegroupTracker => "regroup_tracker",
        }
    }
}

impl core::fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RegroupDirective
// ---------------------------------------------------------------------------

/// Instruction to abandon the current task and gather at a safe point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegroupDirective {
    /// Why the regroup was ordered (log/debug text).
    pub reason: String,
    /// The rally destination.
    pub dest: Point,
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// The leader's authoritative task and role directive for one cycle.
///
/// Invariant: `crab.len() + monsterhunt.len() <= MAX_ACTIVE_FARMERS`. The
/// assignment engine truncates after every selection branch to enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Coordination mode for this cycle.
    pub mode: AssignmentMode,
    /// Members on solo filler duty.
    pub crab: Vec<AgentName>,
    /// Members assigned to the main hunt target.
    pub monsterhunt: Vec<AgentName>,
    /// The main hunt target, when one is selected.
    pub hunt_target: Option<TargetId>,
    /// The world event being run, when one is active.
    pub world_event: Option<EventRef>,
    /// Where the hunt group gathers before engaging.
    pub hunt_rally_point: Option<Point>,
    /// The ally every farmer should converge on (assist-focus mode).
    pub focus_ally: Option<AgentName>,
    /// Regroup order (regroup-tracker mode).
    pub regroup: Option<RegroupDirective>,
    /// Whether a priest is among the active squad.
    pub priest_active: bool,
    /// Content-stable identity of the logical task.
    pub task_key: String,
}

impl Assignment {
    /// Derive the task key for a mode / hunt target / world event triple.
    ///
    /// Stable across cycles: role membership does not participate, so wipe
    /// counts keep accumulating while the squad is re-rostered.
    pub fn task_key_for(
        mode: AssignmentMode,
        hunt_target: Option<&TargetId>,
        world_event: Option<&EventRef>,
    ) -> String {
        let target = hunt_target.map_or("-", TargetId::as_str);
        let event = world_event.map_or("-", |e| e.name.as_str());
        format!("{mode}:{target}:{event}")
    }

    /// An empty assignment in the given mode with a freshly derived key.
    pub fn empty(mode: AssignmentMode) -> Self {
        Self {
            mode,
            crab: Vec::new(),
            monsterhunt: Vec::new(),
            hunt_target: None,
            world_event: None,
            hunt_rally_point: None,
            focus_ally: None,
            regroup: None,
            priest_active: false,
            task_key: Self::task_key_for(mode, None, None),
        }
    }

    /// Every member named by this assignment (crab and hunt roles).
    pub fn participants(&self) -> BTreeSet<AgentName> {
        self.crab
            .iter()
            .chain(self.monsterhunt.iter())
            .cloned()
            .collect()
    }

    /// Number of active farmer slots currently filled.
    pub fn active_farmers(&self) -> usize {
        self.crab.len() + self.monsterhunt.len()
    }

    /// Whether the given agent holds any role in this assignment.
    pub fn includes(&self, name: &AgentName) -> bool {
        self.crab.contains(name) || self.monsterhunt.contains(name)
    }
}

// ---------------------------------------------------------------------------
// MemberStatus
// ---------------------------------------------------------------------------

/// A squad member's last self-reported condition.
///
/// Broadcast on the bus each cycle; consumers must check freshness because
/// delivery is best-effort and a stale report must not trigger a rescue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStatus {
    /// Current hit points.
    pub hp: f64,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Whether the member is feared (cannot act).
    pub feared: bool,
    /// Whether incoming damage exceeds what the member can sustain.
    pub taking_too_much_damage: bool,
    /// When the member produced this report.
    pub reported_at: DateTime<Utc>,
}

impl MemberStatus {
    /// Current hp as a fraction of max (0.0 when max is unknown).
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp > 0.0 {
            self.hp / self.max_hp
        } else {
            0.0
        }
    }

    /// Whether the report is recent enough to act on.
    pub fn is_fresh(&self, now: DateTime<Utc>, window_ms: u64) -> bool {
        let age = now.signed_duration_since(self.reported_at);
        age >= TimeDelta::zero()
            && age <= TimeDelta::milliseconds(i64::try_from(window_ms).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn task_key_ignores_membership() {
        let mut a = Assignment::empty(AssignmentMode::Difficult);
        a.hunt_target = Some(TargetId::from("ogre"));
        a.task_key = Assignment::task_key_for(a.mode, a.hunt_target.as_ref(), None);

        let mut b = a.clone();
        b.monsterhunt = vec![AgentName::from("Aelric"), AgentName::from("Maudie")];

        assert_eq!(a.task_key, b.task_key);
        assert_eq!(a.task_key, "difficult:ogre:-");
    }

    #[test]
    fn participants_union_both_roles() {
        let mut a = Assignment::empty(AssignmentMode::Default);
        a.crab = vec![AgentName::from("Fletch")];
        a.monsterhunt = vec![AgentName::from("Aelric"), AgentName::from("Maudie")];

        let participants = a.participants();
        assert_eq!(participants.len(), 3);
        assert_eq!(a.active_farmers(), 3);
        assert!(a.includes(&AgentName::from("Fletch")));
        assert!(!a.includes(&AgentName::from("Wulfric")));
    }

    #[test]
    fn stale_status_is_not_fresh() {
        let now = Utc::now();
        let status = MemberStatus {
            hp: 200.0,
            max_hp: 800.0,
            feared: false,
            taking_too_much_damage: true,
            reported_at: now - TimeDelta::milliseconds(7_000),
        };
        assert!(!status.is_fresh(now, 6_000));
        assert!(status.is_fresh(now, 10_000));
        assert_eq!(status.hp_ratio(), 0.25);
    }
}
