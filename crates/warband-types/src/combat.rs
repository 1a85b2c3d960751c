//! Combat statistics and outcome estimates.
//!
//! Target stats come from two sources: static game-data definitions (which
//! can be stale if a monster was leveled up since the data dump) and live
//! observation of a spawned instance. Live stats always win when present.
//!
//! [`CombatOutcome`] is derived, never stored long-term: it is recomputed
//! from fresh stats before every engagement decision and rides inside the
//! danger broadcast so peers can see *why* a target was flagged.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TargetId
// ---------------------------------------------------------------------------

/// Identifier of a monster type or named target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Create a target id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TargetId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Where a set of target stats was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsSource {
    /// Static game-data definition; may be stale.
    Definition,
    /// Observed from a live instance; takes precedence.
    Live,
}

/// Combat statistics of a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStats {
    /// The target's type id.
    pub id: TargetId,
    /// Hit points.
    pub hp: f64,
    /// Attack value per hit.
    pub attack: f64,
    /// Flat damage reduction per incoming hit.
    pub armor: f64,
    /// Attacks per second.
    pub attack_frequency: f64,
    /// Where these stats came from.
    pub source: StatsSource,
}

/// Combat statistics of our own character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Hit points.
    pub hp: f64,
    /// Attack value per hit.
    pub attack: f64,
    /// Flat damage reduction per incoming hit.
    pub armor: f64,
    /// Attacks per second.
    pub attack_frequency: f64,
}

/// Everything known about one target this cycle.
///
/// Either source may be missing; [`resolved`] prefers live observation.
/// When both are absent the estimator treats the target as unknowable and
/// the danger check flags it conservatively.
///
/// [`resolved`]: TargetObservation::resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetObservation {
    /// The target's type id.
    pub id: TargetId,
    /// Stats from static game data, if the target type is known.
    pub definition: Option<TargetStats>,
    /// Stats observed from a live instance, if one is in view.
    pub live: Option<TargetStats>,
}

impl TargetObservation {
    /// Build an observation with no stats at all (unknown target).
    pub fn unknown(id: impl Into<TargetId>) -> Self {
        Self {
            id: id.into(),
            definition: None,
            live: None,
        }
    }

    /// The stats to use for estimation: live when present, else definition.
    pub fn resolved(&self) -> Option<&TargetStats> {
        self.live.as_ref().or(self.definition.as_ref())
    }
}

// ---------------------------------------------------------------------------
// CombatOutcome
// ---------------------------------------------------------------------------

/// Serialize non-finite millisecond values as JSON `null`.
///
/// An unbounded time-to-die (the target cannot hurt us) is `f64::INFINITY`
/// in memory, which JSON cannot carry. On the wire it becomes `null` and
/// decodes back to infinity.
mod unbounded_ms {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<f64>::deserialize(deserializer)?;
        Ok(value.unwrap_or(f64::INFINITY))
    }
}

/// The estimated result of one agent fighting one target to the end.
///
/// Derived by the estimator from attacker and target stats. The race that
/// matters is `time_to_die_ms - time_to_kill_ms`: negative means we lose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatOutcome {
    /// Hits needed to kill the target.
    pub hits_to_kill: u32,
    /// Hits the target needs to kill us; `None` when it cannot hurt us.
    pub hits_to_die: Option<u32>,
    /// Milliseconds to kill the target; infinite when we deal no damage.
    #[serde(with = "unbounded_ms")]
    pub time_to_kill_ms: f64,
    /// Milliseconds until the target kills us; infinite when it cannot.
    #[serde(with = "unbounded_ms")]
    pub time_to_die_ms: f64,
    /// Effective damage we deal per hit.
    pub damage_to_target: f64,
    /// Effective damage the target deals to us per hit.
    pub damage_to_self: f64,
}

impl CombatOutcome {
    /// The race margin in milliseconds: positive means we win with slack.
    ///
    /// Infinite time-to-die yields an infinite (safe) margin; infinite
    /// time-to-kill yields a negative-infinite (hopeless) margin.
    pub fn race_margin_ms(&self) -> f64 {
        self.time_to_die_ms - self.time_to_kill_ms
    }
}
