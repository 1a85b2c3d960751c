//! Agent identity types.
//!
//! Every bot process controls exactly one character, identified by a stable,
//! unique character name. Names are the only cross-process identifier: the
//! command bus addresses peers by name and leader election orders by name.
//! Class and level metadata is re-observed from the host every coordination
//! cycle because online/offline status changes between cycles.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AgentName
// ---------------------------------------------------------------------------

/// The stable, unique name of one agent's character.
///
/// Wraps a `String` so agent names cannot be mixed up with other string
/// payloads (target ids, task keys) at compile time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentName(String);

impl AgentName {
    /// Create an agent name from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// View the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is empty (filtered out of rosters).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for AgentName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AgentName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for AgentName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ---------------------------------------------------------------------------
// ClassType
// ---------------------------------------------------------------------------

/// The character class of an agent.
///
/// Classes drive role selection: priests anchor difficult fights, rangers
/// fill solo farming duty, merchants never fight (they run a separate
/// logistics loop and are excluded from leader election entirely).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassType {
    /// Burst caster, fragile.
    Mage,
    /// Healer, the anchor of any difficult squad.
    Priest,
    /// Melee bruiser.
    Warrior,
    /// Ranged filler class, strong solo farmer.
    Ranger,
    /// Single-target melee damage.
    Rogue,
    /// Durable melee with self-sustain.
    Paladin,
    /// Non-combat logistics class.
    Merchant,
}

impl ClassType {
    /// Whether this class is excluded from combat coordination duty.
    pub const fn is_merchant(self) -> bool {
        matches!(self, Self::Merchant)
    }

    /// Whether this class is the solo-filler ranger class.
    pub const fn is_ranger(self) -> bool {
        matches!(self, Self::Ranger)
    }
}

impl core::fmt::Display for ClassType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Mage => "mage",
            Self::Priest => "priest",
            Self::Warrior => "warrior",
            Self::Ranger => "ranger",
            Self::Rogue => "rogue",
            Self::Paladin => "paladin",
            Self::Merchant => "merchant",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// AgentIdentity
// ---------------------------------------------------------------------------

/// One agent's identity as observed from the host this cycle.
///
/// Never cached beyond one coordination cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Stable unique character name.
    pub name: AgentName,
    /// Character class.
    pub class_type: ClassType,
    /// Character level.
    pub level: u32,
}

impl AgentIdentity {
    /// Create an identity from its parts.
    pub fn new(name: impl Into<AgentName>, class_type: ClassType, level: u32) -> Self {
        Self {
            name: name.into(),
            class_type,
            level,
        }
    }
}
