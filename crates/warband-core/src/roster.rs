//! Roster observation and deterministic leader election.
//!
//! The roster is rebuilt from the host every coordination cycle: locally
//! known party membership merged with the host's currently-active agent
//! list, always including self, sorted lexically so every agent that sees
//! the same membership derives the same order.
//!
//! Leader election is *not* a protocol. [`choose_leader`] is a pure
//! function every agent evaluates locally over its own roster snapshot;
//! agreement follows from determinism, not from communication.

use std::collections::BTreeMap;

use warband_types::{AgentIdentity, AgentName, ClassType};

// ---------------------------------------------------------------------------
// RosterSource
// ---------------------------------------------------------------------------

/// Host seam supplying the raw membership observations.
///
/// Implementations read the game client's party and server state. Both
/// methods are infallible by contract: an unavailable source returns an
/// empty list and the snapshot degrades to `[self]`.
pub trait RosterSource {
    /// Agents in our party, as currently known.
    fn party_members(&self) -> Vec<AgentIdentity>;

    /// Agents of ours the host reports as currently online.
    fn active_agents(&self) -> Vec<AgentIdentity>;
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The deduplicated, lexically sorted set of known-online agents.
///
/// Always contains self. Never persisted; a roster is valid for exactly
/// one coordination cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    /// Member names, sorted lexically, deduplicated.
    names: Vec<AgentName>,
    /// Per-member identity metadata observed this cycle.
    meta: BTreeMap<AgentName, AgentIdentity>,
}

impl Roster {
    /// Observe the current roster from the host.
    ///
    /// Merges party membership with the active-agent list, always includes
    /// `self_identity`, drops empty names, deduplicates, and sorts.
    pub fn snapshot(source: &dyn RosterSource, self_identity: &AgentIdentity) -> Self {
        let mut members = source.party_members();
        members.extend(source.active_agents());
        members.push(self_identity.clone());
        Self::from_members(members)
    }

    /// Build a roster directly from a list of identities.
    ///
    /// Later entries win on duplicate names, so live observations appended
    /// after stale party data take precedence.
    pub fn from_members(members: Vec<AgentIdentity>) -> Self {
        let mut meta = BTreeMap::new();
        for member in members {
            if member.name.is_empty() {
                continue;
            }
            meta.insert(member.name.clone(), member);
        }
        let names: Vec<AgentName> = meta.keys().cloned().collect();
        Self { names, meta }
    }

    /// Member names in deterministic (lexical) order.
    pub fn names(&self) -> &[AgentName] {
        &self.names
    }

    /// Identity metadata for a member, when observed this cycle.
    pub fn meta(&self, name: &AgentName) -> Option<&AgentIdentity> {
        self.meta.get(name)
    }

    /// Class of a member, when its metadata was observed this cycle.
    pub fn class_of(&self, name: &AgentName) -> Option<ClassType> {
        self.meta.get(name).map(|m| m.class_type)
    }

    /// Whether the roster contains the given name.
    pub fn contains(&self, name: &AgentName) -> bool {
        self.meta.contains_key(name)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Leader election
// ---------------------------------------------------------------------------

/// Deterministically pick the coordination leader for this cycle.
///
/// Merchants are never eligible: they run the logistics loop, not combat
/// coordination. Rangers are deprioritized because they are routinely sent
/// off on solo filler duty and make a poor single point of coordination.
///
/// Selection order over the roster's lexical order:
/// 1. first member whose class is known, not merchant, and not ranger;
/// 2. else the first known non-merchant;
/// 3. else the first member outright.
///
/// Members whose class was not observed this cycle are skipped by the
/// class-aware passes (they could be merchants) and only reachable through
/// the final fallback.
///
/// Pure and total: returns `None` only for an empty roster, and two calls
/// with identical inputs always return the same name.
pub fn choose_leader(roster: &Roster) -> Option<AgentName> {
    let class_ok = |name: &AgentName, accept: fn(ClassType) -> bool| {
        roster.class_of(name).is_some_and(accept)
    };

    roster
        .names()
        .iter()
        .find(|name| class_ok(name, |c| !c.is_merchant() && !c.is_ranger()))
        .or_else(|| {
            roster
                .names()
                .iter()
                .find(|name| class_ok(name, |c| !c.is_merchant()))
        })
        .or_else(|| roster.names().first())
        .cloned()
}
