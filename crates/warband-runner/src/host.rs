//! Host bindings: the seam between the runtime and the game client.
//!
//! The coordination core only ever sees traits ([`RosterSource`],
//! [`CombatHost`]) plus the observation methods below. A live deployment
//! implements [`HostBindings`] over the real game client; the
//! [`SimulatedHost`] here is a stand-in that lets the whole tick loop run
//! end-to-end with a scripted roster and target.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use warband_core::engagement::{CombatHost, EngageOptions, HostError};
use warband_core::roster::RosterSource;
use warband_types::{
    AgentIdentity, ClassType, CombatStats, EventRef, MemberStatus, Point, TargetId,
    TargetObservation,
};

/// Everything the runtime needs from the game client.
///
/// Observation methods are infallible: an unavailable source returns
/// empty/`None` and the loop degrades gracefully. Action methods return
/// [`HostError`], which the tick loop logs and absorbs.
pub trait HostBindings: RosterSource + CombatHost {
    /// Our own identity as of this cycle.
    fn self_identity(&self) -> AgentIdentity;

    /// Our own combat stats as of this cycle.
    fn self_stats(&self) -> CombatStats;

    /// Our own condition report for the status protocol.
    fn self_status(&self, now: DateTime<Utc>) -> MemberStatus;

    /// The current hunt target candidate, with whatever stats are known.
    fn current_target(&self) -> Option<TargetObservation>;

    /// A joinable world event, when one is up.
    fn world_event(&self) -> Option<EventRef>;

    /// Known gathering point for the current target.
    fn hunt_rally(&self) -> Option<Point>;

    /// Whether we died since the last tick (consumed on read).
    fn take_death(&mut self) -> bool;

    /// Whether the character is mid-travel.
    fn is_busy_moving(&self) -> bool;

    /// Start traveling to a destination. Never blocks on arrival; the
    /// loop polls [`is_busy_moving`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the client rejects the travel request.
    ///
    /// [`is_busy_moving`]: HostBindings::is_busy_moving
    fn travel(&mut self, dest: &Point) -> Result<(), HostError>;
}

// ---------------------------------------------------------------------------
// SimulatedHost
// ---------------------------------------------------------------------------

/// A scripted host for exercising the loop without a live game client.
///
/// Peers, the target, and our own stats are fixed at construction; engage
/// and travel calls are logged and succeed. Useful for local runs and for
/// watching the coordination protocol converge across several processes
/// pointed at the same NATS server.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    /// Our own identity.
    identity: AgentIdentity,
    /// Our own combat stats.
    stats: CombatStats,
    /// The peers the host pretends are online.
    peers: Vec<AgentIdentity>,
    /// The target the host pretends is in view.
    target: Option<TargetObservation>,
    /// Set when the scripted character dies; consumed by the loop.
    pending_death: bool,
}

impl SimulatedHost {
    /// Create a simulated host for the given character.
    pub fn new(identity: AgentIdentity, peers: Vec<AgentIdentity>) -> Self {
        Self {
            identity,
            stats: CombatStats {
                hp: 2_000.0,
                attack: 250.0,
                armor: 50.0,
                attack_frequency: 1.0,
            },
            peers,
            target: None,
            pending_death: false,
        }
    }

    /// Script a target into view.
    pub fn set_target(&mut self, target: TargetObservation) {
        self.target = Some(target);
    }

    /// Script a death for the next tick.
    ///
    /// Exercised from tests; live runs take deaths from the client.
    #[allow(dead_code)]
    pub fn script_death(&mut self) {
        self.pending_death = true;
    }
}

impl RosterSource for SimulatedHost {
    fn party_members(&self) -> Vec<AgentIdentity> {
        self.peers.clone()
    }

    fn active_agents(&self) -> Vec<AgentIdentity> {
        Vec::new()
    }
}

impl CombatHost for SimulatedHost {
    fn engage(&mut self, target: &TargetId, options: &EngageOptions) -> Result<bool, HostError> {
        info!(target = %target, assist = ?options.assist_ally, "simulated engage");
        Ok(true)
    }
}

impl HostBindings for SimulatedHost {
    fn self_identity(&self) -> AgentIdentity {
        self.identity.clone()
    }

    fn self_stats(&self) -> CombatStats {
        self.stats.clone()
    }

    fn self_status(&self, now: DateTime<Utc>) -> MemberStatus {
        MemberStatus {
            hp: self.stats.hp,
            max_hp: self.stats.hp,
            feared: false,
            taking_too_much_damage: false,
            reported_at: now,
        }
    }

    fn current_target(&self) -> Option<TargetObservation> {
        self.target.clone()
    }

    fn world_event(&self) -> Option<EventRef> {
        None
    }

    fn hunt_rally(&self) -> Option<Point> {
        None
    }

    fn take_death(&mut self) -> bool {
        std::mem::take(&mut self.pending_death)
    }

    fn is_busy_moving(&self) -> bool {
        false
    }

    fn travel(&mut self, dest: &Point) -> Result<(), HostError> {
        debug!(x = dest.x, y = dest.y, map = %dest.map, "simulated travel");
        Ok(())
    }
}

/// Convenience constructor for a small scripted fleet used in local runs.
pub fn demo_fleet(self_name: &str) -> SimulatedHost {
    let peers = vec![
        AgentIdentity::new("Aelric", ClassType::Priest, 72),
        AgentIdentity::new("Cenwulf", ClassType::Warrior, 70),
        AgentIdentity::new("Erland", ClassType::Ranger, 68),
    ];
    let identity = peers
        .iter()
        .find(|p| p.name.as_str() == self_name)
        .cloned()
        .unwrap_or_else(|| AgentIdentity::new(self_name, ClassType::Warrior, 70));
    SimulatedHost::new(identity, peers)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scripted_death_is_consumed_on_read() {
        let mut host = demo_fleet("Cenwulf");
        assert!(!host.take_death());
        host.script_death();
        assert!(host.take_death());
        assert!(!host.take_death());
    }

    #[test]
    fn demo_fleet_knows_its_own_identity() {
        let host = demo_fleet("Aelric");
        assert_eq!(host.self_identity().class_type, ClassType::Priest);
        let host = demo_fleet("Stranger");
        assert_eq!(host.self_identity().name.as_str(), "Stranger");
    }
}
