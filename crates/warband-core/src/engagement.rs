//! The per-tick engagement decision: estimate, then act, pause, or warn.
//!
//! The core decides *whether* and *whom* to engage; the host binding owns
//! range-closing, skill usage, and the attack itself behind [`CombatHost`].
//!
//! Every engagement attempt runs the estimator first. A dangerous estimate
//! is broadcast to the party exactly once per danger window and the target
//! is left alone until the window expires; a safe estimate goes straight
//! to the host. Host failures are returned to the tick loop, which logs
//! and moves on; nothing in this path may take the agent down.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use warband_types::{AgentName, Command, CombatStats, TargetId, TargetObservation};

use crate::coordinator::Coordinator;
use crate::estimator::{estimate, is_dangerous};
use crate::roster::Roster;

/// A host-side combat primitive failed.
///
/// Carries the host's own description; the tick loop logs it and carries
/// on with the next tick.
#[derive(Debug, thiserror::Error)]
#[error("host action failed: {0}")]
pub struct HostError(pub String);

/// Options forwarded to the host's engage primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngageOptions {
    /// Ally to assist rather than pulling fresh aggro.
    pub assist_ally: Option<AgentName>,
}

/// Host seam for combat primitives.
///
/// Implementations wrap the game client: closing range, equipping, and
/// skill rotation all happen behind `engage`. The return value reports
/// whether an attack actually went out this tick.
pub trait CombatHost {
    /// Attack the target (or assist the ally named in `options`).
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the underlying client call fails.
    fn engage(&mut self, target: &TargetId, options: &EngageOptions) -> Result<bool, HostError>;
}

/// What the engagement step decided this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngageDecision {
    /// The host attacked.
    Attacked,
    /// The host was called but declined to attack this tick.
    NotAttacked,
    /// Fresh dangerous estimate: warned the party instead of engaging.
    WarnedDanger,
    /// Target is inside an active danger window: left alone.
    Suppressed,
}

/// Outcome of one engagement step: the decision plus any broadcasts.
#[derive(Debug)]
pub struct EngagementReport {
    /// What happened.
    pub decision: EngageDecision,
    /// Danger broadcasts to send, when a fresh flag was raised.
    pub outgoing: Vec<(AgentName, Command)>,
}

/// Run the engagement decision for one target.
///
/// # Errors
///
/// Propagates [`HostError`] from the engage primitive; estimation and
/// suppression never fail.
pub fn consider_engage(
    coordinator: &mut Coordinator,
    host: &mut dyn CombatHost,
    now: DateTime<Utc>,
    roster: &Roster,
    self_stats: &CombatStats,
    target: &TargetObservation,
    options: &EngageOptions,
) -> Result<EngagementReport, HostError> {
    let config = coordinator.config();
    let outcome = estimate(self_stats, target);
    let dangerous = is_dangerous(
        &outcome,
        config.combat.min_hunt_hits_to_die,
        config.combat.race_slack_ms,
    );

    if dangerous {
        if coordinator.is_recently_dangerous(&target.id, now) {
            // Already flagged inside the window: no repeat broadcast.
            debug!(target = %target.id, "engagement suppressed, danger already flagged");
            return Ok(EngagementReport {
                decision: EngageDecision::Suppressed,
                outgoing: Vec::new(),
            });
        }
        warn!(
            target = %target.id,
            hits_to_die = ?outcome.hits_to_die,
            margin_ms = outcome.race_margin_ms(),
            "target too risky, warning party"
        );
        let outgoing = coordinator.note_danger(now, roster, target.id.clone(), outcome);
        return Ok(EngagementReport {
            decision: EngageDecision::WarnedDanger,
            outgoing,
        });
    }

    if coordinator.is_recently_dangerous(&target.id, now) {
        // A peer flagged it and the window is still open; our rosier
        // estimate does not override theirs.
        debug!(target = %target.id, "engagement suppressed by peer danger report");
        return Ok(EngagementReport {
            decision: EngageDecision::Suppressed,
            outgoing: Vec::new(),
        });
    }

    let attacked = host.engage(&target.id, options)?;
    Ok(EngagementReport {
        decision: if attacked {
            EngageDecision::Attacked
        } else {
            EngageDecision::NotAttacked
        },
        outgoing: Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::WarbandConfig;
    use warband_types::{AgentIdentity, ClassType, StatsSource, TargetStats};

    struct RecordingHost {
        engaged: Vec<TargetId>,
        attack_result: bool,
    }

    impl CombatHost for RecordingHost {
        fn engage(&mut self, target: &TargetId, _options: &EngageOptions) -> Result<bool, HostError> {
            self.engaged.push(target.clone());
            Ok(self.attack_result)
        }
    }

    fn roster() -> Roster {
        Roster::from_members(vec![
            AgentIdentity::new("Aelric", ClassType::Priest, 70),
            AgentIdentity::new("Cenwulf", ClassType::Warrior, 70),
        ])
    }

    fn target(hp: f64, attack: f64) -> TargetObservation {
        TargetObservation {
            id: TargetId::from("quarry"),
            definition: Some(TargetStats {
                id: TargetId::from("quarry"),
                hp,
                attack,
                armor: 0.0,
                attack_frequency: 1.0,
                source: StatsSource::Definition,
            }),
            live: None,
        }
    }

    fn stats() -> CombatStats {
        CombatStats {
            hp: 800.0,
            attack: 200.0,
            armor: 0.0,
            attack_frequency: 1.0,
        }
    }

    #[test]
    fn safe_target_is_engaged() {
        let mut coordinator =
            Coordinator::new(AgentName::from("Cenwulf"), WarbandConfig::default());
        let mut host = RecordingHost {
            engaged: Vec::new(),
            attack_result: true,
        };
        let report = consider_engage(
            &mut coordinator,
            &mut host,
            Utc::now(),
            &roster(),
            &stats(),
            &target(1_000.0, 50.0),
            &EngageOptions::default(),
        )
        .unwrap();

        assert_eq!(report.decision, EngageDecision::Attacked);
        assert!(report.outgoing.is_empty());
        assert_eq!(host.engaged.len(), 1);
    }

    #[test]
    fn dangerous_target_warns_once_then_suppresses() {
        let mut coordinator =
            Coordinator::new(AgentName::from("Cenwulf"), WarbandConfig::default());
        let mut host = RecordingHost {
            engaged: Vec::new(),
            attack_result: true,
        };
        let now = Utc::now();
        // One-hit kill territory: attack 900 vs. our 800 hp.
        let risky = target(5_000.0, 900.0);

        let report = consider_engage(
            &mut coordinator,
            &mut host,
            now,
            &roster(),
            &stats(),
            &risky,
            &EngageOptions::default(),
        )
        .unwrap();
        assert_eq!(report.decision, EngageDecision::WarnedDanger);
        assert_eq!(report.outgoing.len(), 1, "one warning per peer");
        assert!(host.engaged.is_empty());

        // Second attempt inside the window: suppressed, no second warning.
        let report = consider_engage(
            &mut coordinator,
            &mut host,
            now,
            &roster(),
            &stats(),
            &risky,
            &EngageOptions::default(),
        )
        .unwrap();
        assert_eq!(report.decision, EngageDecision::Suppressed);
        assert!(report.outgoing.is_empty());
        assert!(host.engaged.is_empty());
    }

    #[test]
    fn peer_danger_report_suppresses_our_engagement() {
        let mut coordinator =
            Coordinator::new(AgentName::from("Cenwulf"), WarbandConfig::default());
        let mut host = RecordingHost {
            engaged: Vec::new(),
            attack_result: true,
        };
        let now = Utc::now();
        let safe = target(1_000.0, 50.0);

        // A peer flagged the same target moments ago.
        coordinator.handle_command(
            now,
            Command::HuntDanger {
                target: TargetId::from("quarry"),
                estimate: estimate(&stats(), &target(5_000.0, 900.0)),
                from: AgentName::from("Aelric"),
            },
        );

        let report = consider_engage(
            &mut coordinator,
            &mut host,
            now,
            &roster(),
            &stats(),
            &safe,
            &EngageOptions::default(),
        )
        .unwrap();
        assert_eq!(report.decision, EngageDecision::Suppressed);
        assert!(host.engaged.is_empty());
    }
}
