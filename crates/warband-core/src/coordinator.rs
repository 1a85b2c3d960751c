//! The leader/follower coordination state machine.
//!
//! Every agent runs the same cycle: snapshot the roster, derive the leader
//! locally (election is pure computation, never a protocol), and then either
//! compute-and-broadcast an assignment (leader) or execute the one currently
//! held (follower). Execution is optimistic and eventually consistent: no
//! agent waits for a quorum, and a stale assignment is simply superseded by
//! the next broadcast that arrives.
//!
//! The broadcast protocol is built for a lossy, unordered, at-most-once
//! bus. The leader tracks acknowledgments per assignment *signature* and
//! rebroadcasts only to peers that have not acked the current signature,
//! only once the previous send has gone stale. Followers ack each distinct
//! signature exactly once, so a retransmitted broadcast never produces an
//! ack storm.
//!
//! All timing decisions take `now` as a parameter: the coordinator itself
//! never reads the clock, which keeps every protocol rule testable.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use warband_types::{
    AgentName, Assignment, Command, CombatOutcome, EventRef, MemberStatus, Point, TargetId,
    TargetObservation,
};

use crate::assign::{assign, AssignInput};
use crate::config::WarbandConfig;
use crate::roster::{choose_leader, Roster};
use crate::signature::signature_of;
use crate::wipe::WipeTracker;

/// How many already-acked signatures a follower remembers.
///
/// Signatures change only when the assignment changes, so a short memory
/// is enough to absorb retransmits of the last few broadcasts.
const ACKED_SIG_MEMORY: usize = 32;

// ---------------------------------------------------------------------------
// DangerRecord
// ---------------------------------------------------------------------------

/// A target's recent risky estimate.
///
/// Short-lived: records older than the danger window no longer suppress
/// engagement and are pruned at the start of each cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DangerRecord {
    /// The estimate that flagged the target.
    pub estimate: CombatOutcome,
    /// When the estimate was made or received.
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CoordinatorState
// ---------------------------------------------------------------------------

/// The mutable per-agent coordination state.
///
/// One instance per agent process, owned by the [`Coordinator`]; nothing
/// in here is global or shared.
#[derive(Debug, Default)]
struct CoordinatorState {
    /// The assignment currently being executed.
    assignment: Option<Assignment>,
    /// Signature of the last assignment we broadcast (leader side).
    last_broadcast_sig: Option<String>,
    /// When the last role broadcast went out (leader side).
    last_broadcast_at: Option<DateTime<Utc>>,
    /// Peers that acked the current signature (leader side).
    acked_peers: BTreeSet<AgentName>,
    /// Signatures we have already acked (follower side), oldest first.
    acked_sigs: VecDeque<String>,
    /// Recent danger records by target.
    danger: BTreeMap<TargetId, DangerRecord>,
    /// Last known member statuses.
    statuses: BTreeMap<AgentName, MemberStatus>,
    /// Death bookkeeping per task key.
    wipes: WipeTracker,
    /// End of the current fast-tick burst, when armed.
    fast_tick_until: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Cycle input / output
// ---------------------------------------------------------------------------

/// Host observations feeding one coordination cycle.
#[derive(Debug)]
pub struct CycleInput<'a> {
    /// Current wall-clock time.
    pub now: DateTime<Utc>,
    /// This cycle's roster snapshot.
    pub roster: &'a Roster,
    /// Members available for farming duty.
    pub available: &'a [AgentName],
    /// The current hunt target candidate.
    pub target: Option<&'a TargetObservation>,
    /// Gathering point for the hunt target, when known.
    pub hunt_rally: Option<&'a Point>,
    /// A joinable world event, when one is active.
    pub world_event: Option<&'a EventRef>,
    /// Our own condition this cycle, for the status protocol.
    pub self_status: Option<MemberStatus>,
}

/// What one coordination cycle produced.
#[derive(Debug)]
pub struct CycleOutput {
    /// Commands to send, one per addressed peer.
    pub outgoing: Vec<(AgentName, Command)>,
    /// The assignment to execute this tick (ours or the leader's).
    pub assignment: Option<Assignment>,
    /// Whether we were the leader this cycle.
    pub is_leader: bool,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// One agent's coordination engine.
///
/// Constructed once at process startup by the runtime and driven by the
/// tick loop; holds no I/O of its own. Outgoing commands are returned to
/// the caller, which owns the bus.
#[derive(Debug)]
pub struct Coordinator {
    self_name: AgentName,
    config: WarbandConfig,
    state: CoordinatorState,
}

impl Coordinator {
    /// Create a coordinator for the named agent.
    pub fn new(self_name: AgentName, config: WarbandConfig) -> Self {
        Self {
            self_name,
            config,
            state: CoordinatorState::default(),
        }
    }

    /// Our own agent name.
    pub const fn self_name(&self) -> &AgentName {
        &self.self_name
    }

    /// The configuration this coordinator runs under.
    pub const fn config(&self) -> &WarbandConfig {
        &self.config
    }

    /// The assignment currently held, if any.
    pub const fn assignment(&self) -> Option<&Assignment> {
        self.state.assignment.as_ref()
    }

    /// Run one coordination cycle.
    ///
    /// Leaders recompute the assignment and emit role broadcasts for
    /// unacked peers; followers emit a status report toward the leader.
    /// Both execute whatever assignment is currently held.
    pub fn run_cycle(&mut self, input: &CycleInput<'_>) -> CycleOutput {
        self.prune_danger(input.now);

        if let Some(status) = &input.self_status {
            self.state
                .statuses
                .insert(self.self_name.clone(), status.clone());
        }

        let leader = choose_leader(input.roster);
        let is_leader = leader.as_ref() == Some(&self.self_name);

        let outgoing = if is_leader {
            self.lead(input)
        } else {
            self.follow(input, leader.as_ref())
        };

        CycleOutput {
            outgoing,
            assignment: self.state.assignment.clone(),
            is_leader,
        }
    }

    /// Leader path: compute the assignment and broadcast it.
    fn lead(&mut self, input: &CycleInput<'_>) -> Vec<(AgentName, Command)> {
        let recent_danger: BTreeSet<TargetId> = self.state.danger.keys().cloned().collect();
        let assignment = assign(&AssignInput {
            roster: input.roster,
            available: input.available,
            target: input.target,
            hunt_rally: input.hunt_rally,
            world_event: input.world_event,
            recent_danger: &recent_danger,
            statuses: &self.state.statuses,
            wipes: &self.state.wipes,
            config: &self.config,
            now: input.now,
        });

        self.adopt(assignment.clone());
        let sig = signature_of(&assignment);

        let changed = self.state.last_broadcast_sig.as_deref() != Some(sig.as_str());
        if changed {
            info!(task_key = %assignment.task_key, "new assignment, broadcasting roles");
            self.state.acked_peers.clear();
            self.state.last_broadcast_sig = Some(sig.clone());
            self.state.last_broadcast_at = None;
        }

        let stale = self.state.last_broadcast_at.is_none_or(|at| {
            age_ms(input.now, at) > self.config.coordination.rebroadcast_stale_ms
        });
        if !stale {
            return Vec::new();
        }

        // Idempotent broadcast: peers that acked the current signature are
        // skipped, which bounds message volume under packet loss.
        let outgoing: Vec<(AgentName, Command)> = input
            .roster
            .names()
            .iter()
            .filter(|peer| **peer != self.self_name)
            .filter(|peer| !self.state.acked_peers.contains(peer))
            .map(|peer| {
                (
                    peer.clone(),
                    Command::Roles {
                        assignment: assignment.clone(),
                        sig: sig.clone(),
                        from: self.self_name.clone(),
                    },
                )
            })
            .collect();
        if !outgoing.is_empty() {
            self.state.last_broadcast_at = Some(input.now);
        }
        outgoing
    }

    /// Follower path: report our condition to the leader.
    fn follow(
        &mut self,
        input: &CycleInput<'_>,
        leader: Option<&AgentName>,
    ) -> Vec<(AgentName, Command)> {
        let Some(leader) = leader else {
            return Vec::new();
        };
        let Some(status) = &input.self_status else {
            return Vec::new();
        };
        vec![(
            leader.clone(),
            Command::Status {
                status: status.clone(),
                from: self.self_name.clone(),
            },
        )]
    }

    /// Handle one incoming command, returning any replies to send.
    ///
    /// Exhaustive over the command set. Stale and duplicate state is
    /// dropped here by signature comparison; nothing in this path is an
    /// error. Any coordination message arms the fast-tick burst.
    pub fn handle_command(&mut self, now: DateTime<Utc>, command: Command) -> Vec<(AgentName, Command)> {
        self.arm_fast_tick(now);

        match command {
            Command::Roles {
                assignment,
                sig,
                from,
            } => {
                debug!(from = %from, task_key = %assignment.task_key, "roles received");
                let task_key = assignment.task_key.clone();
                self.adopt(assignment);

                if self.state.acked_sigs.contains(&sig) {
                    // Retransmit of a signature we already acked: adopt is
                    // idempotent, but a second ack would feed an ack storm.
                    return Vec::new();
                }
                self.remember_acked(sig.clone());
                vec![(
                    from,
                    Command::RolesAck {
                        sig,
                        task_key,
                        from: self.self_name.clone(),
                    },
                )]
            }

            Command::RolesAck { sig, from, .. } => {
                if self.state.last_broadcast_sig.as_deref() == Some(sig.as_str()) {
                    self.state.acked_peers.insert(from);
                } else {
                    debug!(from = %from, "stale ack dropped");
                }
                Vec::new()
            }

            Command::HuntDanger {
                target,
                estimate,
                from,
            } => {
                debug!(from = %from, target = %target, "danger report received");
                self.state.danger.insert(
                    target,
                    DangerRecord {
                        estimate,
                        observed_at: now,
                    },
                );
                Vec::new()
            }

            Command::Status { status, from } => {
                self.state.statuses.insert(from, status);
                Vec::new()
            }

            Command::Death {
                task_key,
                participants,
                from,
            } => {
                self.state.wipes.record_death(&task_key, &participants, &from);
                Vec::new()
            }
        }
    }

    /// We died. Record it, arm the fast tick, and produce the death
    /// broadcast for every party member.
    pub fn note_local_death(
        &mut self,
        now: DateTime<Utc>,
        roster: &Roster,
    ) -> Vec<(AgentName, Command)> {
        self.arm_fast_tick(now);

        let (task_key, participants) = match &self.state.assignment {
            Some(assignment) => (
                assignment.task_key.clone(),
                assignment.participants().into_iter().collect::<Vec<_>>(),
            ),
            None => (
                Assignment::task_key_for(warband_types::AssignmentMode::Default, None, None),
                vec![self.self_name.clone()],
            ),
        };

        self.state
            .wipes
            .record_death(&task_key, &participants, &self.self_name);
        info!(%task_key, "local death recorded, notifying party");

        roster
            .names()
            .iter()
            .filter(|peer| **peer != self.self_name)
            .map(|peer| {
                (
                    peer.clone(),
                    Command::Death {
                        task_key: task_key.clone(),
                        participants: participants.clone(),
                        from: self.self_name.clone(),
                    },
                )
            })
            .collect()
    }

    /// A local estimate flagged this target. Record it and produce the
    /// danger broadcast for every party member.
    pub fn note_danger(
        &mut self,
        now: DateTime<Utc>,
        roster: &Roster,
        target: TargetId,
        estimate: CombatOutcome,
    ) -> Vec<(AgentName, Command)> {
        self.arm_fast_tick(now);
        self.state.danger.insert(
            target.clone(),
            DangerRecord {
                estimate: estimate.clone(),
                observed_at: now,
            },
        );

        roster
            .names()
            .iter()
            .filter(|peer| **peer != self.self_name)
            .map(|peer| {
                (
                    peer.clone(),
                    Command::HuntDanger {
                        target: target.clone(),
                        estimate: estimate.clone(),
                        from: self.self_name.clone(),
                    },
                )
            })
            .collect()
    }

    /// Whether this target was flagged dangerous inside the danger window.
    pub fn is_recently_dangerous(&self, target: &TargetId, now: DateTime<Utc>) -> bool {
        self.state.danger.get(target).is_some_and(|record| {
            age_ms(now, record.observed_at) <= self.config.coordination.danger_window_ms
        })
    }

    /// The loop interval to use right now: the fast burst interval while
    /// armed, the base interval otherwise.
    pub fn next_interval_ms(&self, now: DateTime<Utc>) -> u64 {
        let fast = self
            .state
            .fast_tick_until
            .is_some_and(|until| now < until);
        if fast {
            self.config.coordination.fast_tick_interval_ms
        } else {
            self.config.coordination.tick_interval_ms
        }
    }

    /// Adopt an assignment as current, resetting wipe state when the task
    /// itself changed.
    fn adopt(&mut self, assignment: Assignment) {
        let task_changed = self
            .state
            .assignment
            .as_ref()
            .is_none_or(|held| held.task_key != assignment.task_key);
        if task_changed {
            self.state.wipes.retain(&assignment.task_key);
        }
        self.state.assignment = Some(assignment);
    }

    /// Remember a follower-side acked signature, bounded.
    fn remember_acked(&mut self, sig: String) {
        self.state.acked_sigs.push_back(sig);
        while self.state.acked_sigs.len() > ACKED_SIG_MEMORY {
            self.state.acked_sigs.pop_front();
        }
    }

    /// Arm (or extend) the fast-tick burst window.
    fn arm_fast_tick(&mut self, now: DateTime<Utc>) {
        let window = TimeDelta::milliseconds(
            i64::try_from(self.config.coordination.fast_tick_window_ms).unwrap_or(i64::MAX),
        );
        self.state.fast_tick_until = Some(now + window);
    }

    /// Drop danger records older than the danger window.
    fn prune_danger(&mut self, now: DateTime<Utc>) {
        let window = self.config.coordination.danger_window_ms;
        self.state
            .danger
            .retain(|_, record| age_ms(now, record.observed_at) <= window);
    }
}

/// Milliseconds from `then` to `now`, zero when `then` is in the future.
fn age_ms(now: DateTime<Utc>, then: DateTime<Utc>) -> u64 {
    now.signed_duration_since(then)
        .num_milliseconds()
        .try_into()
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use warband_types::{AgentIdentity, AssignmentMode, ClassType, StatsSource, TargetStats};

    fn ident(name: &str, class: ClassType) -> AgentIdentity {
        AgentIdentity::new(name, class, 70)
    }

    fn roster() -> Roster {
        Roster::from_members(vec![
            ident("Aelric", ClassType::Priest),
            ident("Cenwulf", ClassType::Warrior),
            ident("Erland", ClassType::Ranger),
        ])
    }

    fn observation() -> TargetObservation {
        TargetObservation {
            id: TargetId::from("quarry"),
            definition: Some(TargetStats {
                id: TargetId::from("quarry"),
                hp: 3_000.0,
                attack: 100.0,
                armor: 0.0,
                attack_frequency: 1.0,
                source: StatsSource::Definition,
            }),
            live: None,
        }
    }

    fn coordinator(name: &str) -> Coordinator {
        Coordinator::new(AgentName::from(name), WarbandConfig::default())
    }

    fn cycle<'a>(
        now: DateTime<Utc>,
        roster: &'a Roster,
        available: &'a [AgentName],
        target: Option<&'a TargetObservation>,
    ) -> CycleInput<'a> {
        CycleInput {
            now,
            roster,
            available,
            target,
            hunt_rally: None,
            world_event: None,
            self_status: None,
        }
    }

    #[test]
    fn leader_broadcasts_to_all_peers_once() {
        let roster = roster();
        let available: Vec<AgentName> = roster.names().to_vec();
        let target = observation();
        let mut leader = coordinator("Aelric");
        let now = Utc::now();

        let output = leader.run_cycle(&cycle(now, &roster, &available, Some(&target)));
        assert!(output.is_leader);
        assert_eq!(output.outgoing.len(), 2, "one roles message per peer");

        // Same cycle again immediately: signature unchanged, send not yet
        // stale, nothing goes out.
        let output = leader.run_cycle(&cycle(now, &roster, &available, Some(&target)));
        assert!(output.outgoing.is_empty());
    }

    #[test]
    fn leader_rebroadcasts_only_to_unacked_peers_when_stale() {
        let roster = roster();
        let available: Vec<AgentName> = roster.names().to_vec();
        let target = observation();
        let mut leader = coordinator("Aelric");
        let now = Utc::now();

        let output = leader.run_cycle(&cycle(now, &roster, &available, Some(&target)));
        let sig = match &output.outgoing.first().unwrap().1 {
            Command::Roles { sig, .. } => sig.clone(),
            other => panic!("expected roles, got {other:?}"),
        };

        // Cenwulf acks; Erland's ack is lost.
        leader.handle_command(
            now,
            Command::RolesAck {
                sig,
                task_key: "ignored".to_owned(),
                from: AgentName::from("Cenwulf"),
            },
        );

        let later = now + TimeDelta::milliseconds(4_000);
        let output = leader.run_cycle(&cycle(later, &roster, &available, Some(&target)));
        let recipients: Vec<&str> = output
            .outgoing
            .iter()
            .map(|(peer, _)| peer.as_str())
            .collect();
        assert_eq!(recipients, vec!["Erland"], "acked peer is skipped");
    }

    #[test]
    fn follower_acks_each_signature_exactly_once() {
        let mut follower = coordinator("Cenwulf");
        let now = Utc::now();
        let mut assignment = Assignment::empty(AssignmentMode::Default);
        assignment.monsterhunt = vec![AgentName::from("Cenwulf")];
        let roles = Command::Roles {
            assignment,
            sig: "sig-1".to_owned(),
            from: AgentName::from("Aelric"),
        };

        let replies = follower.handle_command(now, roles.clone());
        assert_eq!(replies.len(), 1);
        assert!(matches!(
            &replies.first().unwrap().1,
            Command::RolesAck { sig, .. } if sig == "sig-1"
        ));

        // Redelivery of the same signature: adopted again, not re-acked.
        let replies = follower.handle_command(now, roles);
        assert!(replies.is_empty());
        assert!(follower.assignment().is_some());
    }

    #[test]
    fn stale_ack_is_dropped() {
        let roster = roster();
        let available: Vec<AgentName> = roster.names().to_vec();
        let target = observation();
        let mut leader = coordinator("Aelric");
        let now = Utc::now();

        leader.run_cycle(&cycle(now, &roster, &available, Some(&target)));
        leader.handle_command(
            now,
            Command::RolesAck {
                sig: "sig-from-last-week".to_owned(),
                task_key: "ignored".to_owned(),
                from: AgentName::from("Cenwulf"),
            },
        );

        // The stale ack must not have marked Cenwulf as acked: once the
        // broadcast goes stale, he is still a recipient.
        let later = now + TimeDelta::milliseconds(4_000);
        let output = leader.run_cycle(&cycle(later, &roster, &available, Some(&target)));
        assert!(output
            .outgoing
            .iter()
            .any(|(peer, _)| peer.as_str() == "Cenwulf"));
    }

    #[test]
    fn peer_deaths_arriving_out_of_order_count_one_wipe() {
        let mut agent = coordinator("Aelric");
        let now = Utc::now();
        let squad = vec![
            AgentName::from("Aelric"),
            AgentName::from("Cenwulf"),
            AgentName::from("Erland"),
        ];

        for name in ["Erland", "Cenwulf", "Aelric"] {
            agent.handle_command(
                now,
                Command::Death {
                    task_key: "hunt:x".to_owned(),
                    participants: squad.clone(),
                    from: AgentName::from(name),
                },
            );
        }
        assert_eq!(agent.state.wipes.wipes("hunt:x"), 1);
    }

    #[test]
    fn local_death_broadcasts_to_party() {
        let roster = roster();
        let mut agent = coordinator("Erland");
        let now = Utc::now();

        let outgoing = agent.note_local_death(now, &roster);
        assert_eq!(outgoing.len(), 2);
        assert!(outgoing
            .iter()
            .all(|(_, cmd)| matches!(cmd, Command::Death { .. })));
    }

    #[test]
    fn danger_reports_expire_after_the_window() {
        let roster = roster();
        let mut agent = coordinator("Aelric");
        let now = Utc::now();
        let estimate = CombatOutcome {
            hits_to_kill: 50,
            hits_to_die: Some(2),
            time_to_kill_ms: 50_000.0,
            time_to_die_ms: 2_000.0,
            damage_to_target: 10.0,
            damage_to_self: 400.0,
        };

        agent.note_danger(now, &roster, TargetId::from("quarry"), estimate);
        assert!(agent.is_recently_dangerous(&TargetId::from("quarry"), now));

        let later = now + TimeDelta::milliseconds(31_000);
        assert!(!agent.is_recently_dangerous(&TargetId::from("quarry"), later));
    }

    #[test]
    fn coordination_messages_arm_the_fast_tick() {
        let mut agent = coordinator("Cenwulf");
        let now = Utc::now();
        let base = agent.next_interval_ms(now);
        assert_eq!(base, 1_000);

        agent.handle_command(
            now,
            Command::Status {
                status: MemberStatus {
                    hp: 500.0,
                    max_hp: 500.0,
                    feared: false,
                    taking_too_much_damage: false,
                    reported_at: now,
                },
                from: AgentName::from("Aelric"),
            },
        );
        assert_eq!(agent.next_interval_ms(now), 250);

        // The burst window has a bounded life.
        let later = now + TimeDelta::milliseconds(2_500);
        assert_eq!(agent.next_interval_ms(later), 1_000);
    }
}
