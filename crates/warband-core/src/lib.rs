//! Farming coordination and risk-aware combat engagement for the Warband
//! agent fleet.
//!
//! Each agent process runs one [`Coordinator`] inside a timer-driven tick
//! loop. Per cycle: snapshot the roster, derive the leader locally, compute
//! or adopt the assignment, and execute it. All cross-agent state moves
//! over a lossy point-to-point command bus; every protocol here is
//! idempotent under duplication and makes progress under loss.
//!
//! # Modules
//!
//! - [`config`] -- Typed configuration loaded from `warband-config.yaml`.
//! - [`roster`] -- Roster snapshots and deterministic leader election.
//! - [`estimator`] -- Time-to-kill vs. time-to-die racing and the danger
//!   verdict.
//! - [`assign`] -- Partitioning the roster into task groups under the
//!   active-farmer cap.
//! - [`signature`] -- Canonical assignment signatures for broadcast dedup.
//! - [`wipe`] -- Full-squad wipe detection over unordered death reports.
//! - [`coordinator`] -- The leader/follower state machine.
//! - [`engagement`] -- The per-tick engage/pause/warn decision.
//! - [`arbiter`] -- Movement arbitration (priority queue of one).
//!
//! [`Coordinator`]: coordinator::Coordinator

pub mod arbiter;
pub mod assign;
pub mod config;
pub mod coordinator;
pub mod engagement;
pub mod estimator;
pub mod roster;
pub mod signature;
pub mod wipe;

pub use arbiter::MoveArbiter;
pub use assign::{assign, classify_target, AssignInput, TargetClass};
pub use config::{ConfigError, WarbandConfig};
pub use coordinator::{Coordinator, CycleInput, CycleOutput, DangerRecord};
pub use engagement::{
    consider_engage, CombatHost, EngageDecision, EngageOptions, EngagementReport, HostError,
};
pub use estimator::{estimate, is_dangerous};
pub use roster::{choose_leader, Roster, RosterSource};
pub use signature::signature_of;
pub use wipe::WipeTracker;
