//! Shared type definitions for the Warband agent fleet.
//!
//! This crate is the single source of truth for the types exchanged between
//! the coordination core and the agent runtime, and for the wire commands
//! exchanged between agents over the bus.
//!
//! # Modules
//!
//! - [`agent`] -- Agent names, classes, and per-cycle identity metadata
//! - [`combat`] -- Combat statistics, target observations, outcome estimates
//! - [`assignment`] -- The leader's task directive and member status reports
//! - [`command`] -- The closed tagged union of wire commands

pub mod agent;
pub mod assignment;
pub mod combat;
pub mod command;

// Re-export all public types at crate root for convenience.
pub use agent::{AgentIdentity, AgentName, ClassType};
pub use assignment::{
    Assignment, AssignmentMode, EventRef, MemberStatus, Point, RegroupDirective,
    MAX_ACTIVE_FARMERS,
};
pub use combat::{CombatOutcome, CombatStats, StatsSource, TargetId, TargetObservation, TargetStats};
pub use command::Command;
