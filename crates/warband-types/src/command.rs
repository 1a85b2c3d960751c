//! The closed set of commands exchanged between agents.
//!
//! Every cross-agent message is one [`Command`], decoded at the bus boundary
//! and matched exhaustively in the coordinator. The wire format is a JSON
//! object with a `cmd` discriminator; payloads from peers running unknown
//! commands fail to decode and are dropped at the boundary (never an error).
//!
//! Delivery is point-to-point, unordered, at most once. Every protocol
//! built on these commands is idempotent under duplication (signature and
//! task-key dedup) and makes progress under loss (periodic rebroadcast of
//! unacknowledged state).

use serde::{Deserialize, Serialize};

use crate::agent::AgentName;
use crate::assignment::{Assignment, MemberStatus};
use crate::combat::{CombatOutcome, TargetId};

/// A typed command addressed to one named peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    /// Leader's role broadcast: the assignment plus its dedup signature.
    #[serde(rename = "farm:roles")]
    Roles {
        /// The assignment to adopt.
        assignment: Assignment,
        /// Canonical signature of the assignment's role-relevant fields.
        sig: String,
        /// The sending leader.
        from: AgentName,
    },

    /// Follower's acknowledgment of a role broadcast.
    #[serde(rename = "farm:roles_ack")]
    RolesAck {
        /// The signature being acknowledged.
        sig: String,
        /// Task key of the acknowledged assignment.
        task_key: String,
        /// The acknowledging follower.
        from: AgentName,
    },

    /// A target was estimated too risky to engage.
    #[serde(rename = "farm:hunt_danger")]
    HuntDanger {
        /// The risky target.
        target: TargetId,
        /// The estimate that triggered the flag.
        estimate: CombatOutcome,
        /// Who produced the estimate.
        from: AgentName,
    },

    /// Periodic self-report of a member's condition.
    #[serde(rename = "farm:status")]
    Status {
        /// The member's condition.
        status: MemberStatus,
        /// The reporting member.
        from: AgentName,
    },

    /// A member died while working the given task.
    #[serde(rename = "farm:death")]
    Death {
        /// Task key the death counts against.
        task_key: String,
        /// The full participant set of that task, as the sender knew it.
        participants: Vec<AgentName>,
        /// The member who died.
        from: AgentName,
    },
}

impl Command {
    /// The sender of this command.
    pub const fn from(&self) -> &AgentName {
        match self {
            Self::Roles { from, .. }
            | Self::RolesAck { from, .. }
            | Self::HuntDanger { from, .. }
            | Self::Status { from, .. }
            | Self::Death { from, .. } => from,
        }
    }

    /// The wire discriminator, for log fields.
    pub const fn cmd_name(&self) -> &'static str {
        match self {
            Self::Roles { .. } => "farm:roles",
            Self::RolesAck { .. } => "farm:roles_ack",
            Self::HuntDanger { .. } => "farm:hunt_danger",
            Self::Status { .. } => "farm:status",
            Self::Death { .. } => "farm:death",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentMode;

    #[test]
    fn ack_round_trips_with_cmd_tag() {
        let ack = Command::RolesAck {
            sig: "abc".to_owned(),
            task_key: "default:-:-".to_owned(),
            from: AgentName::from("Maudie"),
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json.get("cmd").and_then(|v| v.as_str()), Some("farm:roles_ack"));

        let back: Command = serde_json::from_value(json).unwrap();
        assert_eq!(back, ack);
    }

    #[test]
    fn unknown_cmd_fails_decode() {
        let raw = r#"{"cmd":"farm:unknown_thing","payload":1}"#;
        let decoded: Result<Command, _> = serde_json::from_str(raw);
        assert!(decoded.is_err());
    }

    #[test]
    fn roles_carries_assignment() {
        let roles = Command::Roles {
            assignment: Assignment::empty(AssignmentMode::Default),
            sig: "sig-1".to_owned(),
            from: AgentName::from("Aelric"),
        };
        assert_eq!(roles.cmd_name(), "farm:roles");
        assert_eq!(roles.from().as_str(), "Aelric");
    }
}
