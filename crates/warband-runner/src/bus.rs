//! NATS-backed point-to-point command bus between agents.
//!
//! Every agent subscribes to its own command subject,
//! `warband.agent.{name}.cmd`, and sends to peers by publishing on theirs.
//! The transport gives at-most-once, unordered delivery and nothing more;
//! all reliability lives in the coordinator's signature/ack protocol.
//!
//! Payloads that fail to decode (unknown `cmd` values, malformed JSON from
//! peers running other builds) are logged at debug and dropped at this
//! boundary. They are never an error.

use tracing::{debug, info};

use warband_types::{AgentName, Command};

use crate::error::RunnerError;

/// NATS client wrapper for agent-to-agent commands.
///
/// Manages a single NATS connection and provides typed send/receive over
/// the per-agent subject scheme.
pub struct CommandBus {
    client: async_nats::Client,
}

impl CommandBus {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str) -> Result<Self, RunnerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// The command subject owned by the named agent.
    fn subject_for(name: &AgentName) -> String {
        format!("warband.agent.{name}.cmd")
    }

    /// Subscribe to our own command subject.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the subscription fails.
    pub async fn subscribe(
        &self,
        self_name: &AgentName,
    ) -> Result<async_nats::Subscriber, RunnerError> {
        let subject = Self::subject_for(self_name);
        debug!(subject = subject, "subscribing to command subject");
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "command subject subscribed");
        Ok(subscriber)
    }

    /// Send one command to a named peer.
    ///
    /// At most once: a lost message is recovered by the coordinator's
    /// rebroadcast rules, not by the transport.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if serialization or publishing fails.
    pub async fn send(&self, to: &AgentName, command: &Command) -> Result<(), RunnerError> {
        let subject = Self::subject_for(to);
        let payload = serde_json::to_vec(command)?;
        debug!(
            subject = subject,
            cmd = command.cmd_name(),
            "sending command"
        );
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to publish to {subject}: {e}")))?;
        Ok(())
    }

    /// Decode an incoming payload, dropping anything unintelligible.
    ///
    /// Returns `None` (after a debug log) for unknown commands or
    /// malformed JSON; peers on other builds must not crash us.
    pub fn decode(payload: &[u8]) -> Option<Command> {
        match serde_json::from_slice(payload) {
            Ok(command) => Some(command),
            Err(e) => {
                debug!(error = %e, "dropping undecodable command payload");
                None
            }
        }
    }

}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus").field("connected", &true).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_per_agent() {
        assert_eq!(
            CommandBus::subject_for(&AgentName::from("Maudie")),
            "warband.agent.Maudie.cmd"
        );
    }

    #[test]
    fn decode_accepts_known_commands() {
        let ack = Command::RolesAck {
            sig: "sig-1".to_owned(),
            task_key: "default:-:-".to_owned(),
            from: AgentName::from("Maudie"),
        };
        let payload = serde_json::to_vec(&ack).unwrap();
        assert_eq!(CommandBus::decode(&payload), Some(ack));
    }

    #[test]
    fn decode_drops_unknown_commands() {
        assert_eq!(
            CommandBus::decode(br#"{"cmd":"farm:from_the_future","x":1}"#),
            None
        );
        assert_eq!(CommandBus::decode(b"not json at all"), None);
    }

    // Integration tests that require a live NATS server are marked #[ignore].
    #[tokio::test]
    #[ignore]
    async fn connect_to_nats() {
        let result = CommandBus::connect("nats://localhost:4222").await;
        assert!(result.is_ok());
    }
}
