//! Error types for the agent runner.
//!
//! Uses `thiserror` for typed errors surfacing through the runner
//! pipeline: NATS connectivity, command decoding, configuration. Nothing
//! here is allowed to take the agent down once the loop is running; tick
//! failures are logged and absorbed at the tick boundary.

/// Errors that can occur during agent runner operation.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// Configuration is invalid or missing.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: warband_core::ConfigError,
    },

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
