//! Agent process entry point for the Warband fleet.
//!
//! One process per character. The runner connects to NATS, builds the
//! coordination runtime around the host binding, and ticks until stopped.
//!
//! # Architecture
//!
//! ```text
//! NATS (commands) --> Coordinator --> Assignment --> Engagement/Movement
//!        ^                                                  |
//!        +---------------- roles / acks / danger -----------+
//! ```
//!
//! Usage: `warband-runner <character-name> [config-path]`. Without a
//! config file every setting falls back to its default. This build wires
//! in the simulated host; a live deployment swaps in a game-client
//! implementation of the same bindings.

mod bus;
mod error;
mod host;
mod runtime;

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use warband_core::config::WarbandConfig;
use warband_types::{StatsSource, TargetId, TargetObservation, TargetStats};

use crate::bus::CommandBus;
use crate::host::demo_fleet;
use crate::runtime::AgentRuntime;

/// Default config file looked up next to the working directory.
const DEFAULT_CONFIG_PATH: &str = "warband-config.yaml";

/// Application entry point.
///
/// Initializes logging, loads configuration, connects to NATS, then runs
/// the agent loop until ctrl-c.
///
/// # Errors
///
/// Returns an error if initialization fails; loop-time failures are
/// absorbed by the runtime.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "Cenwulf".to_owned());
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());

    let config = if Path::new(&config_path).exists() {
        WarbandConfig::from_file(Path::new(&config_path)).map_err(error::RunnerError::from)?
    } else {
        WarbandConfig::default()
    };

    // Structured logging; RUST_LOG overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(agent = name, config = config_path, "warband-runner starting");
    if !Path::new(&config_path).exists() {
        warn!(config = config_path, "config file not found, using defaults");
    }

    let bus = CommandBus::connect(&config.infrastructure.nats_url).await?;
    let mut host = demo_fleet(&name);
    // The scripted fleet farms a harmless swamp spawn so the protocol has
    // something to coordinate around.
    host.set_target(TargetObservation {
        id: TargetId::from("marsh_crawler"),
        definition: Some(TargetStats {
            id: TargetId::from("marsh_crawler"),
            hp: 2_400.0,
            attack: 90.0,
            armor: 10.0,
            attack_frequency: 0.8,
            source: StatsSource::Definition,
        }),
        live: None,
    });
    let (runtime, stop) = AgentRuntime::new(bus, config, host);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    runtime.run().await?;
    Ok(())
}
