//! Configuration loading and typed config structures for the fleet.
//!
//! The canonical configuration lives in `warband-config.yaml` next to the
//! binary. This module defines strongly-typed structs mirroring the YAML
//! structure and a loader that reads and validates the file.
//!
//! Two windows deserve a note: the 30s danger window and the 2.2s fast-tick
//! burst are independently tuned values with no derivation linking them.
//! They stay as plain named settings.

use std::path::Path;

use serde::Deserialize;

use warband_types::{AgentName, Point};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level fleet configuration.
///
/// Mirrors the structure of `warband-config.yaml`. All fields have defaults,
/// so an empty file (or no file) yields a usable configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WarbandConfig {
    /// Target classification and engagement-safety thresholds.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Coordination loop timing and protocol windows.
    #[serde(default)]
    pub coordination: CoordinationConfig,

    /// Movement arbitration settings.
    #[serde(default)]
    pub movement: MovementConfig,

    /// Roster and role-preference settings.
    #[serde(default)]
    pub roster: RosterConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WarbandConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `NATS_URL` in the environment overrides `infrastructure.nats_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Target classification and engagement-safety thresholds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CombatConfig {
    /// Max hp for a target to count as weak (burst-eligible).
    #[serde(default = "default_weak_max_hp")]
    pub weak_max_hp: f64,

    /// Max attack for a target to count as weak.
    #[serde(default = "default_weak_max_attack")]
    pub weak_max_attack: f64,

    /// Attack at or above which a target counts as high-attack.
    #[serde(default = "default_high_attack")]
    pub high_attack: f64,

    /// Hp at or above which a target counts as high-hp.
    #[serde(default = "default_high_hp")]
    pub high_hp: f64,

    /// Hp at or above which a low-attack target is an attrition fight.
    #[serde(default = "default_long_fight_hp")]
    pub long_fight_hp: f64,

    /// Attack at or below which a target counts as low-attack.
    #[serde(default = "default_low_attack")]
    pub low_attack: f64,

    /// Minimum survivable hits before a fight is considered safe.
    #[serde(default = "default_min_hunt_hits_to_die")]
    pub min_hunt_hits_to_die: u32,

    /// Hp ratio below which a squad member counts as in danger.
    #[serde(default = "default_assist_danger_hp_ratio")]
    pub assist_danger_hp_ratio: f64,

    /// Extra race slack: a kill-vs-die margin worse than minus this many
    /// milliseconds is dangerous regardless of hit buffer.
    #[serde(default = "default_race_slack_ms")]
    pub race_slack_ms: f64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            weak_max_hp: default_weak_max_hp(),
            weak_max_attack: default_weak_max_attack(),
            high_attack: default_high_attack(),
            high_hp: default_high_hp(),
            long_fight_hp: default_long_fight_hp(),
            low_attack: default_low_attack(),
            min_hunt_hits_to_die: default_min_hunt_hits_to_die(),
            assist_danger_hp_ratio: default_assist_danger_hp_ratio(),
            race_slack_ms: default_race_slack_ms(),
        }
    }
}

/// Coordination loop timing and protocol windows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CoordinationConfig {
    /// Base coordination cycle interval.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Cycle interval while the fast-tick burst window is armed.
    #[serde(default = "default_fast_tick_interval_ms")]
    pub fast_tick_interval_ms: u64,

    /// How long the fast-tick burst stays armed after a coordination
    /// message or a local death.
    #[serde(default = "default_fast_tick_window_ms")]
    pub fast_tick_window_ms: u64,

    /// Rebroadcast roles to an unacked peer once the last send is older
    /// than this.
    #[serde(default = "default_rebroadcast_stale_ms")]
    pub rebroadcast_stale_ms: u64,

    /// How long a danger report suppresses re-engagement of its target.
    #[serde(default = "default_danger_window_ms")]
    pub danger_window_ms: u64,

    /// How long a member status report stays actionable.
    #[serde(default = "default_status_fresh_ms")]
    pub status_fresh_ms: u64,

    /// Full-squad wipes on one task before the regroup circuit breaker.
    #[serde(default = "default_party_wipes_before_abort")]
    pub party_wipes_before_abort: u32,

    /// Upper bound on any single wait for a peer round-trip.
    #[serde(default = "default_pending_timeout_ms")]
    pub pending_timeout_ms: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            fast_tick_interval_ms: default_fast_tick_interval_ms(),
            fast_tick_window_ms: default_fast_tick_window_ms(),
            rebroadcast_stale_ms: default_rebroadcast_stale_ms(),
            danger_window_ms: default_danger_window_ms(),
            status_fresh_ms: default_status_fresh_ms(),
            party_wipes_before_abort: default_party_wipes_before_abort(),
            pending_timeout_ms: default_pending_timeout_ms(),
        }
    }
}

/// Movement arbitration settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovementConfig {
    /// Radius around the rally point that counts as arrived.
    #[serde(default = "default_hunt_group_arrival_radius")]
    pub hunt_group_arrival_radius: f64,

    /// Minimum gap between repeat move requests to the same destination key.
    #[serde(default = "default_request_cooldown_ms")]
    pub request_cooldown_ms: u64,

    /// Fallback rally point for regroup orders.
    #[serde(default = "default_regroup_rally")]
    pub regroup_rally: Point,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            hunt_group_arrival_radius: default_hunt_group_arrival_radius(),
            request_cooldown_ms: default_request_cooldown_ms(),
            regroup_rally: default_regroup_rally(),
        }
    }
}

/// Roster and role-preference settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RosterConfig {
    /// Named ranger preferred for solo crab duty when online.
    #[serde(default)]
    pub preferred_crab_ranger: Option<AgentName>,
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// NATS messaging URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,
}

impl InfrastructureConfig {
    /// Override infrastructure URLs with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("NATS_URL") {
            self.nats_url = val;
        }
    }
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_weak_max_hp() -> f64 {
    600.0
}

const fn default_weak_max_attack() -> f64 {
    60.0
}

const fn default_high_attack() -> f64 {
    1_000.0
}

const fn default_high_hp() -> f64 {
    25_000.0
}

const fn default_long_fight_hp() -> f64 {
    12_000.0
}

const fn default_low_attack() -> f64 {
    250.0
}

const fn default_min_hunt_hits_to_die() -> u32 {
    3
}

const fn default_assist_danger_hp_ratio() -> f64 {
    0.35
}

const fn default_race_slack_ms() -> f64 {
    1_200.0
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_fast_tick_interval_ms() -> u64 {
    250
}

const fn default_fast_tick_window_ms() -> u64 {
    2_200
}

const fn default_rebroadcast_stale_ms() -> u64 {
    3_000
}

const fn default_danger_window_ms() -> u64 {
    30_000
}

const fn default_status_fresh_ms() -> u64 {
    6_000
}

const fn default_party_wipes_before_abort() -> u32 {
    2
}

const fn default_pending_timeout_ms() -> u64 {
    1_200
}

const fn default_hunt_group_arrival_radius() -> f64 {
    120.0
}

const fn default_request_cooldown_ms() -> u64 {
    800
}

fn default_regroup_rally() -> Point {
    Point::new(0.0, 0.0, "main")
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = WarbandConfig::default();
        assert_eq!(config.combat.min_hunt_hits_to_die, 3);
        assert_eq!(config.coordination.party_wipes_before_abort, 2);
        assert_eq!(config.coordination.danger_window_ms, 30_000);
        assert_eq!(config.coordination.fast_tick_window_ms, 2_200);
        assert!(config.roster.preferred_crab_ranger.is_none());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
combat:
  weak_max_hp: 400
  high_attack: 900
  min_hunt_hits_to_die: 4

coordination:
  tick_interval_ms: 500
  party_wipes_before_abort: 3

movement:
  hunt_group_arrival_radius: 80
  regroup_rally:
    x: 100
    y: -50
    map: "town"

roster:
  preferred_crab_ranger: "Fletch"

infrastructure:
  nats_url: "nats://testhost:4222"

logging:
  level: "debug"
"#;
        let config = WarbandConfig::parse(yaml).unwrap();
        assert_eq!(config.combat.weak_max_hp, 400.0);
        assert_eq!(config.combat.min_hunt_hits_to_die, 4);
        assert_eq!(config.coordination.tick_interval_ms, 500);
        assert_eq!(config.coordination.party_wipes_before_abort, 3);
        assert_eq!(config.movement.regroup_rally.map, "town");
        assert_eq!(
            config.roster.preferred_crab_ranger,
            Some(AgentName::from("Fletch"))
        );
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults.
        assert_eq!(config.coordination.danger_window_ms, 30_000);
    }

    #[test]
    fn parse_empty_yaml() {
        // serde_yml maps an empty document to all-default sections.
        let config = WarbandConfig::parse("{}");
        assert!(config.is_ok());
    }
}
