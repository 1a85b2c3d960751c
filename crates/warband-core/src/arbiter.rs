//! Movement arbitration: a priority queue of one.
//!
//! The character's path is the only locally contended resource: combat
//! engagement, rally travel, and task travel all want to move the body.
//! The arbiter holds at most one in-flight request. A new request wins
//! only by strictly higher priority; repeat requests to the same
//! destination key are throttled by a per-key cooldown instead of being
//! reissued every tick.
//!
//! The arbiter never performs movement itself. The caller issues the
//! actual travel through the host binding when a request is accepted and
//! reports back with [`complete`] (or [`cancel`]).
//!
//! [`complete`]: MoveArbiter::complete
//! [`cancel`]: MoveArbiter::cancel

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::trace;

use warband_types::Point;

/// Ceiling on remembered per-key cooldowns before expired ones are pruned.
const COOLDOWN_PRUNE_LEN: usize = 64;

/// The movement request currently holding the body.
#[derive(Debug, Clone)]
struct ActiveMove {
    /// Destination key (dedup/cooldown identity, e.g. a task key).
    key: String,
    /// Priority it was accepted at.
    priority: u8,
    /// Where it is going.
    dest: Point,
}

/// Priority-queue-of-one over movement requests.
#[derive(Debug, Default)]
pub struct MoveArbiter {
    active: Option<ActiveMove>,
    /// Last acceptance time and cooldown per destination key.
    cooldowns: BTreeMap<String, (Instant, u64)>,
}

impl MoveArbiter {
    /// Create an idle arbiter.
    pub const fn new() -> Self {
        Self {
            active: None,
            cooldowns: BTreeMap::new(),
        }
    }

    /// Ask for the body.
    ///
    /// Returns `true` when the request was accepted (the caller should now
    /// issue the travel). Rejected when an in-flight request has equal or
    /// higher priority, or when the same destination key was accepted
    /// within its cooldown window.
    pub fn request(
        &mut self,
        dest: Point,
        key: &str,
        priority: u8,
        cooldown_ms: u64,
        now: Instant,
    ) -> bool {
        if let Some(active) = &self.active {
            if priority <= active.priority {
                trace!(key, priority, active = active.key, "move request outranked");
                return false;
            }
        }

        if let Some((accepted_at, cooldown)) = self.cooldowns.get(key) {
            let elapsed_ms = now.duration_since(*accepted_at).as_millis();
            if elapsed_ms < u128::from(*cooldown) {
                trace!(key, "move request throttled");
                return false;
            }
        }

        self.prune_cooldowns(now);
        self.cooldowns.insert(key.to_owned(), (now, cooldown_ms));
        self.active = Some(ActiveMove {
            key: key.to_owned(),
            priority,
            dest,
        });
        true
    }

    /// Whether a movement request is in flight.
    pub const fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Destination key of the in-flight request, if any.
    pub fn active_key(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.key.as_str())
    }

    /// Destination of the in-flight request, if any.
    pub fn active_dest(&self) -> Option<&Point> {
        self.active.as_ref().map(|a| &a.dest)
    }

    /// The in-flight request arrived.
    pub fn complete(&mut self) {
        self.active = None;
    }

    /// Abandon the in-flight request without arriving.
    ///
    /// The cooldown entry stays: an abandoned destination should not be
    /// hammered again on the very next tick.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Drop expired cooldown entries once the map grows past the ceiling.
    fn prune_cooldowns(&mut self, now: Instant) {
        if self.cooldowns.len() < COOLDOWN_PRUNE_LEN {
            return;
        }
        self.cooldowns.retain(|_, (accepted_at, cooldown)| {
            now.duration_since(*accepted_at).as_millis() < u128::from(*cooldown)
        });
    }
}
