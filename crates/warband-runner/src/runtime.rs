//! The agent tick loop.
//!
//! One [`AgentRuntime`] per process, constructed once at startup and torn
//! down through its [`StopHandle`]. The loop is single-threaded and
//! cooperative: a tick runs to completion before the next is scheduled,
//! so the coordinator, assignment engine, and combat execution never
//! observe each other mid-step.
//!
//! Failure policy: nothing inside the loop is fatal. Send failures,
//! engage failures, and travel failures are logged and absorbed at the
//! tick boundary; the transport's losses are covered by the coordinator's
//! rebroadcast rules.

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use warband_core::config::WarbandConfig;
use warband_core::coordinator::{Coordinator, CycleInput};
use warband_core::engagement::{consider_engage, EngageOptions};
use warband_core::roster::Roster;
use warband_core::MoveArbiter;
use warband_types::{AgentName, Assignment, Command, TargetObservation};

use crate::bus::CommandBus;
use crate::error::RunnerError;
use crate::host::HostBindings;

/// Movement priority for task travel (rally points).
const PRIORITY_TASK: u8 = 1;

/// Movement priority for regroup orders; preempts task travel.
const PRIORITY_REGROUP: u8 = 3;

/// Handle for requesting a clean shutdown of the runtime loop.
#[derive(Debug, Clone)]
pub struct StopHandle(watch::Sender<bool>);

impl StopHandle {
    /// Ask the runtime to stop after the current tick.
    pub fn stop(&self) {
        let _ = self.0.send(true);
    }
}

/// One agent's runtime: coordinator, move arbiter, bus, and host binding.
#[derive(Debug)]
pub struct AgentRuntime<H: HostBindings> {
    bus: CommandBus,
    coordinator: Coordinator,
    arbiter: MoveArbiter,
    host: H,
    stop_rx: watch::Receiver<bool>,
}

impl<H: HostBindings> AgentRuntime<H> {
    /// Build a runtime for the host's character.
    pub fn new(bus: CommandBus, config: WarbandConfig, host: H) -> (Self, StopHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let self_name = host.self_identity().name;
        let runtime = Self {
            bus,
            coordinator: Coordinator::new(self_name, config),
            arbiter: MoveArbiter::new(),
            host,
            stop_rx,
        };
        (runtime, StopHandle(stop_tx))
    }

    /// Run the loop until stopped or the bus subscription closes.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] only for startup failures (the initial
    /// subscription); once the loop is entered, errors are absorbed.
    pub async fn run(mut self) -> Result<(), RunnerError> {
        let self_name = self.coordinator.self_name().clone();
        let mut subscriber = self.bus.subscribe(&self_name).await?;
        let mut stop_rx = self.stop_rx.clone();
        info!(agent = %self_name, "agent runtime started");

        let mut next_tick = tokio::time::Instant::now();
        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    // A dropped stop handle counts as a stop request.
                    if changed.is_err() || *stop_rx.borrow() {
                        info!(agent = %self_name, "stop requested");
                        break;
                    }
                }
                message = subscriber.next() => {
                    match message {
                        Some(message) => {
                            if let Some(command) = CommandBus::decode(&message.payload) {
                                self.handle_incoming(command).await;
                            }
                        }
                        None => {
                            warn!("bus subscription closed, stopping");
                            break;
                        }
                    }
                }
                () = tokio::time::sleep_until(next_tick) => {
                    self.tick().await;
                    let interval = self.coordinator.next_interval_ms(Utc::now());
                    next_tick = tokio::time::Instant::now()
                        + Duration::from_millis(interval);
                }
            }
        }

        info!(agent = %self_name, "agent runtime stopped");
        Ok(())
    }

    /// React to one incoming command and send any protocol replies.
    async fn handle_incoming(&mut self, command: Command) {
        debug!(cmd = command.cmd_name(), from = %command.from(), "command received");
        let replies = self.coordinator.handle_command(Utc::now(), command);
        self.send_all(replies).await;
    }

    /// One full coordination tick.
    async fn tick(&mut self) {
        let now = Utc::now();
        let identity = self.host.self_identity();
        let roster = Roster::snapshot(&self.host, &identity);

        // Deaths first, so the broadcast rides this tick and the wipe
        // bookkeeping is current before the assignment recompute.
        if self.host.take_death() {
            let outgoing = self.coordinator.note_local_death(now, &roster);
            self.send_all(outgoing).await;
        }

        // Movement that finished since last tick frees the arbiter.
        if self.arbiter.is_busy() && !self.host.is_busy_moving() {
            self.arbiter.complete();
        }

        let available: Vec<AgentName> = roster
            .names()
            .iter()
            .filter(|name| {
                roster
                    .class_of(name)
                    .is_some_and(|class| !class.is_merchant())
            })
            .cloned()
            .collect();
        let target = self.host.current_target();
        let world_event = self.host.world_event();
        let hunt_rally = self.host.hunt_rally();

        let output = self.coordinator.run_cycle(&CycleInput {
            now,
            roster: &roster,
            available: &available,
            target: target.as_ref(),
            hunt_rally: hunt_rally.as_ref(),
            world_event: world_event.as_ref(),
            self_status: Some(self.host.self_status(now)),
        });
        self.send_all(output.outgoing).await;

        if let Some(assignment) = output.assignment {
            self.execute(&assignment, target.as_ref(), &roster).await;
        }
    }

    /// Execute our role in the current assignment.
    async fn execute(
        &mut self,
        assignment: &Assignment,
        target: Option<&TargetObservation>,
        roster: &Roster,
    ) {
        let now = Utc::now();
        let config = self.coordinator.config();
        let cooldown = config.movement.request_cooldown_ms;

        // A regroup order overrides everything, including fights.
        if let Some(regroup) = &assignment.regroup {
            if self.arbiter.request(
                regroup.dest.clone(),
                "regroup",
                PRIORITY_REGROUP,
                cooldown,
                Instant::now(),
            ) {
                info!(reason = %regroup.reason, "regrouping");
                if let Err(e) = self.host.travel(&regroup.dest) {
                    warn!(error = %e, "regroup travel failed");
                    self.arbiter.cancel();
                }
            }
            return;
        }

        if !assignment.includes(self.coordinator.self_name()) {
            return;
        }

        // Gather at the rally point when the task has one.
        if let Some(rally) = &assignment.hunt_rally_point {
            if !self.host.is_busy_moving()
                && self.arbiter.request(
                    rally.clone(),
                    &assignment.task_key,
                    PRIORITY_TASK,
                    cooldown,
                    Instant::now(),
                )
            {
                if let Err(e) = self.host.travel(rally) {
                    warn!(error = %e, "rally travel failed");
                    self.arbiter.cancel();
                }
            }
        }

        // Combat: only against the assigned hunt target, or whatever the
        // crab filler has in view.
        let Some(observation) = target else {
            return;
        };
        let on_hunt = assignment.hunt_target.as_ref() == Some(&observation.id);
        let on_crab = assignment.crab.contains(self.coordinator.self_name());
        if !on_hunt && !on_crab {
            return;
        }

        let stats = self.host.self_stats();
        let options = EngageOptions {
            assist_ally: assignment.focus_ally.clone(),
        };
        match consider_engage(
            &mut self.coordinator,
            &mut self.host,
            now,
            roster,
            &stats,
            observation,
            &options,
        ) {
            Ok(report) => {
                debug!(decision = ?report.decision, target = %observation.id, "engagement step");
                self.send_all(report.outgoing).await;
            }
            Err(e) => {
                warn!(error = %e, target = %observation.id, "engage failed");
            }
        }
    }

    /// Send a batch of commands, absorbing per-peer failures.
    ///
    /// A failed send leaves the peer unacked; the coordinator's stale
    /// rebroadcast covers it on a later cycle.
    async fn send_all(&self, outgoing: Vec<(AgentName, Command)>) {
        for (peer, command) in outgoing {
            if let Err(e) = self.bus.send(&peer, &command).await {
                warn!(peer = %peer, error = %e, "send failed, relying on rebroadcast");
            }
        }
    }
}
