//! Combat outcome estimation: time-to-kill vs. time-to-die racing.
//!
//! The estimator is a pure function over attacker and target stats. It
//! never touches the game client: target stats are resolved ahead of time
//! into a [`TargetObservation`] (live instance preferred over the static
//! definition, which can be stale) and the result is a [`CombatOutcome`]
//! the danger check and the assignment engine both consume.
//!
//! Missing stats are treated as unknown, not as zero: the outcome carries
//! an infinite time-to-kill, which the danger check flags. Guessing
//! optimistically here is how squads die.

use warband_types::{CombatOutcome, CombatStats, TargetObservation};

/// Attack frequency floor, attacks per second.
///
/// Some stat sources report 0 for passive or disabled monsters; dividing
/// by that would blow the time estimates up.
const MIN_ATTACK_FREQUENCY: f64 = 0.1;

/// Ceil a non-negative float into a u32, saturating at the top.
fn ceil_u32(value: f64) -> u32 {
    let ceiled = value.ceil();
    if ceiled >= f64::from(u32::MAX) {
        u32::MAX
    } else if ceiled > 0.0 {
        // In range and already integral, the cast is exact.
        ceiled as u32
    } else {
        0
    }
}

/// Milliseconds to land `hits` attacks at `frequency` per second.
fn hits_to_ms(hits: u32, frequency: f64) -> f64 {
    let frequency = frequency.max(MIN_ATTACK_FREQUENCY);
    (f64::from(hits) / frequency * 1000.0).ceil()
}

/// Estimate the full combat race between us and a target.
///
/// Live stats are preferred over definition stats. When neither is
/// available the outcome is the conservative unknown: infinite
/// time-to-kill, which [`is_dangerous`] always flags.
pub fn estimate(attacker: &CombatStats, target: &TargetObservation) -> CombatOutcome {
    let Some(stats) = target.resolved() else {
        return CombatOutcome {
            hits_to_kill: u32::MAX,
            hits_to_die: None,
            time_to_kill_ms: f64::INFINITY,
            time_to_die_ms: f64::INFINITY,
            damage_to_target: 0.0,
            damage_to_self: 0.0,
        };
    };

    // Our side of the race. Effective damage is floored at 1 so armor
    // never produces a divide-by-zero; a fight we can barely scratch
    // shows up as an enormous (but finite) hit count instead.
    let damage_to_target = (attacker.attack - stats.armor).max(1.0);
    let hits_to_kill = ceil_u32(stats.hp / damage_to_target);
    let time_to_kill_ms = hits_to_ms(hits_to_kill, attacker.attack_frequency);

    // The counter-attack. Zero effective damage means the target cannot
    // kill us at all: no hit count, infinite time.
    let damage_to_self = stats.attack - attacker.armor;
    let (hits_to_die, time_to_die_ms) = if damage_to_self > 0.0 {
        let hits = ceil_u32(attacker.hp / damage_to_self).max(1);
        (Some(hits), hits_to_ms(hits, stats.attack_frequency))
    } else {
        (None, f64::INFINITY)
    };

    CombatOutcome {
        hits_to_kill,
        hits_to_die,
        time_to_kill_ms,
        time_to_die_ms,
        damage_to_target,
        damage_to_self: damage_to_self.max(0.0),
    }
}

/// Decide whether an estimated fight is too risky to start.
///
/// Conservative four-way OR; any single red flag blocks engagement:
///
/// 1. we cannot damage the target at all (infinite time-to-kill);
/// 2. one mistimed hit is lethal (`hits_to_die <= 1`);
/// 3. we sit inside the hit buffer *and* lose the race
///    (`hits_to_die <= min_hit_buffer` with a negative kill-die margin);
/// 4. the race margin is worse than the fixed slack, regardless of
///    hit buffer.
pub fn is_dangerous(outcome: &CombatOutcome, min_hit_buffer: u32, race_slack_ms: f64) -> bool {
    if !outcome.time_to_kill_ms.is_finite() {
        return true;
    }

    let margin = outcome.race_margin_ms();
    match outcome.hits_to_die {
        Some(hits) if hits <= 1 => true,
        Some(hits) if hits <= min_hit_buffer && margin < 0.0 => true,
        _ => margin < -race_slack_ms,
    }
}
