//! The pond: fish spawn at random spots, swim away after a while, and pay
//! out when clicked.

use log::debug;

use crate::catalog::Tuning;
use crate::economy::{self, Rejection};
use crate::effects;
use crate::env::Random;
use crate::state::{GameState, IncomeSource, MinigameParams, Target};

/// Pond parameters in force right now, with Booster Bait applied.
///
/// The booster raises the target cap and pins the spawn cadence to its own
/// fast interval. Lifetime and catch value are untouched.
pub fn effective_params(state: &GameState) -> MinigameParams {
    let mut params = state.minigame.clone();
    if state.booster.effect.active {
        params.max_targets =
            (params.max_targets as f64 * state.booster.max_targets_multiplier).floor() as u32;
        if state.booster.spawn_interval_ms > 0.0 {
            params.min_spawn_ms = state.booster.spawn_interval_ms;
            params.max_spawn_ms = state.booster.spawn_interval_ms;
        }
    }
    params
}

/// Delay before the next spawn attempt, uniform over the spawn bounds.
pub fn spawn_delay(random: &mut impl Random, params: &MinigameParams) -> f64 {
    if params.max_spawn_ms <= params.min_spawn_ms {
        return params.min_spawn_ms;
    }
    random.range(params.min_spawn_ms, params.max_spawn_ms)
}

/// Value of a freshly spawned fish: `(value, critical)`.
pub fn roll_value(tuning: &Tuning, params: &MinigameParams, random: &mut impl Random) -> (u64, bool) {
    let critical = random.next_f64() < params.critical_chance;
    if !critical {
        return (params.base_value, false);
    }
    let factor = random.range(tuning.critical_min_multiplier, tuning.critical_max_multiplier);
    ((params.base_value as f64 * factor).floor() as u64, true)
}

/// Try to put one fish in the pond. Does nothing while the pond is full.
pub fn try_spawn(
    tuning: &Tuning,
    state: &mut GameState,
    random: &mut impl Random,
    now: f64,
) -> Option<Target> {
    let params = effective_params(state);
    if state.targets.len() >= params.max_targets as usize {
        return None;
    }

    let margin = tuning.pond_margin_pct.clamp(0.0, 50.0);
    let span = 100.0 - 2.0 * margin;
    let x_pct = margin + random.next_f64() * span;
    let y_pct = margin + random.next_f64() * span;
    let size = random
        .range(tuning.target_min_size as f64, tuning.target_max_size as f64 + 1.0)
        .floor()
        .min(tuning.target_max_size as f64) as u32;
    let (value, critical) = roll_value(tuning, &params, random);

    let target = Target {
        id: state.next_target_id,
        x_pct,
        y_pct,
        size,
        spawned_at: now,
        value,
        critical,
    };
    state.next_target_id += 1;
    state.targets.push(target.clone());
    debug!(
        "fish #{} surfaced at ({:.0}%, {:.0}%) worth {}{}",
        target.id,
        x_pct,
        y_pct,
        value,
        if critical { " (critical)" } else { "" }
    );
    Some(target)
}

/// Remove fish that have outlived the lifetime. Returns how many left.
pub fn sweep(state: &mut GameState, now: f64) -> usize {
    let lifetime = state.minigame.lifetime_ms;
    let before = state.targets.len();
    state.targets.retain(|t| now - t.spawned_at < lifetime);
    before - state.targets.len()
}

/// What a successful click produced, for the on-screen splash.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchOutcome {
    pub target_id: u64,
    /// Fish credited, after the income multiplier.
    pub credited: f64,
    pub critical: bool,
    pub x_pct: f64,
    pub y_pct: f64,
}

/// Catch a fish. The target is removed before anything is credited, so a
/// second click on the same id finds nothing. A fish past its lifetime is
/// gone even if the sweep has not run yet.
pub fn catch(state: &mut GameState, target_id: u64, now: f64) -> Result<CatchOutcome, Rejection> {
    let idx = state
        .targets
        .iter()
        .position(|t| t.id == target_id)
        .ok_or(Rejection::TargetGone)?;
    let target = state.targets.remove(idx);
    if now - target.spawned_at >= state.minigame.lifetime_ms {
        return Err(Rejection::TargetGone);
    }

    let credited = target.value as f64 * effects::effective_multiplier(state);
    economy::credit(state, credited, IncomeSource::Minigame);
    state.stats.targets_caught += 1;
    if target.critical {
        state.stats.critical_catches += 1;
    }

    Ok(CatchOutcome {
        target_id,
        credited,
        critical: target.critical,
        x_pct: target.x_pct,
        y_pct: target.y_pct,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::env::RngSource;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_critical_value_in_range(base in 1u64..10_000, seed in any::<u64>()) {
            let c = Catalog::standard();
            let params = MinigameParams { base_value: base, critical_chance: 1.0, ..MinigameParams::default() };
            let mut r = RngSource::seeded(seed);
            let (value, critical) = roll_value(&c.tuning, &params, &mut r);
            prop_assert!(critical);
            let lo = (base as f64 * c.tuning.critical_min_multiplier).floor() as u64;
            let hi = (base as f64 * c.tuning.critical_max_multiplier).floor() as u64;
            prop_assert!(value >= lo && value <= hi, "{} not in [{}, {}]", value, lo, hi);
        }

        #[test]
        fn prop_spawned_fish_stay_inside_margin(seed in any::<u64>()) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            let mut r = RngSource::seeded(seed);
            let t = try_spawn(&c.tuning, &mut s, &mut r, 0.0).unwrap();
            let m = c.tuning.pond_margin_pct;
            prop_assert!(t.x_pct >= m && t.x_pct <= 100.0 - m);
            prop_assert!(t.y_pct >= m && t.y_pct <= 100.0 - m);
            prop_assert!(t.size >= c.tuning.target_min_size && t.size <= c.tuning.target_max_size);
        }

        #[test]
        fn prop_catch_credits_at_most_once(clicks in 1usize..6) {
            let c = Catalog::standard();
            let mut s = GameState::new(&c);
            s.balance = 0.0;
            let mut r = RngSource::seeded(1);
            let t = try_spawn(&c.tuning, &mut s, &mut r, 0.0).unwrap();
            let ok = (0..clicks).filter(|_| catch(&mut s, t.id, 0.0).is_ok()).count();
            prop_assert_eq!(ok, 1);
            prop_assert!((s.balance - t.value as f64).abs() < 1e-9);
        }
    }
}
