//! Timed effects: Booster Bait, Market Surge, and the Automated Trawling Net.
//!
//! Booster and surge share one lifecycle: while the enabling research is
//! owned and the effect is idle, a roll every second may switch it on for a
//! fixed duration. The net is not random; it hauls on a fixed interval.

use log::info;

use crate::catalog::Catalog;
use crate::economy;
use crate::env::Random;
use crate::state::{GameState, IncomeSource, TimedEffectState};

/// The two probabilistic buffs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Booster,
    MarketSurge,
}

impl EffectKind {
    pub const ALL: [EffectKind; 2] = [EffectKind::Booster, EffectKind::MarketSurge];

    pub fn label(self) -> &'static str {
        match self {
            EffectKind::Booster => "Booster Bait",
            EffectKind::MarketSurge => "Market Surge",
        }
    }
}

/// Income multiplier from its inputs. Never stored.
pub fn effective_multiplier_of(base: f64, surge_active: bool, surge_multiplier: f64) -> f64 {
    if surge_active {
        base * surge_multiplier
    } else {
        base
    }
}

/// Multiplier applied to crew collections and caught fish right now: the
/// permanent research multiplier, times the surge factor while a surge runs.
pub fn effective_multiplier(state: &GameState) -> f64 {
    effective_multiplier_of(
        state.global_multiplier,
        state.market_surge.effect.active,
        state.market_surge.multiplier,
    )
}

fn enabling_upgrade(catalog: &Catalog, kind: EffectKind) -> Option<&str> {
    match kind {
        EffectKind::Booster => catalog.booster_upgrade().map(|(u, _)| u.id.as_str()),
        EffectKind::MarketSurge => catalog.market_surge_upgrade().map(|(u, _)| u.id.as_str()),
    }
}

/// Whether the research enabling `kind` is owned.
pub fn is_enabled(catalog: &Catalog, state: &GameState, kind: EffectKind) -> bool {
    enabling_upgrade(catalog, kind).is_some_and(|id| state.is_purchased(id))
}

pub fn effect_state(state: &GameState, kind: EffectKind) -> &TimedEffectState {
    match kind {
        EffectKind::Booster => &state.booster.effect,
        EffectKind::MarketSurge => &state.market_surge.effect,
    }
}

fn effect_state_mut(state: &mut GameState, kind: EffectKind) -> &mut TimedEffectState {
    match kind {
        EffectKind::Booster => &mut state.booster.effect,
        EffectKind::MarketSurge => &mut state.market_surge.effect,
    }
}

fn chance_and_duration(state: &GameState, kind: EffectKind) -> (f64, f64) {
    match kind {
        EffectKind::Booster => (state.booster.chance, state.booster.duration_ms),
        EffectKind::MarketSurge => (state.market_surge.chance, state.market_surge.duration_ms),
    }
}

/// One activation roll for each idle, enabled effect. Draws one sample per
/// eligible effect and returns the effects that switched on.
pub fn roll(
    catalog: &Catalog,
    state: &mut GameState,
    random: &mut impl Random,
    now: f64,
) -> Vec<EffectKind> {
    let mut started = Vec::new();
    for kind in EffectKind::ALL {
        if !is_enabled(catalog, state, kind) || effect_state(state, kind).active {
            continue;
        }
        let (chance, duration) = chance_and_duration(state, kind);
        if random.next_f64() < chance {
            effect_state_mut(state, kind).activate(now, duration);
            match kind {
                EffectKind::Booster => state.stats.booster_activations += 1,
                EffectKind::MarketSurge => state.stats.surge_activations += 1,
            }
            info!("{} active for {:.0}s", kind.label(), duration / 1_000.0);
            started.push(kind);
        }
    }
    started
}

/// Result of an expiry check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Expiry {
    /// The effect was switched off (or was not running).
    Expired,
    /// Deadline not reached yet; check again after this many ms.
    Pending(f64),
}

/// Switch `kind` off if its deadline has passed.
pub fn expire(state: &mut GameState, kind: EffectKind, now: f64) -> Expiry {
    let effect = effect_state_mut(state, kind);
    match (effect.active, effect.ends_at) {
        (true, Some(end)) if now < end => Expiry::Pending(end - now),
        (true, _) => {
            effect.deactivate();
            info!("{} ended", kind.label());
            Expiry::Expired
        }
        (false, _) => {
            effect.ends_at = None;
            Expiry::Expired
        }
    }
}

/// Whether the trawling net is owned and has something to haul.
pub fn auto_net_running(catalog: &Catalog, state: &GameState) -> bool {
    catalog
        .auto_net_upgrade()
        .is_some_and(|(u, _)| state.is_purchased(&u.id))
        && state.auto_net.interval_ms > 0.0
}

/// Fish one net haul is worth: the catch count at the pond's base value.
/// Research and surge multipliers do not apply.
pub fn auto_net_amount(state: &GameState) -> f64 {
    state.auto_net.catch_amount as f64 * state.minigame.base_value as f64
}

/// Credit one net haul. Independent of the fish in the pond.
pub fn auto_net_haul(catalog: &Catalog, state: &mut GameState) -> f64 {
    if !auto_net_running(catalog, state) {
        return 0.0;
    }
    let amount = auto_net_amount(state);
    economy::credit(state, amount, IncomeSource::AutoNet);
    amount
}
