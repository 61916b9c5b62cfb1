//! Fish World Tycoon economy: balance, purchases, and cost scaling.
//! Pure functions over `GameState`, fully testable.

use log::info;
use thiserror::Error;

use crate::catalog::{Catalog, GlobalEffect, MinigameEffect, Tuning};
use crate::format::format_number;
use crate::production;
use crate::state::{GameState, IncomeSource, MinigameUpgradeState, ProducerState};

/// Why a command did nothing. Display text is shown to the player as-is.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum Rejection {
    #[error("Not enough fish! You need {} fish.", format_number(.needed.ceil()))]
    InsufficientFunds { needed: f64 },
    #[error("Unknown id: {0}")]
    UnknownId(String),
    #[error("{0} is already purchased.")]
    AlreadyPurchased(String),
    #[error("{0} is already at max level.")]
    MaxLevel(String),
    #[error("{upgrade} requires {requires}.")]
    Locked { upgrade: String, requires: String },
    #[error("Hire a {0} before upgrading the crew.")]
    NoCrew(String),
    #[error("That fish got away.")]
    TargetGone,
}

/// Next price after a purchase. Every step is rounded up before it is used
/// as the base of the following step.
pub fn next_cost(cost: f64, growth: f64) -> f64 {
    (cost * growth).ceil()
}

/// Price after `steps` purchases starting from `initial`.
pub fn cost_after(initial: f64, growth: f64, steps: u32) -> f64 {
    (0..steps).fold(initial.ceil(), |cost, _| next_cost(cost, growth))
}

pub fn credit(state: &mut GameState, amount: f64, source: IncomeSource) {
    if amount <= 0.0 || !amount.is_finite() {
        return;
    }
    state.balance += amount;
    state.stats.record(amount, source);
}

fn debit(state: &mut GameState, cost: f64) -> Result<(), Rejection> {
    if !state.can_afford(cost) {
        return Err(Rejection::InsufficientFunds { needed: cost });
    }
    state.balance -= cost;
    state.stats.fish_spent += cost;
    Ok(())
}

/// Hire one unit of a crew type.
pub fn hire(catalog: &Catalog, state: &mut GameState, type_id: &str, now: f64) -> Result<(), Rejection> {
    let def = catalog
        .producer(type_id)
        .ok_or_else(|| Rejection::UnknownId(type_id.to_string()))?;
    let cost = state
        .producers
        .entry(def.id.clone())
        .or_insert_with(|| ProducerState::new(def))
        .next_hire_cost;

    debit(state, cost)?;

    if let Some(p) = state.producers.get_mut(type_id) {
        p.quantity += 1;
        p.next_hire_cost = next_cost(cost, def.hire_cost_growth);
        info!("hired {} ({} in crew) for {}", def.name, p.quantity, format_number(cost));
    }
    production::sync_timer(catalog, state, type_id, now);
    Ok(())
}

/// Raise the level of a whole crew type.
pub fn upgrade_crew(catalog: &Catalog, state: &mut GameState, type_id: &str) -> Result<(), Rejection> {
    let def = catalog
        .producer(type_id)
        .ok_or_else(|| Rejection::UnknownId(type_id.to_string()))?;
    let (quantity, cost) = state
        .producers
        .get(type_id)
        .map_or((0, 0.0), |p| (p.quantity, p.next_upgrade_cost));
    if quantity == 0 {
        return Err(Rejection::NoCrew(def.name.clone()));
    }

    debit(state, cost)?;

    if let Some(p) = state.producers.get_mut(type_id) {
        p.level += 1;
        p.next_upgrade_cost = next_cost(cost, def.upgrade_cost_growth);
        info!("{} crew upgraded to level {}", def.name, p.level);
    }
    Ok(())
}

/// Buy a one-time research upgrade.
pub fn purchase_global_upgrade(
    catalog: &Catalog,
    state: &mut GameState,
    upgrade_id: &str,
) -> Result<(), Rejection> {
    let def = catalog
        .global_upgrade(upgrade_id)
        .ok_or_else(|| Rejection::UnknownId(upgrade_id.to_string()))?;
    if state.is_purchased(upgrade_id) {
        return Err(Rejection::AlreadyPurchased(def.name.clone()));
    }

    debit(state, def.cost.ceil())?;

    state.purchased_upgrades.insert(def.id.clone());
    if let Some(increment) = def.income_multiplier_increment {
        state.global_multiplier *= 1.0 + increment;
    }
    if let Some(effect) = &def.effect {
        apply_global_effect(state, effect);
    }
    info!("research purchased: {} (multiplier x{:.3})", def.name, state.global_multiplier);
    Ok(())
}

/// Seed the booster, net, or surge parameters from a research upgrade.
pub fn apply_global_effect(state: &mut GameState, effect: &GlobalEffect) {
    match effect {
        GlobalEffect::Booster(b) => {
            state.booster.chance = b.chance;
            state.booster.duration_ms = b.duration_ms;
            state.booster.spawn_interval_ms = b.spawn_interval_ms;
            state.booster.max_targets_multiplier = b.max_targets_multiplier;
        }
        GlobalEffect::AutoNet(n) => {
            state.auto_net.catch_amount = n.catch_amount;
            state.auto_net.interval_ms = n.interval_ms;
        }
        GlobalEffect::MarketSurge(s) => {
            state.market_surge.chance = s.chance;
            state.market_surge.duration_ms = s.duration_ms;
            state.market_surge.multiplier = s.multiplier;
        }
    }
}

/// Whether a tackle upgrade's research prerequisite is owned.
pub fn is_unlocked(catalog: &Catalog, state: &GameState, upgrade_id: &str) -> bool {
    catalog
        .minigame_upgrade(upgrade_id)
        .and_then(|def| def.required_global_upgrade.as_deref())
        .map_or(true, |req| state.is_purchased(req))
}

/// Buy the next level of a tackle upgrade. Returns the new level.
pub fn purchase_minigame_upgrade(
    catalog: &Catalog,
    state: &mut GameState,
    upgrade_id: &str,
) -> Result<u32, Rejection> {
    let def = catalog
        .minigame_upgrade(upgrade_id)
        .ok_or_else(|| Rejection::UnknownId(upgrade_id.to_string()))?;
    let current = state
        .minigame_upgrades
        .entry(def.id.clone())
        .or_insert_with(|| MinigameUpgradeState {
            level: 1,
            next_cost: def.base_cost.ceil(),
        })
        .clone();

    if def.max_level.is_some_and(|max| current.level >= max) {
        return Err(Rejection::MaxLevel(def.name.clone()));
    }
    if let Some(req) = &def.required_global_upgrade {
        if !state.is_purchased(req) {
            let requires = catalog
                .global_upgrade(req)
                .map_or_else(|| req.clone(), |g| g.name.clone());
            return Err(Rejection::Locked {
                upgrade: def.name.clone(),
                requires,
            });
        }
    }

    debit(state, current.next_cost)?;

    let level = current.level + 1;
    if let Some(st) = state.minigame_upgrades.get_mut(upgrade_id) {
        st.level = level;
        st.next_cost = next_cost(current.next_cost, def.cost_growth);
    }
    apply_minigame_effect(&catalog.tuning, state, &def.effect);
    info!("{} upgraded to level {} ({})", def.name, level, def.effect.describe());
    Ok(level)
}

/// Apply one level of a tackle upgrade to the live parameters.
pub fn apply_minigame_effect(tuning: &Tuning, state: &mut GameState, effect: &MinigameEffect) {
    let params = &mut state.minigame;
    match effect {
        MinigameEffect::MaxTargets(n) => params.max_targets += n,
        MinigameEffect::LifetimeMs(ms) => params.lifetime_ms += ms,
        MinigameEffect::BaseValue(v) => params.base_value += v,
        MinigameEffect::CriticalChance(c) => {
            params.critical_chance = (params.critical_chance + c).min(1.0);
        }
        MinigameEffect::SpawnCooldownMs(ms) => {
            params.min_spawn_ms = (params.min_spawn_ms - ms).max(tuning.global_min_spawn_ms);
            params.max_spawn_ms =
                (params.max_spawn_ms - ms).max(params.min_spawn_ms + tuning.spawn_interval_offset_ms);
        }
        MinigameEffect::BoosterChance(c) => {
            state.booster.chance = (state.booster.chance + c).min(1.0);
        }
        MinigameEffect::BoosterDurationMs(ms) => state.booster.duration_ms += ms,
        MinigameEffect::AutoNetAmount(n) => state.auto_net.catch_amount += n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(balance: f64) -> (Catalog, GameState) {
        let catalog = Catalog::standard();
        let mut state = GameState::new(&catalog);
        state.balance = balance;
        (catalog, state)
    }

    #[test]
    fn hire_debits_and_scales_cost() {
        let (c, mut s) = setup(100.0);
        hire(&c, &mut s, "novice_fisher", 0.0).unwrap();
        let p = &s.producers["novice_fisher"];
        assert_eq!(p.quantity, 1);
        assert!((s.balance - 80.0).abs() < 0.001);
        assert_eq!(p.next_hire_cost, 23.0); // ceil(20 * 1.15)
        assert_eq!(s.timers["novice_fisher"].interval_ms, 5_000.0);
        assert_eq!(s.timers["novice_fisher"].next_collection_at, 5_000.0);
    }

    #[test]
    fn hire_rejected_without_funds_changes_nothing() {
        let (c, mut s) = setup(19.0);
        let before = s.clone();
        let err = hire(&c, &mut s, "novice_fisher", 0.0).unwrap_err();
        assert_eq!(err, Rejection::InsufficientFunds { needed: 20.0 });
        assert_eq!(s, before);
    }

    #[test]
    fn hire_unknown_type_rejected() {
        let (c, mut s) = setup(1e9);
        let before = s.clone();
        assert_eq!(
            hire(&c, &mut s, "kraken_tamer", 0.0),
            Err(Rejection::UnknownId("kraken_tamer".into()))
        );
        assert_eq!(s, before);
    }

    #[test]
    fn second_hire_keeps_cycle_progress() {
        let (c, mut s) = setup(1_000.0);
        hire(&c, &mut s, "novice_fisher", 0.0).unwrap(); // due at 5000
        hire(&c, &mut s, "novice_fisher", 1_000.0).unwrap(); // interval → 2500
        let t = s.timers["novice_fisher"];
        assert_eq!(t.interval_ms, 2_500.0);
        assert_eq!(t.next_collection_at, 2_500.0);
    }

    #[test]
    fn hire_late_in_cycle_clamps_to_now() {
        let (c, mut s) = setup(1_000.0);
        hire(&c, &mut s, "novice_fisher", 0.0).unwrap(); // due at 5000
        hire(&c, &mut s, "novice_fisher", 4_000.0).unwrap(); // 5000-5000+2500 = 2500 < now
        assert_eq!(s.timers["novice_fisher"].next_collection_at, 4_000.0);
    }

    #[test]
    fn upgrade_crew_requires_units() {
        let (c, mut s) = setup(1e6);
        let before = s.clone();
        assert_eq!(
            upgrade_crew(&c, &mut s, "novice_fisher"),
            Err(Rejection::NoCrew("Novice Fisher".into()))
        );
        assert_eq!(s, before);
    }

    #[test]
    fn upgrade_crew_levels_and_scales() {
        let (c, mut s) = setup(1_000.0);
        hire(&c, &mut s, "novice_fisher", 0.0).unwrap();
        upgrade_crew(&c, &mut s, "novice_fisher").unwrap();
        let p = &s.producers["novice_fisher"];
        assert_eq!(p.level, 2);
        assert_eq!(p.next_upgrade_cost, 68.0); // ceil(50 * 1.35) = ceil(67.5)
        assert!((s.balance - (1_000.0 - 20.0 - 50.0)).abs() < 0.001);
    }

    #[test]
    fn upgrade_crew_unaffordable() {
        let (c, mut s) = setup(30.0);
        hire(&c, &mut s, "novice_fisher", 0.0).unwrap();
        let before = s.clone();
        assert_eq!(
            upgrade_crew(&c, &mut s, "novice_fisher"),
            Err(Rejection::InsufficientFunds { needed: 50.0 })
        );
        assert_eq!(s, before);
    }

    #[test]
    fn multipliers_compose_multiplicatively() {
        let (c, mut s) = setup(1e6);
        purchase_global_upgrade(&c, &mut s, "sharper_hooks").unwrap();
        purchase_global_upgrade(&c, &mut s, "sonar_technology").unwrap();
        assert!((s.global_multiplier - 1.375).abs() < 1e-12);
        assert!((s.global_multiplier - 1.35).abs() > 0.01);
    }

    #[test]
    fn global_upgrade_is_idempotent() {
        let (c, mut s) = setup(1e6);
        purchase_global_upgrade(&c, &mut s, "sharper_hooks").unwrap();
        let before = s.clone();
        assert_eq!(
            purchase_global_upgrade(&c, &mut s, "sharper_hooks"),
            Err(Rejection::AlreadyPurchased("Sharper Hooks".into()))
        );
        assert_eq!(s, before);
    }

    #[test]
    fn auto_net_purchase_seeds_state() {
        let (c, mut s) = setup(1e6);
        purchase_global_upgrade(&c, &mut s, "automated_trawling_net").unwrap();
        assert_eq!(s.auto_net.catch_amount, 1);
        assert_eq!(s.auto_net.interval_ms, 10_000.0);
        assert!((s.global_multiplier - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn booster_and_surge_purchase_seed_state() {
        let (c, mut s) = setup(1e6);
        purchase_global_upgrade(&c, &mut s, "booster_bait").unwrap();
        purchase_global_upgrade(&c, &mut s, "market_analysis").unwrap();
        assert!((s.booster.chance - 0.01).abs() < 1e-12);
        assert_eq!(s.booster.spawn_interval_ms, 300.0);
        assert!((s.market_surge.multiplier - 2.0).abs() < 1e-12);
        assert!(!s.booster.effect.active);
    }

    #[test]
    fn gated_tackle_is_locked_until_research() {
        let (c, mut s) = setup(1e6);
        assert!(!is_unlocked(&c, &s, "wider_nets"));
        let err = purchase_minigame_upgrade(&c, &mut s, "wider_nets").unwrap_err();
        assert_eq!(
            err,
            Rejection::Locked {
                upgrade: "Wider Nets".into(),
                requires: "Automated Trawling Net".into()
            }
        );
        purchase_global_upgrade(&c, &mut s, "automated_trawling_net").unwrap();
        assert!(is_unlocked(&c, &s, "wider_nets"));
        assert_eq!(purchase_minigame_upgrade(&c, &mut s, "wider_nets"), Ok(2));
        assert_eq!(s.auto_net.catch_amount, 2);
    }

    #[test]
    fn tackle_upgrade_respects_max_level() {
        let (c, mut s) = setup(1e12);
        for expected in 2..=8 {
            assert_eq!(purchase_minigame_upgrade(&c, &mut s, "chum_the_water"), Ok(expected));
        }
        let before = s.clone();
        assert_eq!(
            purchase_minigame_upgrade(&c, &mut s, "chum_the_water"),
            Err(Rejection::MaxLevel("Chum the Water".into()))
        );
        assert_eq!(s, before);
    }

    #[test]
    fn tackle_upgrade_applies_additive_effects() {
        let (c, mut s) = setup(1e6);
        purchase_minigame_upgrade(&c, &mut s, "more_crowded_waters").unwrap();
        purchase_minigame_upgrade(&c, &mut s, "patient_fish").unwrap();
        purchase_minigame_upgrade(&c, &mut s, "lucky_catch").unwrap();
        purchase_minigame_upgrade(&c, &mut s, "keen_eye").unwrap();
        assert_eq!(s.minigame.max_targets, 6);
        assert_eq!(s.minigame.lifetime_ms, 8_500.0);
        assert_eq!(s.minigame.base_value, 2);
        assert!((s.minigame.critical_chance - 0.07).abs() < 1e-12);
        assert_eq!(s.minigame_upgrades["lucky_catch"].next_cost, 640.0);
    }

    #[test]
    fn spawn_cooldown_floors_and_keeps_gap() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        s.minigame.min_spawn_ms = 250.0;
        s.minigame.max_spawn_ms = 320.0;
        apply_minigame_effect(&c.tuning, &mut s, &MinigameEffect::SpawnCooldownMs(100.0));
        assert_eq!(s.minigame.min_spawn_ms, 200.0);
        assert_eq!(s.minigame.max_spawn_ms, 300.0);
        assert!(s.minigame.max_spawn_ms > s.minigame.min_spawn_ms);
    }

    #[test]
    fn spawn_cooldown_subtracts_from_both_bounds() {
        let c = Catalog::standard();
        let mut s = GameState::new(&c);
        apply_minigame_effect(&c.tuning, &mut s, &MinigameEffect::SpawnCooldownMs(100.0));
        assert_eq!(s.minigame.min_spawn_ms, 900.0);
        assert_eq!(s.minigame.max_spawn_ms, 1_900.0);
    }

    #[test]
    fn rejection_messages_are_player_facing() {
        let msg = Rejection::InsufficientFunds { needed: 1_500.0 }.to_string();
        assert_eq!(msg, "Not enough fish! You need 1,500 fish.");
    }

    #[test]
    fn credit_ignores_non_positive_amounts() {
        let (_, mut s) = setup(10.0);
        credit(&mut s, -5.0, IncomeSource::Crew);
        credit(&mut s, f64::NAN, IncomeSource::Crew);
        assert!((s.balance - 10.0).abs() < 0.001);
        assert_eq!(s.stats.fish_earned_all_time, 0.0);
    }
}
