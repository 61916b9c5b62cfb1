/// Fish World Tycoon game state definitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ProducerTypeDef};

/// Ownership state of one crew type.
#[derive(Clone, Debug, PartialEq)]
pub struct ProducerState {
    pub quantity: u32,
    /// Starts at 1; multiplies the per-cycle collection amount.
    pub level: u32,
    pub next_hire_cost: f64,
    pub next_upgrade_cost: f64,
}

impl ProducerState {
    pub fn new(def: &ProducerTypeDef) -> Self {
        Self {
            quantity: 0,
            level: 1,
            next_hire_cost: def.initial_hire_cost.ceil(),
            next_upgrade_cost: def.base_upgrade_cost.ceil(),
        }
    }
}

/// Collection timer of a crew type that has at least one unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProducerTimer {
    pub interval_ms: f64,
    /// Absolute timestamp of the next collection.
    pub next_collection_at: f64,
}

/// Tunable parameters of the catch minigame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinigameParams {
    pub max_targets: u32,
    pub lifetime_ms: f64,
    pub base_value: u64,
    pub critical_chance: f64,
    pub min_spawn_ms: f64,
    pub max_spawn_ms: f64,
}

impl Default for MinigameParams {
    fn default() -> Self {
        Self {
            max_targets: 5,
            lifetime_ms: 8_000.0,
            base_value: 1,
            critical_chance: 0.05,
            min_spawn_ms: 1_000.0,
            max_spawn_ms: 2_000.0,
        }
    }
}

/// Level and price of one tackle upgrade.
#[derive(Clone, Debug, PartialEq)]
pub struct MinigameUpgradeState {
    pub level: u32,
    pub next_cost: f64,
}

/// Active flag and deadline of a probabilistic buff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimedEffectState {
    pub active: bool,
    pub ends_at: Option<f64>,
}

impl TimedEffectState {
    pub fn activate(&mut self, now: f64, duration_ms: f64) {
        self.active = true;
        self.ends_at = Some(now + duration_ms);
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.ends_at = None;
    }

    /// Milliseconds left, or None if inactive.
    pub fn remaining_ms(&self, now: f64) -> Option<f64> {
        match (self.active, self.ends_at) {
            (true, Some(end)) => Some((end - now).max(0.0)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoosterState {
    pub chance: f64,
    pub duration_ms: f64,
    pub spawn_interval_ms: f64,
    pub max_targets_multiplier: f64,
    pub effect: TimedEffectState,
}

impl Default for BoosterState {
    fn default() -> Self {
        Self {
            chance: 0.0,
            duration_ms: 0.0,
            spawn_interval_ms: 0.0,
            max_targets_multiplier: 1.0,
            effect: TimedEffectState::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarketSurgeState {
    pub chance: f64,
    pub duration_ms: f64,
    pub multiplier: f64,
    pub effect: TimedEffectState,
}

impl Default for MarketSurgeState {
    fn default() -> Self {
        Self {
            chance: 0.0,
            duration_ms: 0.0,
            multiplier: 1.0,
            effect: TimedEffectState::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AutoNetState {
    pub catch_amount: u32,
    pub interval_ms: f64,
}

/// A clickable fish in the pond. Never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub id: u64,
    /// Position in percent of the pond, margin-clamped.
    pub x_pct: f64,
    pub y_pct: f64,
    pub size: u32,
    pub spawned_at: f64,
    /// Precomputed catch value before the income multiplier.
    pub value: u64,
    pub critical: bool,
}

/// Where a credit came from, for the statistics breakdown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum IncomeSource {
    Crew,
    Minigame,
    AutoNet,
    Offline,
}

/// Lifetime statistics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub fish_earned_all_time: f64,
    pub fish_spent: f64,
    pub fish_from_crews: f64,
    pub fish_from_minigame: f64,
    pub fish_from_auto_net: f64,
    pub fish_from_offline: f64,
    pub targets_caught: u64,
    pub critical_catches: u64,
    pub booster_activations: u32,
    pub surge_activations: u32,
}

impl Stats {
    pub fn record(&mut self, amount: f64, source: IncomeSource) {
        self.fish_earned_all_time += amount;
        match source {
            IncomeSource::Crew => self.fish_from_crews += amount,
            IncomeSource::Minigame => self.fish_from_minigame += amount,
            IncomeSource::AutoNet => self.fish_from_auto_net += amount,
            IncomeSource::Offline => self.fish_from_offline += amount,
        }
    }
}

/// Full state of a Fish World Tycoon game.
#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    /// Fish on hand. Fractional because of multiplier math.
    pub balance: f64,
    pub producers: BTreeMap<String, ProducerState>,
    /// Present only for crew types with quantity > 0.
    pub timers: BTreeMap<String, ProducerTimer>,
    pub purchased_upgrades: BTreeSet<String>,
    /// Permanent multiplier, the product of `1 + increment` over purchases.
    pub global_multiplier: f64,
    pub minigame_upgrades: BTreeMap<String, MinigameUpgradeState>,
    pub minigame: MinigameParams,
    pub booster: BoosterState,
    pub auto_net: AutoNetState,
    pub market_surge: MarketSurgeState,
    pub targets: Vec<Target>,
    pub next_target_id: u64,
    pub stats: Stats,
    pub last_save_timestamp: Option<f64>,
}

impl GameState {
    /// Fresh state from catalog defaults.
    pub fn new(catalog: &Catalog) -> Self {
        let producers = catalog
            .producers
            .iter()
            .map(|def| (def.id.clone(), ProducerState::new(def)))
            .collect();
        let minigame_upgrades = catalog
            .minigame_upgrades
            .iter()
            .map(|def| {
                (
                    def.id.clone(),
                    MinigameUpgradeState {
                        level: 1,
                        next_cost: def.base_cost.ceil(),
                    },
                )
            })
            .collect();

        Self {
            balance: catalog.tuning.initial_balance,
            producers,
            timers: BTreeMap::new(),
            purchased_upgrades: BTreeSet::new(),
            global_multiplier: 1.0,
            minigame_upgrades,
            minigame: catalog.tuning.initial_minigame.clone(),
            booster: BoosterState::default(),
            auto_net: AutoNetState::default(),
            market_surge: MarketSurgeState::default(),
            targets: Vec::new(),
            next_target_id: 1,
            stats: Stats::default(),
            last_save_timestamp: None,
        }
    }

    pub fn is_purchased(&self, upgrade_id: &str) -> bool {
        self.purchased_upgrades.contains(upgrade_id)
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.balance >= cost
    }

    /// Total crew units across all types.
    pub fn total_crew(&self) -> u32 {
        self.producers.values().map(|p| p.quantity).sum()
    }
}
