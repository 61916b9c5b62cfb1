//! Save/load of the whole game as one JSON blob.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: current blob format. Bump it when fields are added.
//! - `MIN_COMPATIBLE_VERSION`: oldest blob that can still be read. Adding
//!   fields does not change it; only a breaking change to the meaning of an
//!   existing field does.
//!
//! Any blob at or above `MIN_COMPATIBLE_VERSION` loads, with missing fields
//! filled from defaults. Derived values that are missing (prices, the income
//! multiplier, pond parameters) are recomputed from the catalog and the
//! owned counts instead of being reset.
//!
//! ## v2 changes
//! - lifetime statistics
//! - per-crew timers, so offline catch-up uses the saved cycle length

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::economy::{apply_global_effect, apply_minigame_effect, cost_after};
use crate::env::{PersistentStore, StoreError};
use crate::state::{
    AutoNetState, BoosterState, GameState, MarketSurgeState, MinigameParams, MinigameUpgradeState,
    ProducerState, ProducerTimer, Stats, TimedEffectState,
};

/// Blob format version. Bump when fields are added.
pub const SAVE_VERSION: u32 = 2;

/// Oldest blob version that can still be loaded.
pub const MIN_COMPATIBLE_VERSION: u32 = 1;

/// The store key holding the blob.
pub const STORAGE_KEY: &str = "fish_world_tycoon_save";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("save data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("save version {saved} is older than the oldest supported ({min})")]
    Incompatible { saved: u32, min: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Serialized form. Targets on screen are not saved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    #[serde(default)]
    pub game: GameSave,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSave {
    pub balance: f64,
    pub producers: BTreeMap<String, ProducerSave>,
    pub purchased_upgrades: Vec<String>,
    /// Recomputed from the purchases when missing.
    pub global_multiplier: Option<f64>,
    pub minigame_upgrades: BTreeMap<String, TackleSave>,
    pub minigame: Option<MinigameParams>,
    pub booster: Option<BoosterSave>,
    pub auto_net: Option<AutoNetSave>,
    pub market_surge: Option<MarketSurgeSave>,
    pub stats: Stats,
    pub last_save_timestamp: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerSave {
    pub quantity: u32,
    pub level: u32,
    pub next_hire_cost: Option<f64>,
    pub next_upgrade_cost: Option<f64>,
    pub interval_ms: Option<f64>,
    pub next_collection_at: Option<f64>,
}

impl Default for ProducerSave {
    fn default() -> Self {
        Self {
            quantity: 0,
            level: 1,
            next_hire_cost: None,
            next_upgrade_cost: None,
            interval_ms: None,
            next_collection_at: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TackleSave {
    pub level: u32,
    pub next_cost: Option<f64>,
}

impl Default for TackleSave {
    fn default() -> Self {
        Self {
            level: 1,
            next_cost: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterSave {
    pub chance: f64,
    pub duration_ms: f64,
    pub spawn_interval_ms: f64,
    pub max_targets_multiplier: f64,
    pub effect: TimedEffectState,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoNetSave {
    pub catch_amount: u32,
    pub interval_ms: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSurgeSave {
    pub chance: f64,
    pub duration_ms: f64,
    pub multiplier: f64,
    pub effect: TimedEffectState,
}

/// Snapshot of `state` for writing, stamped with `now`.
pub fn extract_save(state: &GameState, now: f64) -> SaveData {
    let producers = state
        .producers
        .iter()
        .map(|(id, p)| {
            let timer = state.timers.get(id);
            (
                id.clone(),
                ProducerSave {
                    quantity: p.quantity,
                    level: p.level,
                    next_hire_cost: Some(p.next_hire_cost),
                    next_upgrade_cost: Some(p.next_upgrade_cost),
                    interval_ms: timer.map(|t| t.interval_ms),
                    next_collection_at: timer.map(|t| t.next_collection_at),
                },
            )
        })
        .collect();

    let minigame_upgrades = state
        .minigame_upgrades
        .iter()
        .map(|(id, u)| {
            (
                id.clone(),
                TackleSave {
                    level: u.level,
                    next_cost: Some(u.next_cost),
                },
            )
        })
        .collect();

    SaveData {
        version: SAVE_VERSION,
        game: GameSave {
            balance: state.balance,
            producers,
            purchased_upgrades: state.purchased_upgrades.iter().cloned().collect(),
            global_multiplier: Some(state.global_multiplier),
            minigame_upgrades,
            minigame: Some(state.minigame.clone()),
            booster: Some(BoosterSave {
                chance: state.booster.chance,
                duration_ms: state.booster.duration_ms,
                spawn_interval_ms: state.booster.spawn_interval_ms,
                max_targets_multiplier: state.booster.max_targets_multiplier,
                effect: state.booster.effect,
            }),
            auto_net: Some(AutoNetSave {
                catch_amount: state.auto_net.catch_amount,
                interval_ms: state.auto_net.interval_ms,
            }),
            market_surge: Some(MarketSurgeSave {
                chance: state.market_surge.chance,
                duration_ms: state.market_surge.duration_ms,
                multiplier: state.market_surge.multiplier,
                effect: state.market_surge.effect,
            }),
            stats: state.stats.clone(),
            last_save_timestamp: Some(now),
        },
    }
}

/// Pond, booster, and net parameters implied by the purchases alone.
fn derive_parameters(catalog: &Catalog, state: &mut GameState) {
    state.minigame = catalog.tuning.initial_minigame.clone();
    state.booster = BoosterState::default();
    state.auto_net = AutoNetState::default();
    state.market_surge = MarketSurgeState::default();

    for def in &catalog.global_upgrades {
        if !state.is_purchased(&def.id) {
            continue;
        }
        if let Some(effect) = &def.effect {
            apply_global_effect(state, effect);
        }
    }

    for def in &catalog.minigame_upgrades {
        let levels = state.minigame_upgrades.get(&def.id).map_or(0, |u| u.level.saturating_sub(1));
        for _ in 0..levels {
            apply_minigame_effect(&catalog.tuning, state, &def.effect);
        }
    }
}

/// Rebuild a game from a blob. Entries naming ids the catalog no longer
/// has are skipped.
pub fn apply_save(catalog: &Catalog, save: &GameSave) -> GameState {
    let mut state = GameState::new(catalog);
    state.balance = save.balance;

    for (id, p) in &save.producers {
        let Some(def) = catalog.producer(id) else {
            warn!("save names unknown crew type {id:?}; skipped");
            continue;
        };
        let level = p.level.max(1);
        let entry = state
            .producers
            .entry(id.clone())
            .or_insert_with(|| ProducerState::new(def));
        entry.quantity = p.quantity;
        entry.level = level;
        entry.next_hire_cost = p
            .next_hire_cost
            .unwrap_or_else(|| cost_after(def.initial_hire_cost, def.hire_cost_growth, p.quantity));
        entry.next_upgrade_cost = p
            .next_upgrade_cost
            .unwrap_or_else(|| cost_after(def.base_upgrade_cost, def.upgrade_cost_growth, level - 1));

        if let (true, Some(interval_ms), Some(next_collection_at)) =
            (p.quantity > 0, p.interval_ms, p.next_collection_at)
        {
            if interval_ms > 0.0 {
                state.timers.insert(
                    id.clone(),
                    ProducerTimer {
                        interval_ms,
                        next_collection_at,
                    },
                );
            }
        }
    }

    for id in &save.purchased_upgrades {
        if catalog.global_upgrade(id).is_some() {
            state.purchased_upgrades.insert(id.clone());
        } else {
            warn!("save names unknown research {id:?}; skipped");
        }
    }
    state.global_multiplier = save.global_multiplier.unwrap_or_else(|| {
        state
            .purchased_upgrades
            .iter()
            .filter_map(|id| catalog.global_upgrade(id)?.income_multiplier_increment)
            .fold(1.0, |m, inc| m * (1.0 + inc))
    });

    for (id, t) in &save.minigame_upgrades {
        let Some(def) = catalog.minigame_upgrade(id) else {
            warn!("save names unknown tackle upgrade {id:?}; skipped");
            continue;
        };
        let level = t.level.max(1);
        state.minigame_upgrades.insert(
            id.clone(),
            MinigameUpgradeState {
                level,
                next_cost: t
                    .next_cost
                    .unwrap_or_else(|| cost_after(def.base_cost, def.cost_growth, level - 1)),
            },
        );
    }

    derive_parameters(catalog, &mut state);
    if let Some(params) = &save.minigame {
        state.minigame = params.clone();
    }
    if let Some(b) = &save.booster {
        state.booster = BoosterState {
            chance: b.chance,
            duration_ms: b.duration_ms,
            spawn_interval_ms: b.spawn_interval_ms,
            max_targets_multiplier: b.max_targets_multiplier,
            effect: b.effect,
        };
    }
    if let Some(n) = &save.auto_net {
        state.auto_net = AutoNetState {
            catch_amount: n.catch_amount,
            interval_ms: n.interval_ms,
        };
    }
    if let Some(s) = &save.market_surge {
        state.market_surge = MarketSurgeState {
            chance: s.chance,
            duration_ms: s.duration_ms,
            multiplier: s.multiplier,
            effect: s.effect,
        };
    }

    state.stats = save.stats.clone();
    state.last_save_timestamp = save.last_save_timestamp;
    state
}

/// Read and version-check the blob without touching the store.
pub fn read_save(store: &impl PersistentStore) -> Result<Option<SaveData>, LoadError> {
    let Some(json) = store.get(STORAGE_KEY)? else {
        return Ok(None);
    };
    let data: SaveData = serde_json::from_str(&json)?;
    if data.version < MIN_COMPATIBLE_VERSION {
        return Err(LoadError::Incompatible {
            saved: data.version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    Ok(Some(data))
}

/// Load the saved game, if any. Corrupt or incompatible blobs are deleted
/// and treated as no save.
pub fn load_game(store: &mut impl PersistentStore, catalog: &Catalog) -> Option<GameState> {
    match read_save(&*store) {
        Ok(Some(data)) => {
            if data.version < SAVE_VERSION {
                info!("migrating save from v{} to v{}", data.version, SAVE_VERSION);
            }
            Some(apply_save(catalog, &data.game))
        }
        Ok(None) => None,
        Err(LoadError::Store(e)) => {
            warn!("could not read save: {e}");
            None
        }
        Err(e) => {
            warn!("{e}; starting a new game");
            if let Err(e) = store.remove(STORAGE_KEY) {
                warn!("could not discard bad save: {e}");
            }
            None
        }
    }
}

/// Write the game, stamping `now` as the save time.
pub fn save_game(store: &mut impl PersistentStore, state: &GameState, now: f64) -> Result<(), StoreError> {
    let json = serde_json::to_string(&extract_save(state, now)).map_err(|e| StoreError::Io(e.to_string()))?;
    store.set(STORAGE_KEY, &json)
}

pub fn delete_save(store: &mut impl PersistentStore) -> Result<(), StoreError> {
    store.remove(STORAGE_KEY)
}
