/// Fish World Tycoon static definitions: crews, research upgrades, tackle
/// upgrades, and the tuning constants the engine runs on.
///
/// Everything here is immutable once built. The engine receives a `Catalog`
/// at construction and only ever reads from it.

use serde::{Deserialize, Serialize};

use crate::state::MinigameParams;

/// A hireable crew type.
#[derive(Clone, Debug, PartialEq)]
pub struct ProducerTypeDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub initial_hire_cost: f64,
    /// Multiplicative factor applied to the hire cost after every hire.
    pub hire_cost_growth: f64,
    /// Fish collected per cycle, for the whole crew, at level 1.
    pub base_collection_amount: f64,
    /// Cycle length when exactly one unit is owned.
    pub base_collection_time_ms: f64,
    /// Floor for the cycle length no matter how many units are owned.
    pub min_collection_time_ms: f64,
    /// Cost of the L1 → L2 crew upgrade.
    pub base_upgrade_cost: f64,
    pub upgrade_cost_growth: f64,
}

/// Booster Bait parameters seeded into state on purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct BoosterDef {
    pub chance: f64,
    pub duration_ms: f64,
    pub spawn_interval_ms: f64,
    pub max_targets_multiplier: f64,
}

/// Automated Trawling Net parameters seeded into state on purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct AutoNetDef {
    pub catch_amount: u32,
    pub interval_ms: f64,
}

/// Market Analysis parameters seeded into state on purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct MarketSurgeDef {
    pub chance: f64,
    pub duration_ms: f64,
    pub multiplier: f64,
}

/// Structured effect carried by a research upgrade, on top of (or instead
/// of) a flat income multiplier.
#[derive(Clone, Debug, PartialEq)]
pub enum GlobalEffect {
    Booster(BoosterDef),
    AutoNet(AutoNetDef),
    MarketSurge(MarketSurgeDef),
}

/// A one-time research upgrade.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalUpgradeDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: f64,
    /// Composes as `multiplier *= 1 + increment`.
    pub income_multiplier_increment: Option<f64>,
    pub effect: Option<GlobalEffect>,
}

/// Per-level delta applied by a tackle (minigame) upgrade.
#[derive(Clone, Debug, PartialEq)]
pub enum MinigameEffect {
    MaxTargets(u32),
    LifetimeMs(f64),
    BaseValue(u64),
    CriticalChance(f64),
    /// Subtracted from both spawn bounds.
    SpawnCooldownMs(f64),
    BoosterChance(f64),
    BoosterDurationMs(f64),
    AutoNetAmount(u32),
}

impl MinigameEffect {
    /// Short description of one level's worth of effect.
    pub fn describe(&self) -> String {
        match self {
            MinigameEffect::MaxTargets(n) => format!("+{} max fish", n),
            MinigameEffect::LifetimeMs(ms) => format!("+{:.1}s lifetime", ms / 1000.0),
            MinigameEffect::BaseValue(v) => format!("+{} fish per catch", v),
            MinigameEffect::CriticalChance(c) => format!("+{:.1}% crit chance", c * 100.0),
            MinigameEffect::SpawnCooldownMs(ms) => format!("-{}ms spawn cooldown", ms),
            MinigameEffect::BoosterChance(c) => format!("+{:.1}% booster chance", c * 100.0),
            MinigameEffect::BoosterDurationMs(ms) => {
                format!("+{:.1}s booster duration", ms / 1000.0)
            }
            MinigameEffect::AutoNetAmount(n) => format!("+{} fish per haul", n),
        }
    }
}

/// A leveled tackle upgrade for the catch minigame.
#[derive(Clone, Debug, PartialEq)]
pub struct MinigameUpgradeDef {
    pub id: String,
    pub name: String,
    pub description: String,
    pub base_cost: f64,
    pub cost_growth: f64,
    pub effect: MinigameEffect,
    pub max_level: Option<u32>,
    /// Research upgrade that must be owned before this is visible.
    pub required_global_upgrade: Option<String>,
}

/// Engine constants. Partial JSON overrides are accepted; anything missing
/// keeps its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub initial_balance: f64,
    pub production_poll_ms: f64,
    pub despawn_sweep_ms: f64,
    pub effect_roll_ms: f64,
    pub autosave_debounce_ms: f64,
    pub max_offline_ms: f64,
    pub min_resume_delay_ms: f64,
    pub initial_minigame: MinigameParams,
    pub global_min_spawn_ms: f64,
    pub spawn_interval_offset_ms: f64,
    pub critical_min_multiplier: f64,
    pub critical_max_multiplier: f64,
    pub target_min_size: u32,
    pub target_max_size: u32,
    /// Keeps spawned fish fully inside the pond, in percent of its size.
    pub pond_margin_pct: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            initial_balance: 20.0,
            production_poll_ms: 250.0,
            despawn_sweep_ms: 500.0,
            effect_roll_ms: 1_000.0,
            autosave_debounce_ms: 1_000.0,
            max_offline_ms: 8.0 * 60.0 * 60.0 * 1_000.0,
            min_resume_delay_ms: 50.0,
            initial_minigame: MinigameParams::default(),
            global_min_spawn_ms: 200.0,
            spawn_interval_offset_ms: 100.0,
            critical_min_multiplier: 2.0,
            critical_max_multiplier: 5.0,
            target_min_size: 24,
            target_max_size: 40,
            pond_margin_pct: 5.0,
        }
    }
}

/// All static definitions, injected into the engine.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub producers: Vec<ProducerTypeDef>,
    pub global_upgrades: Vec<GlobalUpgradeDef>,
    pub minigame_upgrades: Vec<MinigameUpgradeDef>,
    pub tuning: Tuning,
}

fn producer(
    id: &str,
    name: &str,
    description: &str,
    costs: (f64, f64),
    collection: (f64, f64, f64),
    upgrade: (f64, f64),
) -> ProducerTypeDef {
    ProducerTypeDef {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        initial_hire_cost: costs.0,
        hire_cost_growth: costs.1,
        base_collection_amount: collection.0,
        base_collection_time_ms: collection.1,
        min_collection_time_ms: collection.2,
        base_upgrade_cost: upgrade.0,
        upgrade_cost_growth: upgrade.1,
    }
}

fn research(
    id: &str,
    name: &str,
    description: &str,
    cost: f64,
    increment: Option<f64>,
    effect: Option<GlobalEffect>,
) -> GlobalUpgradeDef {
    GlobalUpgradeDef {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        cost,
        income_multiplier_increment: increment,
        effect,
    }
}

fn tackle(
    id: &str,
    name: &str,
    description: &str,
    cost: (f64, f64),
    effect: MinigameEffect,
    max_level: Option<u32>,
    requires: Option<&str>,
) -> MinigameUpgradeDef {
    MinigameUpgradeDef {
        id: id.into(),
        name: name.into(),
        description: description.into(),
        base_cost: cost.0,
        cost_growth: cost.1,
        effect,
        max_level,
        required_global_upgrade: requires.map(String::from),
    }
}

impl Catalog {
    /// The tables the game ships with.
    pub fn standard() -> Self {
        let producers = vec![
            producer(
                "novice_fisher",
                "Novice Fisher",
                "A beginner at sea, eager to learn. Catches a few fish.",
                (20.0, 1.15),
                (5.0, 5_000.0, 250.0),
                (50.0, 1.35),
            ),
            producer(
                "seasoned_captain",
                "Seasoned Captain",
                "Knows the best spots and techniques. Hauls in a good catch.",
                (200.0, 1.2),
                (50.0, 10_000.0, 500.0),
                (300.0, 1.45),
            ),
            producer(
                "master_angler",
                "Master Angler",
                "A legend of the deep. Fish practically jump into the boat!",
                (1_000.0, 1.25),
                (375.0, 15_000.0, 1_000.0),
                (1_500.0, 1.55),
            ),
            producer(
                "deep_sea_trawler",
                "Deep Sea Trawler",
                "An industrial vessel that drags the ocean floor.",
                (10_000.0, 1.3),
                (2_400.0, 20_000.0, 2_000.0),
                (15_000.0, 1.65),
            ),
        ];

        let global_upgrades = vec![
            research(
                "sharper_hooks",
                "Sharper Hooks",
                "Improves fishing tool quality. All income +10%.",
                100.0,
                Some(0.1),
                None,
            ),
            research(
                "sonar_technology",
                "Sonar Technology",
                "Advanced fish finding. All income +25%.",
                500.0,
                Some(0.25),
                None,
            ),
            research(
                "bigger_boats",
                "Bigger Boats",
                "Larger capacity for catches. All income +50%.",
                2_000.0,
                Some(0.5),
                None,
            ),
            research(
                "booster_bait",
                "Booster Bait",
                "Occasionally whips the pond into a frenzy: more fish, faster.",
                1_500.0,
                None,
                Some(GlobalEffect::Booster(BoosterDef {
                    chance: 0.01,
                    duration_ms: 15_000.0,
                    spawn_interval_ms: 300.0,
                    max_targets_multiplier: 2.0,
                })),
            ),
            research(
                "automated_trawling_net",
                "Automated Trawling Net",
                "Hauls in pond fish on its own every few seconds.",
                3_000.0,
                None,
                Some(GlobalEffect::AutoNet(AutoNetDef {
                    catch_amount: 1,
                    interval_ms: 10_000.0,
                })),
            ),
            research(
                "market_analysis",
                "Market Analysis",
                "Spot market surges that double all income for a while.",
                5_000.0,
                None,
                Some(GlobalEffect::MarketSurge(MarketSurgeDef {
                    chance: 0.005,
                    duration_ms: 20_000.0,
                    multiplier: 2.0,
                })),
            ),
        ];

        let minigame_upgrades = vec![
            tackle(
                "more_crowded_waters",
                "More Crowded Waters",
                "More fish can swim in the pond at once.",
                (300.0, 1.5),
                MinigameEffect::MaxTargets(1),
                Some(10),
                None,
            ),
            tackle(
                "patient_fish",
                "Patient Fish",
                "Fish linger in the pond a little longer.",
                (250.0, 1.4),
                MinigameEffect::LifetimeMs(500.0),
                Some(10),
                None,
            ),
            tackle(
                "lucky_catch",
                "Lucky Catch",
                "Every fish caught is worth more.",
                (400.0, 1.6),
                MinigameEffect::BaseValue(1),
                None,
                None,
            ),
            tackle(
                "keen_eye",
                "Keen Eye",
                "Spot the big ones: higher critical catch chance.",
                (600.0, 1.5),
                MinigameEffect::CriticalChance(0.02),
                Some(10),
                None,
            ),
            tackle(
                "chum_the_water",
                "Chum the Water",
                "Fish show up more often.",
                (500.0, 1.5),
                MinigameEffect::SpawnCooldownMs(100.0),
                Some(8),
                None,
            ),
            tackle(
                "potent_bait",
                "Potent Bait",
                "Booster Bait triggers more often.",
                (800.0, 1.6),
                MinigameEffect::BoosterChance(0.005),
                Some(5),
                Some("booster_bait"),
            ),
            tackle(
                "long_lasting_bait",
                "Long-Lasting Bait",
                "Booster Bait frenzies last longer.",
                (800.0, 1.6),
                MinigameEffect::BoosterDurationMs(2_000.0),
                Some(5),
                Some("booster_bait"),
            ),
            tackle(
                "wider_nets",
                "Wider Nets",
                "The trawling net brings in more fish per haul.",
                (1_000.0, 1.7),
                MinigameEffect::AutoNetAmount(1),
                Some(10),
                Some("automated_trawling_net"),
            ),
        ];

        Self {
            producers,
            global_upgrades,
            minigame_upgrades,
            tuning: Tuning::default(),
        }
    }

    pub fn producer(&self, id: &str) -> Option<&ProducerTypeDef> {
        self.producers.iter().find(|p| p.id == id)
    }

    pub fn global_upgrade(&self, id: &str) -> Option<&GlobalUpgradeDef> {
        self.global_upgrades.iter().find(|u| u.id == id)
    }

    pub fn minigame_upgrade(&self, id: &str) -> Option<&MinigameUpgradeDef> {
        self.minigame_upgrades.iter().find(|u| u.id == id)
    }

    /// The research upgrade carrying a given kind of structured effect.
    pub fn booster_upgrade(&self) -> Option<(&GlobalUpgradeDef, &BoosterDef)> {
        self.global_upgrades.iter().find_map(|u| match &u.effect {
            Some(GlobalEffect::Booster(def)) => Some((u, def)),
            _ => None,
        })
    }

    pub fn auto_net_upgrade(&self) -> Option<(&GlobalUpgradeDef, &AutoNetDef)> {
        self.global_upgrades.iter().find_map(|u| match &u.effect {
            Some(GlobalEffect::AutoNet(def)) => Some((u, def)),
            _ => None,
        })
    }

    pub fn market_surge_upgrade(&self) -> Option<(&GlobalUpgradeDef, &MarketSurgeDef)> {
        self.global_upgrades.iter().find_map(|u| match &u.effect {
            Some(GlobalEffect::MarketSurge(def)) => Some((u, def)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ids_are_unique() {
        let catalog = Catalog::standard();
        let mut ids: Vec<&str> = catalog.producers.iter().map(|p| p.id.as_str()).collect();
        ids.extend(catalog.global_upgrades.iter().map(|u| u.id.as_str()));
        ids.extend(catalog.minigame_upgrades.iter().map(|u| u.id.as_str()));
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn gated_upgrades_reference_existing_research() {
        let catalog = Catalog::standard();
        for u in &catalog.minigame_upgrades {
            if let Some(req) = &u.required_global_upgrade {
                assert!(catalog.global_upgrade(req).is_some(), "{} gated on {}", u.id, req);
            }
        }
    }

    #[test]
    fn producer_minimum_interval_is_below_base() {
        for p in &Catalog::standard().producers {
            assert!(p.min_collection_time_ms > 0.0);
            assert!(p.min_collection_time_ms < p.base_collection_time_ms);
            assert!(p.hire_cost_growth > 1.0);
            assert!(p.upgrade_cost_growth > 1.0);
        }
    }

    #[test]
    fn effect_lookups_find_the_shipped_upgrades() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.booster_upgrade().map(|(u, _)| u.id.as_str()), Some("booster_bait"));
        assert_eq!(
            catalog.auto_net_upgrade().map(|(u, _)| u.id.as_str()),
            Some("automated_trawling_net")
        );
        assert_eq!(
            catalog.market_surge_upgrade().map(|(u, _)| u.id.as_str()),
            Some("market_analysis")
        );
    }

    #[test]
    fn unknown_id_lookup_is_none() {
        let catalog = Catalog::standard();
        assert!(catalog.producer("kraken_tamer").is_none());
        assert!(catalog.global_upgrade("kraken_tamer").is_none());
        assert!(catalog.minigame_upgrade("kraken_tamer").is_none());
    }

    #[test]
    fn tuning_partial_override_keeps_defaults() {
        let json = r#"{ "initial_balance": 500.0, "max_offline_ms": 3600000.0 }"#;
        let tuning: Tuning = serde_json::from_str(json).unwrap();
        assert!((tuning.initial_balance - 500.0).abs() < 0.001);
        assert!((tuning.max_offline_ms - 3_600_000.0).abs() < 0.001);
        assert!((tuning.production_poll_ms - 250.0).abs() < 0.001);
        assert_eq!(tuning.initial_minigame, MinigameParams::default());
    }

    #[test]
    fn describe_spawn_cooldown() {
        assert_eq!(MinigameEffect::SpawnCooldownMs(100.0).describe(), "-100ms spawn cooldown");
        assert_eq!(MinigameEffect::CriticalChance(0.02).describe(), "+2.0% crit chance");
    }
}
