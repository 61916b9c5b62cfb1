//! The running game: state plus the host capabilities it needs, the timer
//! list that drives it, and the command surface the UI calls.
//!
//! Everything happens on one thread. The shell calls `advance()` once per
//! frame; due timers are dispatched in order and each dispatch finishes its
//! mutation before the next one starts.

use log::{debug, info, warn};

use crate::catalog::Catalog;
use crate::economy::{self, Rejection};
use crate::effects::{self, EffectKind, Expiry};
use crate::env::{Clock, PersistentStore, Random};
use crate::minigame::{self, CatchOutcome};
use crate::production::{self, OfflineReport};
use crate::save;
use crate::state::{GameState, MinigameParams, Stats, Target};
use crate::time::{Scheduler, Task, TimerToken};

/// Tokens of the timers the engine keeps alive.
#[derive(Debug, Default)]
struct Tokens {
    production: Option<TimerToken>,
    spawn: Option<TimerToken>,
    sweep: Option<TimerToken>,
    effect_roll: Option<TimerToken>,
    auto_net: Option<TimerToken>,
    autosave: Option<TimerToken>,
    booster_expiry: Option<TimerToken>,
    surge_expiry: Option<TimerToken>,
}

impl Tokens {
    fn expiry_mut(&mut self, kind: EffectKind) -> &mut Option<TimerToken> {
        match kind {
            EffectKind::Booster => &mut self.booster_expiry,
            EffectKind::MarketSurge => &mut self.surge_expiry,
        }
    }

    /// Release every held token.
    fn take_all(&mut self) -> Vec<TimerToken> {
        let t = std::mem::take(self);
        [
            t.production,
            t.spawn,
            t.sweep,
            t.effect_roll,
            t.auto_net,
            t.autosave,
            t.booster_expiry,
            t.surge_expiry,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub struct Tycoon<C, R, S> {
    catalog: Catalog,
    clock: C,
    random: R,
    store: S,
    state: GameState,
    scheduler: Scheduler,
    tokens: Tokens,
    /// Set once `boot()` has loaded or initialised the game. Saving before
    /// that would overwrite a real save with defaults.
    hydrated: bool,
}

impl<C: Clock, R: Random, S: PersistentStore> Tycoon<C, R, S> {
    /// A fresh, not yet hydrated game. Nothing runs until `boot()`.
    pub fn new(catalog: Catalog, clock: C, random: R, store: S) -> Self {
        let state = GameState::new(&catalog);
        Self {
            catalog,
            clock,
            random,
            store,
            state,
            scheduler: Scheduler::new(),
            tokens: Tokens::default(),
            hydrated: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[cfg(test)]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Load the saved game (or start a new one), credit the time spent
    /// away, and start every timer.
    ///
    /// Returns the offline report when a save with a timestamp was found.
    pub fn boot(&mut self) -> Option<OfflineReport> {
        let now = self.clock.now_ms();
        self.scheduler.cancel_all();
        self.tokens = Tokens::default();

        let report = match save::load_game(&mut self.store, &self.catalog) {
            Some(mut state) => {
                let elapsed = state.last_save_timestamp.map(|saved| now - saved);
                let report = production::reconcile_offline(
                    &self.catalog,
                    &mut state,
                    elapsed.unwrap_or(0.0),
                    now,
                );
                self.state = state;
                if report.fish_earned > 0.0 {
                    info!(
                        "welcome back: {} fish caught in {} away{}",
                        crate::format::format_number(report.fish_earned),
                        crate::format::format_seconds(report.elapsed_ms),
                        if report.capped { " (capped)" } else { "" }
                    );
                }
                elapsed.map(|_| report)
            }
            None => {
                info!("starting a new game");
                self.state = GameState::new(&self.catalog);
                None
            }
        };

        self.start_timers(now);
        self.hydrated = true;
        // Stamp the reconciled state right away so a quick reload cannot
        // credit the same offline stretch twice.
        self.save();
        report
    }

    fn start_timers(&mut self, now: f64) {
        let tuning = &self.catalog.tuning;
        let scheduler = &mut self.scheduler;
        self.tokens.production =
            Some(scheduler.every(now, tuning.production_poll_ms, Task::ProductionTick));
        self.tokens.sweep = Some(scheduler.every(now, tuning.despawn_sweep_ms, Task::DespawnSweep));
        self.tokens.effect_roll = Some(scheduler.every(now, tuning.effect_roll_ms, Task::EffectRoll));
        self.schedule_spawn(now);
        self.sync_auto_net(now);

        for kind in EffectKind::ALL {
            let effect = effects::effect_state(&self.state, kind);
            if effect.active {
                // no saved deadline: end it on the next pump
                let remaining = effect.remaining_ms(now).unwrap_or(0.0);
                self.schedule_expiry(kind, now, remaining);
            }
        }
    }

    fn schedule_spawn(&mut self, now: f64) {
        if let Some(token) = self.tokens.spawn.take() {
            self.scheduler.cancel(token);
        }
        let params = minigame::effective_params(&self.state);
        let delay = minigame::spawn_delay(&mut self.random, &params);
        self.tokens.spawn = Some(self.scheduler.after(now, delay, Task::SpawnTarget));
    }

    fn schedule_expiry(&mut self, kind: EffectKind, now: f64, delay: f64) {
        if let Some(token) = self.tokens.expiry_mut(kind).take() {
            self.scheduler.cancel(token);
        }
        let token = self.scheduler.after(now, delay, Task::EffectExpiry(kind));
        *self.tokens.expiry_mut(kind) = Some(token);
    }

    fn sync_auto_net(&mut self, now: f64) {
        if self.tokens.auto_net.is_none() && effects::auto_net_running(&self.catalog, &self.state) {
            let period = self.state.auto_net.interval_ms;
            self.tokens.auto_net = Some(self.scheduler.every(now, period, Task::AutoNetHaul));
        }
    }

    /// Schedule a save unless one is already pending.
    fn mark_dirty(&mut self, now: f64) {
        if self.tokens.autosave.is_none() {
            let delay = self.catalog.tuning.autosave_debounce_ms;
            self.tokens.autosave = Some(self.scheduler.after(now, delay, Task::Autosave));
        }
    }

    /// Write the game to the store now. Does nothing before `boot()`.
    pub fn save(&mut self) {
        if !self.hydrated {
            debug!("save skipped: game not loaded yet");
            return;
        }
        let now = self.clock.now_ms();
        match save::save_game(&mut self.store, &self.state, now) {
            Ok(()) => self.state.last_save_timestamp = Some(now),
            Err(e) => warn!("save failed: {e}"),
        }
    }

    /// Run every timer that is due. Returns how many fired.
    pub fn advance(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut fired = 0;
        while let Some((_, task)) = self.scheduler.pop_due(now) {
            self.dispatch(task, now);
            fired += 1;
        }
        fired
    }

    fn dispatch(&mut self, task: Task, now: f64) {
        match task {
            Task::ProductionTick => {
                if production::tick(&self.catalog, &mut self.state, now) > 0.0 {
                    self.mark_dirty(now);
                }
            }
            Task::SpawnTarget => {
                self.tokens.spawn = None;
                minigame::try_spawn(&self.catalog.tuning, &mut self.state, &mut self.random, now);
                self.schedule_spawn(now);
            }
            Task::DespawnSweep => {
                let gone = minigame::sweep(&mut self.state, now);
                if gone > 0 {
                    debug!("{gone} fish swam away");
                }
            }
            Task::EffectRoll => {
                let started = effects::roll(&self.catalog, &mut self.state, &mut self.random, now);
                for kind in &started {
                    let duration = match kind {
                        EffectKind::Booster => self.state.booster.duration_ms,
                        EffectKind::MarketSurge => self.state.market_surge.duration_ms,
                    };
                    self.schedule_expiry(*kind, now, duration);
                    if *kind == EffectKind::Booster {
                        self.schedule_spawn(now);
                    }
                }
                if !started.is_empty() {
                    self.mark_dirty(now);
                }
            }
            Task::EffectExpiry(kind) => {
                *self.tokens.expiry_mut(kind) = None;
                match effects::expire(&mut self.state, kind, now) {
                    Expiry::Pending(remaining) => self.schedule_expiry(kind, now, remaining),
                    Expiry::Expired => {
                        if kind == EffectKind::Booster {
                            self.schedule_spawn(now);
                        }
                        self.mark_dirty(now);
                    }
                }
            }
            Task::AutoNetHaul => {
                if effects::auto_net_haul(&self.catalog, &mut self.state) > 0.0 {
                    self.mark_dirty(now);
                }
            }
            Task::Autosave => {
                self.tokens.autosave = None;
                self.save();
            }
        }
    }

    pub fn hire(&mut self, type_id: &str) -> Result<(), Rejection> {
        let now = self.clock.now_ms();
        economy::hire(&self.catalog, &mut self.state, type_id, now)?;
        self.mark_dirty(now);
        Ok(())
    }

    pub fn upgrade_crew(&mut self, type_id: &str) -> Result<(), Rejection> {
        let now = self.clock.now_ms();
        economy::upgrade_crew(&self.catalog, &mut self.state, type_id)?;
        self.mark_dirty(now);
        Ok(())
    }

    pub fn purchase_global_upgrade(&mut self, upgrade_id: &str) -> Result<(), Rejection> {
        let now = self.clock.now_ms();
        economy::purchase_global_upgrade(&self.catalog, &mut self.state, upgrade_id)?;
        self.sync_auto_net(now);
        self.mark_dirty(now);
        Ok(())
    }

    /// Returns the new level.
    pub fn purchase_minigame_upgrade(&mut self, upgrade_id: &str) -> Result<u32, Rejection> {
        let now = self.clock.now_ms();
        let level = economy::purchase_minigame_upgrade(&self.catalog, &mut self.state, upgrade_id)?;
        self.mark_dirty(now);
        Ok(level)
    }

    pub fn catch_target(&mut self, target_id: u64) -> Result<CatchOutcome, Rejection> {
        let now = self.clock.now_ms();
        let outcome = minigame::catch(&mut self.state, target_id, now)?;
        self.mark_dirty(now);
        Ok(outcome)
    }

    /// Wipe the save and start over from catalog defaults.
    pub fn reset_game(&mut self) {
        let now = self.clock.now_ms();
        self.scheduler.cancel_all();
        self.tokens = Tokens::default();
        if let Err(e) = save::delete_save(&mut self.store) {
            warn!("could not delete save: {e}");
        }
        self.state = GameState::new(&self.catalog);
        self.start_timers(now);
        info!("game reset");
    }

    /// Flush a pending save and stop every timer.
    pub fn shutdown(&mut self) {
        if self.tokens.autosave.is_some() {
            self.save();
        }
        for token in self.tokens.take_all() {
            self.scheduler.cancel(token);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now_ms();
        let state = &self.state;
        let catalog = &self.catalog;

        let producers = catalog
            .producers
            .iter()
            .filter_map(|def| {
                let p = state.producers.get(&def.id)?;
                let timer = state.timers.get(&def.id);
                Some(ProducerRow {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    description: def.description.clone(),
                    quantity: p.quantity,
                    level: p.level,
                    next_hire_cost: p.next_hire_cost,
                    next_upgrade_cost: p.next_upgrade_cost,
                    can_hire: state.can_afford(p.next_hire_cost),
                    can_upgrade: p.quantity > 0 && state.can_afford(p.next_upgrade_cost),
                    interval_ms: timer.map(|t| t.interval_ms),
                    progress: timer.map_or(0.0, |t| {
                        (1.0 - (t.next_collection_at - now) / t.interval_ms).clamp(0.0, 1.0)
                    }),
                    fish_per_second: production::type_fish_per_second(catalog, state, &def.id),
                })
            })
            .collect();

        let research = catalog
            .global_upgrades
            .iter()
            .map(|def| ResearchRow {
                id: def.id.clone(),
                name: def.name.clone(),
                description: def.description.clone(),
                cost: def.cost.ceil(),
                purchased: state.is_purchased(&def.id),
                affordable: state.can_afford(def.cost.ceil()),
            })
            .collect();

        let tackle = catalog
            .minigame_upgrades
            .iter()
            .filter_map(|def| {
                let u = state.minigame_upgrades.get(&def.id)?;
                Some(TackleRow {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    description: def.description.clone(),
                    effect: def.effect.describe(),
                    level: u.level,
                    next_cost: u.next_cost,
                    max_level: def.max_level,
                    maxed: def.max_level.is_some_and(|max| u.level >= max),
                    locked: !economy::is_unlocked(catalog, state, &def.id),
                    affordable: state.can_afford(u.next_cost),
                })
            })
            .collect();

        let effect_rows = EffectKind::ALL
            .iter()
            .map(|&kind| {
                let effect = effects::effect_state(state, kind);
                EffectRow {
                    kind,
                    enabled: effects::is_enabled(catalog, state, kind),
                    active: effect.active,
                    remaining_ms: effect.remaining_ms(now),
                    chance: match kind {
                        EffectKind::Booster => state.booster.chance,
                        EffectKind::MarketSurge => state.market_surge.chance,
                    },
                }
            })
            .collect();

        let auto_net = effects::auto_net_running(catalog, state).then(|| AutoNetRow {
            fish_per_haul: effects::auto_net_amount(state),
            interval_ms: state.auto_net.interval_ms,
        });

        Snapshot {
            now,
            balance: state.balance,
            fish_per_second: production::fish_per_second(catalog, state),
            base_multiplier: state.global_multiplier,
            effective_multiplier: effects::effective_multiplier(state),
            producers,
            crew_hired: state.total_crew(),
            research,
            tackle,
            pond: minigame::effective_params(state),
            effects: effect_rows,
            auto_net,
            targets: state.targets.clone(),
            stats: state.stats.clone(),
        }
    }
}

/// Read-only view of the game for the UI.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub now: f64,
    pub balance: f64,
    pub fish_per_second: f64,
    pub base_multiplier: f64,
    /// Base multiplier with a running surge applied.
    pub effective_multiplier: f64,
    pub producers: Vec<ProducerRow>,
    pub crew_hired: u32,
    pub research: Vec<ResearchRow>,
    pub tackle: Vec<TackleRow>,
    /// Pond parameters in force, booster included.
    pub pond: MinigameParams,
    pub effects: Vec<EffectRow>,
    pub auto_net: Option<AutoNetRow>,
    pub targets: Vec<Target>,
    pub stats: Stats,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducerRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub level: u32,
    pub next_hire_cost: f64,
    pub next_upgrade_cost: f64,
    pub can_hire: bool,
    pub can_upgrade: bool,
    pub interval_ms: Option<f64>,
    /// Fraction of the current cycle done, 0..=1.
    pub progress: f64,
    pub fish_per_second: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResearchRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub purchased: bool,
    pub affordable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TackleRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub effect: String,
    pub level: u32,
    pub next_cost: f64,
    pub max_level: Option<u32>,
    pub maxed: bool,
    /// Waiting on a research prerequisite.
    pub locked: bool,
    pub affordable: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectRow {
    pub kind: EffectKind,
    pub enabled: bool,
    pub active: bool,
    pub remaining_ms: Option<f64>,
    pub chance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AutoNetRow {
    pub fish_per_haul: f64,
    pub interval_ms: f64,
}
