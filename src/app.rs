//! The player-facing shell around the engine: the open tab, the status
//! line, catch splashes, and the mapping from keys and clicks to commands.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::actions::*;
use crate::economy::Rejection;
use crate::engine::Tycoon;
use crate::env::{Clock, PersistentStore, Random};
use crate::format::{format_number, format_seconds};
use crate::input::{ClickState, InputEvent};
use crate::minigame::CatchOutcome;
use crate::render;

/// How long a status message stays up.
const NOTICE_MS: f64 = 4_000.0;
/// How long a "+N" splash floats over a caught fish.
const SPLASH_MS: f64 = 1_200.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Crew,
    Research,
    Tackle,
    Stats,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Crew, Tab::Research, Tab::Tackle, Tab::Stats];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Crew => "Crew",
            Tab::Research => "Research",
            Tab::Tackle => "Tackle",
            Tab::Stats => "Stats",
        }
    }

    pub fn action_id(self) -> u16 {
        match self {
            Tab::Crew => TAB_CREW,
            Tab::Research => TAB_RESEARCH,
            Tab::Tackle => TAB_TACKLE,
            Tab::Stats => TAB_STATS,
        }
    }

    fn from_action(id: u16) -> Option<Tab> {
        Tab::ALL.into_iter().find(|t| t.action_id() == id)
    }

    fn next(self) -> Tab {
        match self {
            Tab::Crew => Tab::Research,
            Tab::Research => Tab::Tackle,
            Tab::Tackle => Tab::Stats,
            Tab::Stats => Tab::Crew,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Good,
    Bad,
}

#[derive(Clone, Debug)]
pub struct Notice {
    pub text: String,
    pub tone: Tone,
    pub shown_at: f64,
}

#[derive(Clone, Debug)]
pub struct Splash {
    pub outcome: CatchOutcome,
    pub shown_at: f64,
}

pub struct App<C, R, S> {
    pub engine: Tycoon<C, R, S>,
    pub tab: Tab,
    pub notice: Option<Notice>,
    pub splashes: Vec<Splash>,
    /// The first X press arms a reset, the second one performs it.
    pub reset_armed: bool,
}

impl<C: Clock, R: Random, S: PersistentStore> App<C, R, S> {
    pub fn new(engine: Tycoon<C, R, S>) -> Self {
        Self {
            engine,
            tab: Tab::Crew,
            notice: None,
            splashes: Vec::new(),
            reset_armed: false,
        }
    }

    /// Boot the engine and greet the player with what the crew caught
    /// while the game was closed.
    pub fn boot(&mut self) {
        let Some(report) = self.engine.boot() else {
            return;
        };
        if report.fish_earned > 0.0 {
            let mut text = format!(
                "Welcome back! Your crew caught {} fish in {}.",
                format_number(report.fish_earned),
                format_seconds(report.elapsed_ms)
            );
            if report.capped {
                text.push_str(" (offline time capped)");
            }
            self.notify(text, Tone::Info);
        }
    }

    /// Run whatever timers are due and age out transient messages.
    pub fn tick(&mut self) -> usize {
        let fired = self.engine.advance();
        let now = self.engine.now();
        if self.notice.as_ref().is_some_and(|n| now - n.shown_at >= NOTICE_MS) {
            self.notice = None;
        }
        self.splashes.retain(|s| now - s.shown_at < SPLASH_MS);
        fired
    }

    pub fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(self, f, area, click_state);
    }

    /// Returns true if the event did something.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        let arms_reset = matches!(event, InputEvent::Key('X') | InputEvent::Click(RESET));
        if !arms_reset {
            self.reset_armed = false;
        }

        match *event {
            InputEvent::Key(c) => self.handle_key(c),
            InputEvent::Click(id) => self.handle_click(id),
            InputEvent::Catch(id) => {
                self.catch(id);
                true
            }
        }
    }

    fn handle_key(&mut self, key: char) -> bool {
        match key {
            '\t' | 'n' => {
                self.tab = self.tab.next();
                true
            }
            'f' => match self.engine.state().targets.first().map(|t| t.id) {
                Some(id) => {
                    self.catch(id);
                    true
                }
                None => false,
            },
            'X' => {
                self.request_reset();
                true
            }
            '1'..='9' => {
                let idx = (key as u8 - b'1') as usize;
                match self.tab {
                    Tab::Crew => self.hire(idx),
                    Tab::Research => self.research(idx),
                    Tab::Tackle => self.tackle(idx),
                    Tab::Stats => false,
                }
            }
            'a'..='e' if self.tab == Tab::Crew => self.upgrade_crew((key as u8 - b'a') as usize),
            _ => false,
        }
    }

    fn handle_click(&mut self, id: u16) -> bool {
        if let Some(tab) = Tab::from_action(id) {
            self.tab = tab;
            return true;
        }
        match id {
            RESET => {
                self.request_reset();
                true
            }
            _ if (HIRE_BASE..UPGRADE_CREW_BASE).contains(&id) => self.hire((id - HIRE_BASE) as usize),
            _ if (UPGRADE_CREW_BASE..RESEARCH_BASE).contains(&id) => {
                self.upgrade_crew((id - UPGRADE_CREW_BASE) as usize)
            }
            _ if (RESEARCH_BASE..TACKLE_BASE).contains(&id) => self.research((id - RESEARCH_BASE) as usize),
            _ if (TACKLE_BASE..RESET).contains(&id) => self.tackle((id - TACKLE_BASE) as usize),
            _ => false,
        }
    }

    fn notify(&mut self, text: impl Into<String>, tone: Tone) {
        self.notice = Some(Notice {
            text: text.into(),
            tone,
            shown_at: self.engine.now(),
        });
    }

    fn report(&mut self, result: Result<String, Rejection>) {
        match result {
            Ok(text) => self.notify(text, Tone::Good),
            Err(rejection) => self.notify(rejection.to_string(), Tone::Bad),
        }
    }

    fn hire(&mut self, idx: usize) -> bool {
        let Some(def) = self.engine.catalog().producers.get(idx) else {
            return false;
        };
        let (id, name) = (def.id.clone(), def.name.clone());
        let result = self.engine.hire(&id).map(|()| format!("Hired a {}.", name));
        self.report(result);
        true
    }

    fn upgrade_crew(&mut self, idx: usize) -> bool {
        let Some(def) = self.engine.catalog().producers.get(idx) else {
            return false;
        };
        let (id, name) = (def.id.clone(), def.name.clone());
        let result = self.engine.upgrade_crew(&id).map(|()| {
            let level = self.engine.state().producers.get(&id).map_or(1, |p| p.level);
            format!("{} crews trained to level {}.", name, level)
        });
        self.report(result);
        true
    }

    fn research(&mut self, idx: usize) -> bool {
        let Some(def) = self.engine.catalog().global_upgrades.get(idx) else {
            return false;
        };
        let (id, name) = (def.id.clone(), def.name.clone());
        let result = self
            .engine
            .purchase_global_upgrade(&id)
            .map(|()| format!("Researched {}.", name));
        self.report(result);
        true
    }

    fn tackle(&mut self, idx: usize) -> bool {
        let Some(def) = self.engine.catalog().minigame_upgrades.get(idx) else {
            return false;
        };
        let (id, name) = (def.id.clone(), def.name.clone());
        let result = self
            .engine
            .purchase_minigame_upgrade(&id)
            .map(|level| format!("{} is now level {}.", name, level));
        self.report(result);
        true
    }

    /// A fish that already swam off is ignored without a message.
    fn catch(&mut self, target_id: u64) {
        let Ok(outcome) = self.engine.catch_target(target_id) else {
            return;
        };
        let now = self.engine.now();
        if outcome.critical {
            self.notify(
                format!("Critical catch! +{} fish", format_number(outcome.credited)),
                Tone::Good,
            );
        }
        self.splashes.push(Splash { outcome, shown_at: now });
    }

    fn request_reset(&mut self) {
        if !self.reset_armed {
            self.reset_armed = true;
            self.notify("Press X again to wipe your save and start over.", Tone::Bad);
            return;
        }
        self.reset_armed = false;
        self.engine.reset_game();
        self.tab = Tab::Crew;
        self.splashes.clear();
        self.notify("Started a new game.", Tone::Info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::env::{ManualClock, MemoryStore, ScriptedRandom};
    use crate::save::STORAGE_KEY;
    use crate::state::Target;

    const T0: f64 = 1_700_000_000_000.0;

    type TestApp = App<ManualClock, ScriptedRandom, MemoryStore>;

    fn app() -> (TestApp, ManualClock, MemoryStore) {
        let clock = ManualClock::new(T0);
        let store = MemoryStore::new();
        let engine = Tycoon::new(
            Catalog::standard(),
            clock.clone(),
            ScriptedRandom::new(&[0.9]),
            store.clone(),
        );
        let mut app = App::new(engine);
        app.boot();
        (app, clock, store)
    }

    fn key(app: &mut TestApp, c: char) -> bool {
        app.handle_input(&InputEvent::Key(c))
    }

    #[test]
    fn tab_key_cycles_tabs() {
        let (mut app, _, _) = app();
        assert_eq!(app.tab, Tab::Crew);
        key(&mut app, '\t');
        assert_eq!(app.tab, Tab::Research);
        key(&mut app, 'n');
        key(&mut app, 'n');
        assert_eq!(app.tab, Tab::Stats);
        key(&mut app, '\t');
        assert_eq!(app.tab, Tab::Crew);
    }

    #[test]
    fn tab_click_switches_tab() {
        let (mut app, _, _) = app();
        assert!(app.handle_input(&InputEvent::Click(TAB_TACKLE)));
        assert_eq!(app.tab, Tab::Tackle);
    }

    #[test]
    fn digit_hires_in_crew_tab() {
        let (mut app, _, _) = app();
        assert!(key(&mut app, '1'));
        assert_eq!(app.engine.state().producers["novice_fisher"].quantity, 1);
        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.tone, Tone::Good);
        assert!(notice.text.contains("Novice Fisher"));
    }

    #[test]
    fn rejection_becomes_bad_notice() {
        let (mut app, _, _) = app();
        key(&mut app, '4');
        let notice = app.notice.clone().unwrap();
        assert_eq!(notice.tone, Tone::Bad);
        assert!(notice.text.starts_with("Not enough fish!"));
        assert_eq!(app.engine.state().producers["deep_sea_trawler"].quantity, 0);
    }

    #[test]
    fn letters_upgrade_crew_only_in_crew_tab() {
        let (mut app, _, _) = app();
        app.engine.state_mut().balance = 1_000.0;
        key(&mut app, '1');
        assert!(key(&mut app, 'a'));
        assert_eq!(app.engine.state().producers["novice_fisher"].level, 2);

        key(&mut app, '\t');
        assert!(!key(&mut app, 'a'));
    }

    #[test]
    fn click_ids_map_to_commands() {
        let (mut app, _, _) = app();
        app.engine.state_mut().balance = 1_000.0;
        app.handle_input(&InputEvent::Click(HIRE_BASE));
        assert_eq!(app.engine.state().producers["novice_fisher"].quantity, 1);
        app.handle_input(&InputEvent::Click(UPGRADE_CREW_BASE));
        assert_eq!(app.engine.state().producers["novice_fisher"].level, 2);
        assert!(!app.handle_input(&InputEvent::Click(HIRE_BASE + 40)));
        assert!(!app.handle_input(&InputEvent::Click(5)));
    }

    #[test]
    fn research_and_tackle_rows_buy_by_index() {
        let (mut app, _, _) = app();
        key(&mut app, '\t');
        key(&mut app, '1');
        assert_eq!(app.notice.as_ref().unwrap().tone, Tone::Bad);
        assert!(!app.engine.state().is_purchased("sharper_hooks"));

        app.handle_input(&InputEvent::Click(TACKLE_BASE + 3));
        assert_eq!(app.notice.as_ref().unwrap().tone, Tone::Bad);
        assert!(!key(&mut app, '9'));
    }

    #[test]
    fn catching_fish_pays_and_splashes() {
        let (mut app, _, _) = app();
        let before = app.engine.state().balance;
        push_fish(&mut app, 5, 3);
        assert!(app.handle_input(&InputEvent::Catch(5)));
        assert!((app.engine.state().balance - before - 3.0).abs() < 1e-9);
        assert_eq!(app.splashes.len(), 1);

        // second click on the same fish: nothing happens, no message
        app.notice = None;
        app.handle_input(&InputEvent::Catch(5));
        assert!((app.engine.state().balance - before - 3.0).abs() < 1e-9);
        assert!(app.notice.is_none());
    }

    #[test]
    fn f_catches_the_oldest_fish() {
        let (mut app, _, _) = app();
        push_fish(&mut app, 8, 1);
        push_fish(&mut app, 9, 1);
        assert!(key(&mut app, 'f'));
        let ids: Vec<u64> = app.engine.state().targets.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![9]);
    }

    #[test]
    fn f_with_empty_pond_does_nothing() {
        let (mut app, _, _) = app();
        assert!(!key(&mut app, 'f'));
    }

    #[test]
    fn reset_needs_two_presses_in_a_row() {
        let (mut app, _, store) = app();
        key(&mut app, '1');
        key(&mut app, 'X');
        assert!(app.reset_armed);
        key(&mut app, '\t');
        assert!(!app.reset_armed);
        key(&mut app, 'X');
        app.handle_input(&InputEvent::Click(RESET));
        assert_eq!(app.engine.state().producers["novice_fisher"].quantity, 0);
        assert_eq!(app.tab, Tab::Crew);
        assert!(store.peek(STORAGE_KEY).is_none());
    }

    #[test]
    fn notices_and_splashes_age_out() {
        let (mut app, clock, _) = app();
        push_fish(&mut app, 5, 1);
        app.handle_input(&InputEvent::Catch(5));
        key(&mut app, '4');
        clock.advance(SPLASH_MS);
        app.tick();
        assert!(app.splashes.is_empty());
        assert!(app.notice.is_some());
        clock.advance(NOTICE_MS);
        app.tick();
        assert!(app.notice.is_none());
    }

    #[test]
    fn welcome_back_notice_after_offline_time() {
        let clock = ManualClock::new(T0);
        let store = MemoryStore::new();
        {
            let engine = Tycoon::new(Catalog::standard(), clock.clone(), ScriptedRandom::new(&[0.9]), store.clone());
            let mut app = App::new(engine);
            app.boot();
            key(&mut app, '1');
            app.engine.save();
        }
        clock.advance(60_000.0);
        let engine = Tycoon::new(Catalog::standard(), clock.clone(), ScriptedRandom::new(&[0.9]), store.clone());
        let mut app = App::new(engine);
        app.boot();
        let notice = app.notice.unwrap();
        assert_eq!(notice.tone, Tone::Info);
        assert!(notice.text.starts_with("Welcome back!"));
    }

    fn push_fish(app: &mut TestApp, id: u64, value: u64) {
        let now = app.engine.now();
        app.engine.state_mut().targets.push(Target {
            id,
            x_pct: 50.0,
            y_pct: 50.0,
            size: 30,
            spawned_at: now,
            value,
            critical: false,
        });
    }
}
