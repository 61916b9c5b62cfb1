//! Fish World Tycoon rendering: header, pond, effect strip, and the tabbed
//! shop panel. Everything clickable registers itself while it is drawn.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph};
use ratzilla::ratatui::Frame;

use crate::actions::*;
use crate::app::{App, Tab, Tone};
use crate::engine::Snapshot;
use crate::env::{Clock, PersistentStore, Random};
use crate::format::{format_number, format_seconds};
use crate::input::{is_narrow_layout, ClickState};
use crate::state::Target;
use crate::widgets::{ClickableList, TabBar};

/// Fish younger than this much of their lifetime left start to fade.
const FADE_MS: f64 = 1_500.0;
/// Sizes from here up draw the long sprite.
const BIG_FISH: u32 = 33;
const BAR_WIDTH: usize = 10;

pub fn render<C: Clock, R: Random, S: PersistentStore>(
    app: &App<C, R, S>,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let snap = app.engine.snapshot();
    let narrow = is_narrow_layout(area.width);

    let effect_lines = effect_lines(&snap);
    let effect_height = if effect_lines.is_empty() { 0 } else { effect_lines.len() as u16 + 2 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(effect_height),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(&snap, f, chunks[0], narrow);
    if effect_height > 0 {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Effects ");
        f.render_widget(Paragraph::new(effect_lines).block(block), chunks[1]);
    }

    let body = if narrow {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(12), Constraint::Min(6)])
            .split(chunks[2])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2])
    };
    render_pond(app, &snap, f, body[0], click_state);
    render_panel(app, &snap, f, body[1], narrow, click_state);
    render_footer(app, f, chunks[3]);
}

fn render_header(snap: &Snapshot, f: &mut Frame, area: Rect, narrow: bool) {
    let surging = snap.effective_multiplier > snap.base_multiplier;
    let mult_style = if surging {
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let mut spans = vec![
        Span::styled(
            format!("{} fish", format_number(snap.balance.floor())),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("+{}/s", format_number(snap.fish_per_second)),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(format!("x{:.2}", snap.effective_multiplier), mult_style),
    ];
    if surging && !narrow {
        spans.push(Span::styled(" SURGE", mult_style));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(Span::styled(
            " Fish World Tycoon ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn effect_lines(snap: &Snapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for effect in snap.effects.iter().filter(|e| e.enabled) {
        let line = match effect.remaining_ms {
            Some(ms) if effect.active => Line::from(vec![
                Span::styled(
                    format!("{}: ", effect.kind.label()),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("ACTIVE {}", format_seconds(ms)),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                ),
            ]),
            _ => Line::from(Span::styled(
                format!("{}: waiting ({:.1}%/s)", effect.kind.label(), effect.chance * 100.0),
                Style::default().fg(Color::DarkGray),
            )),
        };
        lines.push(line);
    }
    if let Some(net) = &snap.auto_net {
        lines.push(Line::from(Span::styled(
            format!(
                "Trawling Net: +{} every {}",
                format_number(net.fish_per_haul),
                format_seconds(net.interval_ms)
            ),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines
}

fn fish_sprite(target: &Target) -> &'static str {
    match (target.critical, target.size >= BIG_FISH) {
        (true, _) => "><*>",
        (false, true) => "><(('>",
        (false, false) => "><>",
    }
}

/// Top-left cell of a sprite `width` wide placed at the target's position.
fn sprite_origin(inner: Rect, target: &Target, width: u16) -> (u16, u16) {
    let span_x = inner.width.saturating_sub(width) as f64;
    let span_y = inner.height.saturating_sub(1) as f64;
    let x = inner.x + (target.x_pct / 100.0 * span_x).round() as u16;
    let y = inner.y + (target.y_pct / 100.0 * span_y).round() as u16;
    (x, y)
}

fn render_pond<C: Clock, R: Random, S: PersistentStore>(
    app: &App<C, R, S>,
    snap: &Snapshot,
    f: &mut Frame,
    area: Rect,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(format!(" Pond {}/{} ", snap.targets.len(), snap.pond.max_targets));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if snap.targets.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            "~ ~ ~  waiting for a bite  ~ ~ ~",
            Style::default().fg(Color::DarkGray),
        )));
        let row = Rect::new(inner.x + 1, inner.y + inner.height / 2, inner.width.saturating_sub(1), 1);
        if inner.height > 0 {
            f.render_widget(hint, row);
        }
        return;
    }

    let mut cs = click_state.borrow_mut();
    for target in &snap.targets {
        let sprite = fish_sprite(target);
        let width = sprite.chars().count() as u16;
        if inner.width < width || inner.height == 0 {
            break;
        }
        let (x, y) = sprite_origin(inner, target, width);

        let left = snap.pond.lifetime_ms - (snap.now - target.spawned_at);
        let style = if target.critical {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if left < FADE_MS {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        f.render_widget(
            Paragraph::new(Span::styled(sprite, style)),
            Rect::new(x, y, width, 1),
        );

        // One spare cell on each side makes small sprites easier to tap.
        let hit_x = x.saturating_sub(1).max(inner.x);
        let hit_w = (width + 2).min(inner.x + inner.width - hit_x);
        cs.add_fish_target(Rect::new(hit_x, y, hit_w, 1), target.id);
    }
    drop(cs);

    for splash in &app.splashes {
        let text = format!("+{}", format_number(splash.outcome.credited));
        let width = (text.chars().count() as u16).min(inner.width);
        let probe = Target {
            id: splash.outcome.target_id,
            x_pct: splash.outcome.x_pct,
            y_pct: splash.outcome.y_pct,
            size: 0,
            spawned_at: 0.0,
            value: 0,
            critical: splash.outcome.critical,
        };
        let (x, y) = sprite_origin(inner, &probe, width);
        // Drift up one row halfway through.
        let y = if snap.now - splash.shown_at > 600.0 { y.saturating_sub(1).max(inner.y) } else { y };
        let color = if splash.outcome.critical { Color::Magenta } else { Color::Yellow };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))),
            Rect::new(x, y, width, 1),
        );
    }
}

fn render_panel<C: Clock, R: Random, S: PersistentStore>(
    app: &App<C, R, S>,
    snap: &Snapshot,
    f: &mut Frame,
    area: Rect,
    narrow: bool,
    click_state: &Rc<RefCell<ClickState>>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let tab_style = |tab: Tab| -> Style {
        if tab == app.tab {
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        }
    };
    let mut bar = TabBar::new("│").block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    for tab in Tab::ALL {
        bar = bar.tab(tab.label(), tab_style(tab), tab.action_id());
    }
    bar.render(f, chunks[0], &mut click_state.borrow_mut());

    let cl = match app.tab {
        Tab::Crew => crew_list(snap, narrow),
        Tab::Research => research_list(snap, narrow),
        Tab::Tackle => tackle_list(snap, narrow),
        Tab::Stats => stats_list(snap, app.reset_armed),
    };

    let content = chunks[1];
    cl.register_targets(content, &mut click_state.borrow_mut(), 1, 1, 0, 0);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.tab.label()));
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), content);
}

fn cost_style(affordable: bool) -> Style {
    if affordable {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn progress_bar(progress: f64) -> String {
    let filled = ((progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "▰".repeat(filled), "▱".repeat(BAR_WIDTH - filled))
}

fn crew_list(snap: &Snapshot, narrow: bool) -> ClickableList<'static> {
    let mut cl = ClickableList::new();
    for (i, row) in snap.producers.iter().enumerate() {
        let hire_key = char::from(b'1' + i as u8);
        let train_key = char::from(b'a' + i as u8);

        cl.push_clickable(
            Line::from(vec![
                Span::styled(format!(" [{}] ", hire_key), cost_style(row.can_hire)),
                Span::styled(
                    format!("{} x{}", row.name, row.quantity),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  hire {}", format_number(row.next_hire_cost)),
                    cost_style(row.can_hire),
                ),
            ]),
            HIRE_BASE + i as u16,
        );

        let mut detail = vec![
            Span::styled(format!("     [{}] ", train_key), cost_style(row.can_upgrade)),
            Span::styled(
                format!("Lv{} train {}", row.level, format_number(row.next_upgrade_cost)),
                cost_style(row.can_upgrade),
            ),
        ];
        if row.quantity > 0 {
            detail.push(Span::raw("  "));
            detail.push(Span::styled(progress_bar(row.progress), Style::default().fg(Color::Blue)));
            if let (false, Some(interval)) = (narrow, row.interval_ms) {
                detail.push(Span::styled(
                    format!(" {}/s every {}", format_number(row.fish_per_second), format_seconds(interval)),
                    Style::default().fg(Color::Green),
                ));
            }
        }
        cl.push_clickable(Line::from(detail), UPGRADE_CREW_BASE + i as u16);
        if !narrow && row.quantity == 0 {
            cl.push(Line::from(Span::styled(
                format!("     {}", row.description),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    cl
}

fn research_list(snap: &Snapshot, narrow: bool) -> ClickableList<'static> {
    let mut cl = ClickableList::new();
    for (i, row) in snap.research.iter().enumerate() {
        let line = if row.purchased {
            Line::from(Span::styled(
                format!("  ✓  {}", row.name),
                Style::default().fg(Color::Green),
            ))
        } else {
            Line::from(vec![
                Span::styled(format!(" [{}] ", i + 1), cost_style(row.affordable)),
                Span::styled(row.name.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", format_number(row.cost)), cost_style(row.affordable)),
            ])
        };
        cl.push_clickable(line, RESEARCH_BASE + i as u16);
        if !narrow && !row.purchased {
            cl.push(Line::from(Span::styled(
                format!("     {}", row.description),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    cl
}

fn tackle_list(snap: &Snapshot, narrow: bool) -> ClickableList<'static> {
    let mut cl = ClickableList::new();
    for (i, row) in snap.tackle.iter().enumerate() {
        let status = if row.locked {
            Span::styled("  locked", Style::default().fg(Color::Red))
        } else if row.maxed {
            Span::styled("  MAX", Style::default().fg(Color::Green))
        } else {
            Span::styled(format!("  {}", format_number(row.next_cost)), cost_style(row.affordable))
        };
        let level = match row.max_level {
            Some(max) => format!(" Lv{}/{}", row.level, max),
            None => format!(" Lv{}", row.level),
        };
        cl.push_clickable(
            Line::from(vec![
                Span::styled(format!(" [{}] ", i + 1), cost_style(row.affordable)),
                Span::styled(row.name.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
                Span::styled(level, Style::default().fg(Color::Cyan)),
                status,
            ]),
            TACKLE_BASE + i as u16,
        );
        if !narrow {
            cl.push(Line::from(Span::styled(
                format!("     {} ({})", row.description, row.effect),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    cl
}

fn stats_list(snap: &Snapshot, reset_armed: bool) -> ClickableList<'static> {
    let s = &snap.stats;
    let p = &snap.pond;
    let label = Style::default().fg(Color::Gray);
    let value = Style::default().fg(Color::White);
    let stat = |name: &str, v: String| {
        Line::from(vec![
            Span::styled(format!(" {:<20}", name), label),
            Span::styled(v, value),
        ])
    };

    let mut cl = ClickableList::new();
    cl.push(stat("Fish earned", format_number(s.fish_earned_all_time)));
    cl.push(stat("Fish spent", format_number(s.fish_spent)));
    cl.push(stat("  from crews", format_number(s.fish_from_crews)));
    cl.push(stat("  from the pond", format_number(s.fish_from_minigame)));
    cl.push(stat("  from the net", format_number(s.fish_from_auto_net)));
    cl.push(stat("  while away", format_number(s.fish_from_offline)));
    cl.push(stat("Crew hired", snap.crew_hired.to_string()));
    cl.push(stat("Fish caught", format!("{} ({} critical)", s.targets_caught, s.critical_catches)));
    cl.push(stat(
        "Frenzies / surges",
        format!("{} / {}", s.booster_activations, s.surge_activations),
    ));
    cl.push(stat("Multiplier", format!("x{:.3}", snap.base_multiplier)));
    cl.push(Line::from(""));
    cl.push(stat("Pond size", p.max_targets.to_string()));
    cl.push(stat("Fish linger", format_seconds(p.lifetime_ms)));
    cl.push(stat("Fish value", p.base_value.to_string()));
    cl.push(stat("Critical chance", format!("{:.1}%", p.critical_chance * 100.0)));
    cl.push(stat(
        "Spawn every",
        format!("{}-{}", format_seconds(p.min_spawn_ms), format_seconds(p.max_spawn_ms)),
    ));
    cl.push(Line::from(""));

    let reset_text = if reset_armed { " [X] Press again to wipe everything" } else { " [X] Reset game" };
    cl.push_clickable(
        Line::from(Span::styled(
            reset_text,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        RESET,
    );
    cl
}

fn render_footer<C: Clock, R: Random, S: PersistentStore>(app: &App<C, R, S>, f: &mut Frame, area: Rect) {
    let line = match &app.notice {
        Some(notice) => {
            let color = match notice.tone {
                Tone::Info => Color::Cyan,
                Tone::Good => Color::Green,
                Tone::Bad => Color::Red,
            };
            Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            "[1-9] buy  [a-e] train  [f] catch  [Tab] next tab  [X] reset",
            Style::default().fg(Color::DarkGray),
        )),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    f.render_widget(Paragraph::new(line).block(block), area);
}
