mod actions;
mod app;
mod catalog;
mod economy;
mod effects;
mod engine;
mod env;
mod format;
mod input;
mod minigame;
mod production;
mod render;
mod save;
#[cfg(test)]
mod simulator;
mod state;
mod time;
mod widgets;

use std::{cell::RefCell, io, rc::Rc};

use log::{Level, LevelFilter, Log, Metadata, Record};
use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};

use app::App;
use catalog::Catalog;
use engine::Tycoon;
use env::{RngSource, SystemClock};
use input::{pixel_x_to_col, pixel_y_to_row, ClickState, InputEvent};

#[cfg(target_arch = "wasm32")]
type Store = env::LocalStorage;
#[cfg(not(target_arch = "wasm32"))]
type Store = env::MemoryStore;

/// Forwards `log` records to the browser console.
struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = js_sys::JsString::from(format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&msg),
            Level::Warn => web_sys::console::warn_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Query the grid container's bounding rect and convert a click to a cell.
fn dom_pixel_to_cell(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<(u16, u16)> {
    let window = web_sys::window()?;
    let document = window.document()?;

    // DomBackend creates a <div> as the grid container inside <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let col = pixel_x_to_col(mouse_x as f64 - rect.left(), rect.width(), cs.terminal_cols)?;
    let row = pixel_y_to_row(mouse_y as f64 - rect.top(), rect.height(), cs.terminal_rows)?;
    Some((col, row))
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let engine = Tycoon::new(
        Catalog::standard(),
        SystemClock,
        RngSource::from_entropy(),
        Store::default(),
    );
    let app = Rc::new(RefCell::new(App::new(engine)));
    app.borrow_mut().boot();

    let click_state = Rc::new(RefCell::new(ClickState::new()));
    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    // Mouse/touch click handler
    terminal.on_mouse_event({
        let app = app.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed
                || mouse_event.button != MouseButton::Left
            {
                return;
            }

            let cs = click_state.borrow();
            if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                return;
            }
            let Some((col, row)) = dom_pixel_to_cell(mouse_event.x, mouse_event.y, &cs) else {
                return;
            };
            let event = cs.resolve(col, row);
            drop(cs);

            if let Some(event) = event {
                app.borrow_mut().handle_input(&event);
            }
        }
    });

    // Keyboard handler
    terminal.on_key_event({
        let app = app.clone();
        move |key_event| {
            let event = match key_event.code {
                KeyCode::Char(c) => InputEvent::Key(c),
                KeyCode::Tab => InputEvent::Key('\t'),
                _ => return,
            };
            app.borrow_mut().handle_input(&event);
        }
    });

    terminal.draw_web({
        let click_state = click_state.clone();
        move |f| {
            let mut app = app.borrow_mut();
            app.tick();

            let size = f.area();
            {
                let mut cs = click_state.borrow_mut();
                cs.terminal_cols = size.width;
                cs.terminal_rows = size.height;
                cs.clear_targets();
            }
            app.render(f, size, &click_state);
        }
    });

    Ok(())
}
