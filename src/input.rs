//! Input plumbing: input events, click targets, and pixel to cell conversion.

use ratzilla::ratatui::layout::Rect;

use crate::actions::{FISH_BASE, FISH_SLOTS};

/// Input normalized from keyboard, mouse, and touch.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key press.
    Key(char),
    /// A click on a registered target, identified by an action ID from
    /// `crate::actions`.
    Click(u16),
    /// A click that landed on a fish, identified by target id.
    Catch(u64),
}

/// A region on screen that triggers an action when clicked.
#[derive(Debug, Clone)]
pub struct ClickTarget {
    /// Hit region in terminal cells.
    pub rect: Rect,
    pub action_id: u16,
}

/// Shared between the render loop and the mouse handler. Rebuilt every frame.
pub struct ClickState {
    pub targets: Vec<ClickTarget>,
    /// Target ids of the fish drawn this frame, indexed by slot.
    pub pond_ids: Vec<u64>,
    pub terminal_cols: u16,
    pub terminal_rows: u16,
}

impl ClickState {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            pond_ids: Vec::new(),
            terminal_cols: 0,
            terminal_rows: 0,
        }
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.pond_ids.clear();
    }

    pub fn add_click_target(&mut self, rect: Rect, action_id: u16) {
        self.targets.push(ClickTarget { rect, action_id });
    }

    /// Register a full-width target on `row`, if the row lies inside `area`.
    pub fn add_row_target(&mut self, area: Rect, row: u16, action_id: u16) {
        if row >= area.y && row < area.y + area.height {
            self.targets.push(ClickTarget {
                rect: Rect::new(area.x, row, area.width, 1),
                action_id,
            });
        }
    }

    /// Register a fish sprite. Returns false once every slot is taken.
    pub fn add_fish_target(&mut self, rect: Rect, target_id: u64) -> bool {
        let slot = self.pond_ids.len() as u16;
        if slot >= FISH_SLOTS {
            return false;
        }
        self.pond_ids.push(target_id);
        self.add_click_target(rect, FISH_BASE + slot);
        true
    }

    /// Register targets for a horizontal tab bar.
    ///
    /// `tab_widths` holds `(display_width, action_id)` for each padded label.
    /// Each target covers its label plus half of the neighbouring separators;
    /// the first and last tabs stretch to the edges of the bar.
    pub fn register_tab_targets(
        &mut self,
        tab_widths: &[(u16, u16)],
        separator_width: u16,
        x: u16,
        y: u16,
        total_width: u16,
        height: u16,
    ) {
        let n = tab_widths.len();
        if n == 0 || total_width == 0 {
            return;
        }

        let mut starts: Vec<u16> = Vec::with_capacity(n);
        let mut cursor: u16 = 0;
        for (i, &(w, _)) in tab_widths.iter().enumerate() {
            if i > 0 {
                cursor += separator_width;
            }
            starts.push(cursor);
            cursor += w;
        }

        for (i, &(width, action_id)) in tab_widths.iter().enumerate() {
            let left = if i == 0 {
                0
            } else {
                let prev_end = starts[i - 1] + tab_widths[i - 1].0;
                prev_end + (starts[i] - prev_end) / 2
            };
            let right = if i == n - 1 {
                total_width
            } else {
                let cur_end = starts[i] + width;
                cur_end + (starts[i + 1] - cur_end) / 2
            };

            let w = right.saturating_sub(left);
            if w > 0 {
                self.add_click_target(Rect::new(x + left, y, w, height), action_id);
            }
        }
    }

    /// Action ID at a cell. Later registrations sit on top of earlier ones.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<u16> {
        self.targets.iter().rev().find_map(|t| {
            let r = &t.rect;
            if col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height {
                Some(t.action_id)
            } else {
                None
            }
        })
    }

    /// Turn a click at a cell into an input event. Fish slots resolve to the
    /// id of the fish drawn there.
    pub fn resolve(&self, col: u16, row: u16) -> Option<InputEvent> {
        let action_id = self.hit_test(col, row)?;
        if (FISH_BASE..FISH_BASE + FISH_SLOTS).contains(&action_id) {
            let slot = (action_id - FISH_BASE) as usize;
            return self.pond_ids.get(slot).map(|&id| InputEvent::Catch(id));
        }
        Some(InputEvent::Click(action_id))
    }
}

/// Whether a screen this wide gets the stacked single-column layout.
pub fn is_narrow_layout(width: u16) -> bool {
    width < 60
}

/// Convert a pixel Y offset inside the grid to a terminal row.
pub fn pixel_y_to_row(click_y: f64, grid_height: f64, terminal_rows: u16) -> Option<u16> {
    if grid_height <= 0.0 || terminal_rows == 0 || click_y < 0.0 {
        return None;
    }
    let cell_height = grid_height / terminal_rows as f64;
    let row = (click_y / cell_height) as u16;
    if row >= terminal_rows {
        return None;
    }
    Some(row)
}

/// Convert a pixel X offset inside the grid to a terminal column.
pub fn pixel_x_to_col(click_x: f64, grid_width: f64, terminal_cols: u16) -> Option<u16> {
    if grid_width <= 0.0 || terminal_cols == 0 || click_x < 0.0 {
        return None;
    }
    let cell_width = grid_width / terminal_cols as f64;
    let col = (click_x / cell_width) as u16;
    if col >= terminal_cols { None } else { Some(col) }
}
