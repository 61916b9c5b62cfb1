//! Semantic action IDs for click targets.
//!
//! Registered during render and dispatched via `InputEvent::Click`.

// ── Tab navigation ──────────────────────────────────────────────
pub const TAB_CREW: u16 = 10;
pub const TAB_RESEARCH: u16 = 11;
pub const TAB_TACKLE: u16 = 12;
pub const TAB_STATS: u16 = 13;

// ── Crew (base + catalog index) ─────────────────────────────────
pub const HIRE_BASE: u16 = 100;
pub const UPGRADE_CREW_BASE: u16 = 150;

// ── Research (base + catalog index) ─────────────────────────────
pub const RESEARCH_BASE: u16 = 200;

// ── Tackle shop (base + catalog index) ──────────────────────────
pub const TACKLE_BASE: u16 = 300;

// ── Misc ────────────────────────────────────────────────────────
pub const RESET: u16 = 900;

/// Fish in the pond: base + slot in this frame's target list. The slot is
/// mapped back to a target id by `ClickState::resolve`.
pub const FISH_BASE: u16 = 1000;
pub const FISH_SLOTS: u16 = 64;
