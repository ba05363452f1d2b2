//! Ratatui UI loop.
//!
//! Keys:
//! - Up/Down: move selection
//! - Enter: change to selected track
//! - p: play (resume when paused)
//! - Space: pause
//! - n/Right, b/Left: next/previous
//! - +/-: volume
//! - s: stop
//! - l: logs
//! - q: quit

mod app;
mod render;

pub(crate) use app::run_tui;
