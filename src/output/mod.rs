//! Terminal output formatting for workspace-manager.
//!
//! This module provides consistent, colored terminal output for all
//! CLI operations. Functions are organized by domain:
//!
//! - [`messages`] - Level-tagged log lines (info, warn, error, success, debug)
//! - [`session`] - Session snapshot blocks used by `list` and `open`

pub mod messages;
pub mod session;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use messages::{Level, Output};
pub use session::{render_sessions, session_block_lines, SessionSnapshot, SessionStatus};
