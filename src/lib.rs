pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod editor;
pub mod error;
pub mod git;
pub mod history;
pub mod locator;
pub mod output;
pub mod prompt;
pub mod session;
pub mod worktree;

#[cfg(test)]
mod test_utils;

pub use config::{Config, RunOptions};
pub use error::{Result, WmError};
pub use session::{SessionState, SessionStore};
pub use worktree::WorktreeProvisioner;
