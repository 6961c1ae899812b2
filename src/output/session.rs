//! Session snapshot display.
//!
//! Renders the labelled blocks printed by `wm list` and `wm open`.

use std::path::PathBuf;

use serde::Serialize;

use super::messages::{Level, Output};
use crate::session::RepoEntry;

const LABEL_WIDTH: usize = 9;
const DIVIDER_WIDTH: usize = 64;
const EMPTY: &str = "—";

/// Whether any part of a session still exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Stale,
}

/// One repo line of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSummary {
    pub repo: String,
    pub branch: String,
    pub base: String,
    pub worktree: PathBuf,
}

impl From<&RepoEntry> for RepoSummary {
    fn from(entry: &RepoEntry) -> Self {
        Self {
            repo: entry.repo.clone(),
            branch: entry.branch.clone(),
            base: entry.base.clone(),
            worktree: entry.worktree.clone(),
        }
    }
}

/// A session as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub timestamp: Option<String>,
    pub workspace: Option<PathBuf>,
    pub status: SessionStatus,
    pub repos: Vec<RepoSummary>,
}

/// Print every snapshot, separated by a divider line.
pub fn render_sessions(out: &Output, sessions: &[SessionSnapshot]) {
    let divider = "─".repeat(DIVIDER_WIDTH);
    for (index, session) in sessions.iter().enumerate() {
        if index > 0 {
            out.line(&divider);
        }
        for line in session_block_lines(out, session) {
            out.line(line);
        }
    }
}

pub fn session_block_lines(out: &Output, session: &SessionSnapshot) -> Vec<String> {
    let workspace = session
        .workspace
        .as_ref()
        .map(|p| p.display().to_string());

    let mut lines = vec![
        format_row("Session", &session.session_id),
        format_row("Status", &status_label(out, session.status)),
        format_row("Created", session.timestamp.as_deref().unwrap_or("")),
        format_row("Workspace", workspace.as_deref().unwrap_or("")),
    ];
    lines.extend(repo_rows(&session.repos));
    lines
}

fn format_row(label: &str, value: &str) -> String {
    let value = if value.is_empty() { EMPTY } else { value };
    format!("{:<width$} : {}", label, value, width = LABEL_WIDTH)
}

fn repo_rows(repos: &[RepoSummary]) -> Vec<String> {
    if repos.is_empty() {
        return vec![format_row("Repos", "")];
    }

    let mut rows = vec![format!("{:<width$} :", "Repos", width = LABEL_WIDTH)];
    for repo in repos {
        rows.push(format!("- {}", or_empty(&repo.repo)));
        rows.push(format!("  branch  : {}", or_empty(&repo.branch)));
        rows.push(format!("  base    : {}", or_empty(&repo.base)));
        let worktree = repo.worktree.display().to_string();
        rows.push(format!("  worktree: {}", or_empty(&worktree)));
    }
    rows
}

fn or_empty(value: &str) -> &str {
    if value.is_empty() {
        EMPTY
    } else {
        value
    }
}

fn status_label(out: &Output, status: SessionStatus) -> String {
    match status {
        SessionStatus::Active => out.colorize("🟢 active", Level::Success),
        SessionStatus::Stale => out.colorize("⚪ stale", Level::Warn),
    }
}
