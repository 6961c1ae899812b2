//! List command handler.
//!
//! Shows every session recorded in history with its status and repos.

use super::Workbench;
use crate::error::Result;
use crate::history::{sorted_by_time, HistoryEntry};
use crate::output::{render_sessions, SessionSnapshot, SessionStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub active_only: bool,
    pub limit: Option<usize>,
    /// Oldest first.
    pub reverse: bool,
    pub json: bool,
}

/// Build the snapshots `wm list` would show.
pub fn collect_sessions(bench: &Workbench<'_>, options: &ListOptions) -> Vec<SessionSnapshot> {
    snapshots(bench, &bench.history().read(), options)
}

fn snapshots(
    bench: &Workbench<'_>,
    history: &[HistoryEntry],
    options: &ListOptions,
) -> Vec<SessionSnapshot> {
    let store = bench.store();
    let entries = sorted_by_time(history, options.reverse);

    let snapshots = entries.iter().map(|entry| {
        let manifest = store.try_read_manifest(&store.paths(&entry.session_id).manifest);
        bench.snapshot(entry, manifest.as_ref())
    });

    let filtered = snapshots.filter(|s| !options.active_only || s.status == SessionStatus::Active);
    match options.limit {
        Some(limit) => filtered.take(limit).collect(),
        None => filtered.collect(),
    }
}

/// Print recorded sessions as blocks or JSON.
pub fn list_command(bench: &Workbench<'_>, options: &ListOptions) -> Result<Vec<SessionSnapshot>> {
    let history = bench.history().read();
    if history.is_empty() {
        bench.output.info("No workspace sessions found.");
        return Ok(Vec::new());
    }

    let sessions = snapshots(bench, &history, options);
    if sessions.is_empty() {
        bench.output.info("No workspace sessions matched the filters.");
        return Ok(sessions);
    }

    if options.json {
        bench.output.line(serde_json::to_string_pretty(&sessions)?);
    } else {
        render_sessions(&bench.output, &sessions);
    }
    Ok(sessions)
}
