//! Open command handler.
//!
//! Finds a session's workspace file by identifier, path or recency, prints
//! the session and launches the editor.

use std::path::{Path, PathBuf};

use super::Workbench;
use crate::config::expand_path;
use crate::error::{Result, WmError};
use crate::history::{find_by_session, find_by_workspace, sorted_by_time, HistoryEntry};
use crate::output::{session_block_lines, SessionSnapshot};
use crate::session::WORKSPACE_EXTENSION;

#[derive(Debug, Clone, Default)]
pub struct OpenRequest {
    /// Session id or workspace file path.
    pub token: Option<String>,
    /// 1-based index over history, newest first.
    pub recent: Option<usize>,
    /// Print the workspace path instead of launching the editor.
    pub print_only: bool,
}

#[derive(Debug, Clone)]
pub struct OpenTarget {
    pub session_id: String,
    pub workspace: PathBuf,
    pub snapshot: SessionSnapshot,
}

/// Resolve and open a session.
///
/// # Errors
///
/// Returns an error if neither or both of a token and `--recent` are given,
/// if nothing matches, or if the resolved workspace file does not exist.
pub fn open_command(bench: &Workbench<'_>, request: &OpenRequest) -> Result<OpenTarget> {
    let token = request
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let history = bench.history().read();

    let (workspace, entry, session_id) = match (token, request.recent) {
        (Some(_), Some(_)) => {
            return Err(WmError::input(
                "Provide either a session identifier or --recent, not both.",
            ))
        }
        (None, None) => {
            return Err(WmError::input("Provide a session identifier or --recent N."))
        }
        (None, Some(index)) => resolve_recent(&history, index)?,
        (Some(token), None) => resolve_token(bench, token, &history)?,
    };

    if !workspace.is_file() {
        return Err(WmError::input(format!(
            "Workspace file not found: {}",
            workspace.display()
        )));
    }

    let store = bench.store();
    let manifest = store.try_read_manifest(&store.paths(&session_id).manifest);
    // Without a history entry the manifest's creation time stands in.
    let entry = entry.unwrap_or_else(|| HistoryEntry {
        session_id: session_id.clone(),
        workspace: Some(workspace.clone()),
        timestamp: manifest
            .as_ref()
            .and_then(|m| m.created_at.clone())
            .unwrap_or_default(),
    });
    let snapshot = bench.snapshot(&entry, manifest.as_ref());

    for line in session_block_lines(&bench.output, &snapshot) {
        bench.output.line(line);
    }

    if request.print_only {
        bench.output.line(workspace.display().to_string());
    } else {
        bench.launch_editor(&workspace);
    }

    Ok(OpenTarget {
        session_id,
        workspace,
        snapshot,
    })
}

type Resolved = (PathBuf, Option<HistoryEntry>, String);

fn resolve_recent(history: &[HistoryEntry], index: usize) -> Result<Resolved> {
    if index == 0 {
        return Err(WmError::input("--recent must be a positive number"));
    }
    if history.is_empty() {
        return Err(WmError::input("No workspace sessions found."));
    }

    let sorted = sorted_by_time(history, false);
    let Some(entry) = sorted.get(index - 1) else {
        return Err(WmError::input(format!(
            "Only {} session(s) recorded; cannot open #{}",
            sorted.len(),
            index
        )));
    };
    let workspace = entry.workspace.clone().ok_or_else(|| {
        WmError::input(format!(
            "History entry for {} has no workspace path",
            entry.session_id
        ))
    })?;
    Ok((workspace, Some(entry.clone()), entry.session_id.clone()))
}

/// Try a workspace path, then a recorded session id, then
/// `<workspaces_root>/<token>.code-workspace`.
fn resolve_token(bench: &Workbench<'_>, token: &str, history: &[HistoryEntry]) -> Result<Resolved> {
    let expanded = expand_path(token);
    if expanded.is_file() {
        return Ok(by_workspace(expanded, history));
    }

    if let Some(entry) = find_by_session(history, token) {
        if let Some(workspace) = entry.workspace.as_ref().filter(|w| w.exists()) {
            return Ok((workspace.clone(), Some(entry.clone()), entry.session_id.clone()));
        }
    }

    let suffix = format!(".{}", WORKSPACE_EXTENSION);
    let file_name = if token.ends_with(&suffix) {
        token.to_string()
    } else {
        format!("{}{}", token, suffix)
    };
    let candidate = expand_path(&bench.config.workspaces_root.join(file_name).to_string_lossy());
    if candidate.exists() {
        return Ok(by_workspace(candidate, history));
    }

    Err(WmError::input(format!(
        "Unable to locate workspace for '{}'.",
        token
    )))
}

fn by_workspace(workspace: PathBuf, history: &[HistoryEntry]) -> Resolved {
    let entry = find_by_workspace(history, &workspace).cloned();
    let session_id = entry
        .as_ref()
        .map(|e| e.session_id.clone())
        .unwrap_or_else(|| file_stem(&workspace));
    (workspace, entry, session_id)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
