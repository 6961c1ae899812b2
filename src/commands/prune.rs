//! Prune command handler.
//!
//! Removes a session's worktrees and branches and moves its files into
//! `<workspaces_root>/archive/`.

use std::path::PathBuf;

use super::Workbench;
use crate::error::Result;

/// Tear down and archive a session. Returns the archived paths.
///
/// # Errors
///
/// Returns an error if the live manifest is missing or cannot be parsed, or
/// if moving a file into the archive fails. Branch cleanup failures are
/// reported as warnings only.
pub fn prune_command(bench: &Workbench<'_>, session_id: &str) -> Result<Vec<PathBuf>> {
    let store = bench.store();
    let manifest = store.read_manifest(session_id)?;

    let provisioner = bench.provisioner();
    for entry in &manifest.repos {
        provisioner.teardown(entry);
    }

    let archived = store.archive(session_id)?;
    bench
        .output
        .success(format!("Session {} pruned and archived.", session_id));
    Ok(archived)
}
