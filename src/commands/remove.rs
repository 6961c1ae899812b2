//! Remove command handler.
//!
//! Permanently deletes a session, whether live or archived, and drops it
//! from history. A broken or missing manifest does not block removal as long
//! as the session is known somewhere.

use std::path::PathBuf;

use super::Workbench;
use crate::error::{Result, WmError};
use crate::history::find_by_session;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    pub deleted: Vec<PathBuf>,
    pub history_removed: bool,
}

/// Tear down and delete every artifact of a session.
///
/// # Errors
///
/// Returns an error if the session has neither a manifest (live or archived)
/// nor a history entry, or if deleting a file fails.
pub fn remove_command(bench: &Workbench<'_>, session_id: &str) -> Result<RemoveReport> {
    let store = bench.store();
    let history = bench.history();

    let manifest_path = [
        store.paths(session_id).manifest,
        store.archived_paths(session_id).manifest,
    ]
    .into_iter()
    .find(|p| p.exists());

    let manifest = match &manifest_path {
        Some(path) => store.try_read_manifest(path),
        None => {
            bench.output.warn(format!(
                "Manifest not found for session: {}. Proceeding with deletion using history only.",
                session_id
            ));
            None
        }
    };

    let entries = history.read();
    if manifest_path.is_none() && find_by_session(&entries, session_id).is_none() {
        return Err(WmError::SessionNotFound(session_id.to_string()));
    }

    if let Some(manifest) = &manifest {
        let provisioner = bench.provisioner();
        for entry in &manifest.repos {
            provisioner.teardown(entry);
        }
    }

    let deleted = store.delete_all(session_id)?;
    let history_removed = history.remove(session_id)?;
    if history_removed {
        bench
            .output
            .info(format!("Removed session {} from history.", session_id));
    }

    bench
        .output
        .success(format!("Session {} fully removed.", session_id));
    Ok(RemoveReport {
        deleted,
        history_removed,
    })
}
