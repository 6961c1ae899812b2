//! Init command handler.
//!
//! Creates a new session: one worktree per repo on `<prefix><slug>`, the
//! manifest and workspace file, a history entry and optional notes.

use super::{BaseBranches, Workbench};
use crate::error::{Result, WmError};
use crate::session::{self, FolderEntry, RepoEntry, SessionPaths, SessionState};

#[derive(Debug, Clone, Default)]
pub struct InitRequest {
    pub feature: String,
    pub repos: Vec<String>,
    /// Defaults to the first repo.
    pub primary: Option<String>,
    /// Raw `--base` values.
    pub bases: Vec<String>,
    /// Raw `--folder` values.
    pub folders: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub session_id: String,
    pub paths: SessionPaths,
    pub repos: Vec<RepoEntry>,
    pub folders: Vec<FolderEntry>,
}

/// Create a workspace session.
///
/// # Errors
///
/// Returns an error if:
/// - No feature name or no repo is given, or the feature has no usable slug
/// - A repo cannot be located, or an ambiguous match cannot be resolved
/// - The primary repo is not among the resolved repos
/// - A git command fails while provisioning
pub fn init_command(bench: &Workbench<'_>, request: &InitRequest) -> Result<InitReport> {
    if request.feature.trim().is_empty() {
        return Err(WmError::input("--feature is required"));
    }
    if request.repos.iter().all(|r| r.trim().is_empty()) {
        return Err(WmError::input("Provide at least one repo argument"));
    }

    let slug = session::slugify(&request.feature)?;
    let bases = BaseBranches::parse(&bench.config.default_base, &request.bases)?;

    bench.ensure_directories()?;
    bench.git.ensure_available()?;

    let resolved = bench.resolve_repos(&request.repos)?;
    let folders = bench.resolve_folders(&request.folders)?;

    let primary = match request.primary.as_deref().map(str::trim) {
        Some(primary) if !primary.is_empty() => primary.to_string(),
        _ => resolved
            .first()
            .map(|(name, _)| name.clone())
            .ok_or_else(|| WmError::input("Provide at least one repo argument"))?,
    };
    if !resolved.iter().any(|(name, _)| *name == primary) {
        return Err(WmError::input(format!(
            "Primary repo '{}' was not among the resolved repositories",
            primary
        )));
    }

    let others: Vec<String> = resolved
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| *name != primary)
        .collect();
    let session_id = session::session_id(&slug, &primary, &others);

    let store = bench.store();
    if store.paths(&session_id).manifest.exists() {
        bench.output.warn(format!(
            "Session {} already exists; its files will be rewritten",
            session_id
        ));
    }

    let mut state = SessionState::new(&session_id, request.feature.trim(), &slug);
    let branch = bench.branch_name(&slug);
    for (name, root) in &resolved {
        state.add_repo(RepoEntry {
            repo: name.clone(),
            root: root.clone(),
            worktree: bench.worktree_path(name, &slug),
            branch: branch.clone(),
            base: bases.for_repo(name).to_string(),
        })?;
    }
    for folder in folders {
        state.add_folder(folder)?;
    }
    state.validate()?;

    store.ensure_session_dir(&session_id)?;

    let staged = state.manifest.repos.clone();
    bench.provision(&mut state, &staged)?;

    let paths = store.save(&state)?;
    bench.history().append(&session_id, &paths.workspace)?;
    store.prefill_notes(&session_id, request.notes.as_deref())?;
    bench.launch_editor(&paths.workspace);

    bench
        .output
        .success(format!("Workspace ready: {}", paths.workspace.display()));
    let worktrees: Vec<String> = state
        .manifest
        .folder_paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    bench
        .output
        .success(format!("Worktrees: {}", worktrees.join(", ")));

    Ok(InitReport {
        session_id,
        paths,
        repos: state.manifest.repos,
        folders: state.manifest.folders,
    })
}
