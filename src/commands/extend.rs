//! Extend command handler.
//!
//! Adds repos (with fresh worktrees) and plain folders to an existing
//! session. Every duplicate check runs before anything is provisioned or
//! written.

use std::collections::HashSet;

use super::{BaseBranches, Workbench};
use crate::error::{Result, WmError};
use crate::session::{now_iso8601, FolderEntry, RepoEntry, SessionPaths};

#[derive(Debug, Clone, Default)]
pub struct ExtendRequest {
    pub session_id: String,
    pub repos: Vec<String>,
    pub bases: Vec<String>,
    pub folders: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ExtendReport {
    pub session_id: String,
    pub paths: SessionPaths,
    pub added_repos: Vec<RepoEntry>,
    pub added_folders: Vec<FolderEntry>,
}

/// Add repos and folders to a session.
///
/// # Errors
///
/// Returns an error if:
/// - The manifest or workspace file is missing, or the manifest is unparsable
/// - A repo is already part of the session, or a folder is already listed
/// - A repo cannot be located or a git command fails
pub fn extend_command(bench: &Workbench<'_>, request: &ExtendRequest) -> Result<ExtendReport> {
    let session_id = request.session_id.trim();
    if session_id.is_empty() {
        return Err(WmError::input("Provide a session identifier to extend."));
    }

    let repos: Vec<String> = request
        .repos
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if repos.is_empty() && request.folders.is_empty() {
        return Err(WmError::input(
            "Provide at least one repo or folder to extend session.",
        ));
    }

    let store = bench.store();
    let mut state = store.load(session_id)?;
    let slug = state.manifest.effective_slug()?;

    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = repos
        .iter()
        .map(String::as_str)
        .filter(|r| state.manifest.has_repo(r) && seen.insert(*r))
        .collect();
    if !duplicates.is_empty() {
        return Err(WmError::input(format!(
            "Repos already part of session: {}",
            duplicates.join(", ")
        )));
    }

    let bases = BaseBranches::parse(&bench.config.default_base, &request.bases)?;
    if !repos.is_empty() {
        bench.git.ensure_available()?;
    }
    let resolved = bench.resolve_repos(&repos)?;
    let folders = bench.resolve_folders(&request.folders)?;

    let branch = bench.branch_name(&slug);
    let mut added_repos = Vec::new();
    for (name, root) in resolved {
        let entry = RepoEntry {
            worktree: bench.worktree_path(&name, &slug),
            base: bases.for_repo(&name).to_string(),
            branch: branch.clone(),
            repo: name,
            root,
        };
        state.add_repo(entry.clone())?;
        added_repos.push(entry);
    }
    for folder in &folders {
        state.add_folder(folder.clone())?;
    }
    state.validate()?;

    bench.ensure_directories()?;
    bench.provision(&mut state, &added_repos)?;

    state.manifest.updated_at = Some(now_iso8601());
    let paths = store.save(&state)?;
    bench.launch_editor(&paths.workspace);

    let added_repos: Vec<RepoEntry> = state
        .manifest
        .repos
        .iter()
        .filter(|r| added_repos.iter().any(|a| a.repo == r.repo))
        .cloned()
        .collect();

    let mut summary = Vec::new();
    if !added_repos.is_empty() {
        let names: Vec<&str> = added_repos.iter().map(|r| r.repo.as_str()).collect();
        summary.push(format!("repos: {}", names.join(", ")));
    }
    if !folders.is_empty() {
        let paths: Vec<String> = folders.iter().map(|f| f.path.display().to_string()).collect();
        summary.push(format!("folders: {}", paths.join(", ")));
    }
    bench.output.success(format!(
        "Session {} extended with {}",
        session_id,
        summary.join(" and ")
    ));

    Ok(ExtendReport {
        session_id: session_id.to_string(),
        paths,
        added_repos,
        added_folders: folders,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{init_command, InitRequest};
    use crate::session::Manifest;
    use crate::test_utils::{Fixture, GitCall};
    use std::fs;

    fn init(fixture: &Fixture, repos: &[&str]) -> String {
        let request = InitRequest {
            feature: "Fix Bug".to_string(),
            repos: repos.iter().map(|r| r.to_string()).collect(),
            ..InitRequest::default()
        };
        init_command(&fixture.bench(), &request).unwrap().session_id
    }

    fn extend(session_id: &str, repos: &[&str], folders: &[String]) -> ExtendRequest {
        ExtendRequest {
            session_id: session_id.to_string(),
            repos: repos.iter().map(|r| r.to_string()).collect(),
            bases: Vec::new(),
            folders: folders.to_vec(),
        }
    }

    #[test]
    fn test_extend_appends_repo_and_folder() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let docs = fixture.mkdir("docs");
        let id = init(&fixture, &["svc-a"]);

        let report = extend_command(
            &fixture.bench(),
            &extend(&id, &["svc-b"], &[docs.display().to_string()]),
        )
        .unwrap();

        assert_eq!(report.added_repos.len(), 1);
        assert_eq!(
            report.added_repos[0].worktree,
            fixture.config.worktrees_root.join("svc-b/fix-bug")
        );
        assert_eq!(report.added_folders[0].path, docs);

        let manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(&report.paths.manifest).unwrap()).unwrap();
        let names: Vec<&str> = manifest.repos.iter().map(|r| r.repo.as_str()).collect();
        assert_eq!(names, vec!["svc-a", "svc-b"]);
        assert_eq!(manifest.folders.len(), 1);
        assert!(manifest.updated_at.is_some());

        let state = fixture.bench().store().load(&id).unwrap();
        assert!(state.validate().is_ok());
        assert_eq!(state.workspace.folders.len(), 3);
    }

    #[test]
    fn test_extend_duplicate_repo_leaves_files_untouched() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let id = init(&fixture, &["svc-a"]);
        let paths = fixture.bench().store().paths(&id);
        let manifest_before = fs::read(&paths.manifest).unwrap();
        let workspace_before = fs::read(&paths.workspace).unwrap();
        let calls_before = fixture.git.mutations().len();

        let err = extend_command(&fixture.bench(), &extend(&id, &["svc-b", "svc-a"], &[])).unwrap_err();

        assert_eq!(err.to_string(), "Repos already part of session: svc-a");
        assert_eq!(fs::read(&paths.manifest).unwrap(), manifest_before);
        assert_eq!(fs::read(&paths.workspace).unwrap(), workspace_before);
        assert_eq!(fixture.git.mutations().len(), calls_before);
        assert!(!fixture.config.worktrees_root.join("svc-b/fix-bug").exists());
    }

    #[test]
    fn test_extend_duplicate_folder_is_rejected_before_provisioning() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let docs = fixture.mkdir("docs");
        let id = {
            let request = InitRequest {
                feature: "Fix Bug".to_string(),
                repos: vec!["svc-a".to_string()],
                folders: vec![docs.display().to_string()],
                ..InitRequest::default()
            };
            init_command(&fixture.bench(), &request).unwrap().session_id
        };
        let calls_before = fixture.git.mutations().len();

        let err = extend_command(
            &fixture.bench(),
            &extend(&id, &["svc-b"], &[docs.display().to_string()]),
        )
        .unwrap_err();

        assert!(err.to_string().contains("Folder already present in workspace"));
        assert_eq!(fixture.git.mutations().len(), calls_before);
    }

    #[test]
    fn test_extend_requires_session_files() {
        let fixture = Fixture::new().with_repo("svc-a");
        let bench = fixture.bench();
        assert!(matches!(
            extend_command(&bench, &extend("nope--svc-a", &["svc-a"], &[])),
            Err(WmError::ManifestNotFound(_))
        ));

        let id = init(&fixture, &["svc-a"]);
        let paths = bench.store().paths(&id);
        fs::remove_file(&paths.workspace).unwrap();
        assert!(matches!(
            extend_command(&bench, &extend(&id, &["svc-b"], &[])),
            Err(WmError::WorkspaceNotFound(_))
        ));
    }

    #[test]
    fn test_extend_unparsable_manifest_is_fatal() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let id = init(&fixture, &["svc-a"]);
        let paths = fixture.bench().store().paths(&id);
        fs::write(&paths.manifest, "{broken").unwrap();

        let err = extend_command(&fixture.bench(), &extend(&id, &["svc-b"], &[])).unwrap_err();
        assert!(err
            .to_string()
            .starts_with(&format!("Session manifest for '{}' could not be parsed", id)));
    }

    #[test]
    fn test_extend_needs_something_to_add() {
        let fixture = Fixture::new().with_repo("svc-a");
        let id = init(&fixture, &["svc-a"]);
        assert!(extend_command(&fixture.bench(), &extend(&id, &[" "], &[])).is_err());
        assert!(extend_command(&fixture.bench(), &extend(" ", &["svc-a"], &[])).is_err());
    }

    #[test]
    fn test_extend_records_orphaned_worktree() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let id = init(&fixture, &["svc-a"]);
        let orphan = fixture.config.worktrees_root.join("svc-b/fix-bug");
        fs::create_dir_all(&orphan).unwrap();
        fs::write(orphan.join("README.md"), "left behind").unwrap();
        fixture
            .git
            .register_worktree(&fixture.repo_path("svc-b"), &orphan, "feature/fix-bug");

        let report = extend_command(&fixture.bench(), &extend(&id, &["svc-b"], &[])).unwrap();

        assert_eq!(report.added_repos[0].branch, "feature/fix-bug");
        assert!(!fixture
            .git
            .mutations()
            .iter()
            .any(|c| matches!(c, GitCall::AddNewBranch { repo, .. } if *repo == fixture.repo_path("svc-b"))));
    }

    #[test]
    fn test_extend_slug_from_feature_when_missing() {
        let fixture = Fixture::new().with_repo("svc-a").with_repo("svc-b");
        let id = init(&fixture, &["svc-a"]);
        let paths = fixture.bench().store().paths(&id);
        let mut manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(&paths.manifest).unwrap()).unwrap();
        manifest.slug = None;
        fs::write(&paths.manifest, serde_json::to_string(&manifest).unwrap()).unwrap();

        let report = extend_command(&fixture.bench(), &extend(&id, &["svc-b"], &[])).unwrap();
        assert_eq!(
            report.added_repos[0].worktree,
            fixture.config.worktrees_root.join("svc-b/fix-bug")
        );
    }
}
