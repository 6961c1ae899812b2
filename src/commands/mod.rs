//! CLI command handlers for workspace-manager.
//!
//! Each lifecycle command has its own module with a handler function that
//! takes a [`Workbench`]: the resolved configuration, the per-run switches
//! and every external collaborator (git, prompts, repo lookup, editor).
//!
//! # Commands
//!
//! - [`init`] - Create a session with one worktree per repo
//! - [`extend`] - Add repos or folders to an existing session
//! - [`list`] - Show recorded sessions and whether they are still active
//! - [`open`] - Print a session and launch its workspace
//! - [`prune`] - Tear down worktrees and archive the session files
//! - [`remove`] - Tear down and permanently delete a session
//! - [`config`] - Show or create the configuration file

mod config;
mod extend;
mod init;
mod list;
mod open;
mod prune;
mod remove;

pub use config::{config_display_command, config_init_command};
pub use extend::{extend_command, ExtendReport, ExtendRequest};
pub use init::{init_command, InitReport, InitRequest};
pub use list::{collect_sessions, list_command, ListOptions};
pub use open::{open_command, OpenRequest, OpenTarget};
pub use prune::prune_command;
pub use remove::{remove_command, RemoveReport};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{expand_path, Config, RunOptions};
use crate::editor::EditorLauncher;
use crate::error::{Result, WmError};
use crate::git::GitBackend;
use crate::history::{HistoryEntry, HistoryIndex};
use crate::locator::RepoSource;
use crate::output::{Output, SessionSnapshot, SessionStatus};
use crate::prompt::Prompter;
use crate::session::{FolderEntry, Manifest, RepoEntry, SessionState, SessionStore};
use crate::worktree::{ProvisionOutcome, WorktreeProvisioner, WorktreeRequest};

/// Everything a lifecycle command works with.
pub struct Workbench<'a> {
    pub config: &'a Config,
    pub options: &'a RunOptions,
    pub git: &'a dyn GitBackend,
    pub prompter: &'a dyn Prompter,
    pub repos: &'a dyn RepoSource,
    pub editor: &'a dyn EditorLauncher,
    pub output: Output,
}

impl<'a> Workbench<'a> {
    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(&self.config.workspaces_root, self.dry_run(), self.output)
    }

    pub fn history(&self) -> HistoryIndex {
        HistoryIndex::new(&self.config.history_file, self.dry_run(), self.output)
    }

    pub fn provisioner(&self) -> WorktreeProvisioner<'a> {
        WorktreeProvisioner::new(self.git, self.prompter, self.output, self.dry_run())
    }

    /// `<worktrees_root>/<repo>/<slug>`
    pub fn worktree_path(&self, repo: &str, slug: &str) -> PathBuf {
        self.config.worktrees_root.join(repo).join(slug)
    }

    pub fn branch_name(&self, slug: &str) -> String {
        format!("{}{}", self.config.branch_prefix, slug)
    }

    /// Create the worktrees root, workspaces root and history directory.
    pub fn ensure_directories(&self) -> Result<()> {
        if self.dry_run() {
            return Ok(());
        }
        fs::create_dir_all(&self.config.worktrees_root)?;
        fs::create_dir_all(&self.config.workspaces_root)?;
        if let Some(parent) = self.config.history_file.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Resolve repo tokens to clones, first occurrence of a name wins.
    pub fn resolve_repos(&self, tokens: &[String]) -> Result<Vec<(String, PathBuf)>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for token in tokens.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !seen.insert(token.to_string()) {
                continue;
            }
            let path = self.select_repo(token)?;
            self.output
                .debug(format!("Resolved {} -> {}", token, path.display()));
            resolved.push((token.to_string(), path));
        }
        Ok(resolved)
    }

    /// The single clone for `token`, asking when there are several.
    pub fn select_repo(&self, token: &str) -> Result<PathBuf> {
        let mut candidates = self.repos.candidates(token);
        match candidates.len() {
            0 => Err(WmError::RepoNotFound(token.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => {
                let options: Vec<String> =
                    candidates.iter().map(|p| p.display().to_string()).collect();
                let question = format!("Multiple matches for '{}'. Select one:", token);
                let index = self.prompter.choose(&question, &options)?;
                if index >= candidates.len() {
                    return Err(WmError::SelectionCancelled);
                }
                Ok(candidates.swap_remove(index))
            }
        }
    }

    /// A `--folder` value: an existing directory, else a repo token.
    pub fn resolve_folder(&self, spec: &str) -> Result<FolderEntry> {
        let token = spec.trim();
        if token.is_empty() {
            return Err(WmError::input("--folder requires a target value"));
        }
        let expanded = expand_path(token);
        let path = if expanded.is_dir() {
            expanded
        } else {
            self.select_repo(token)?
        };
        Ok(FolderEntry::from_path(path))
    }

    pub fn resolve_folders(&self, specs: &[String]) -> Result<Vec<FolderEntry>> {
        specs.iter().map(|spec| self.resolve_folder(spec)).collect()
    }

    /// Provision every staged repo of `state` that is in `repos`, recording
    /// the branch actually checked out.
    pub fn provision(&self, state: &mut SessionState, repos: &[RepoEntry]) -> Result<()> {
        let provisioner = self.provisioner();
        for entry in repos {
            let provision = provisioner.prepare(&WorktreeRequest {
                repo_name: &entry.repo,
                root: &entry.root,
                worktree: &entry.worktree,
                base: &entry.base,
                branch: &entry.branch,
                reuse: self.options.checkout_existing,
            })?;
            if provision.outcome == ProvisionOutcome::CreatedWithSuffix {
                self.output.warn(format!(
                    "{} uses branch '{}' instead of '{}'",
                    entry.repo, provision.branch, entry.branch
                ));
            }
            state.set_branch(&entry.repo, &provision.branch);
        }
        Ok(())
    }

    /// Launch the editor unless disabled; failures are only reported.
    pub fn launch_editor(&self, workspace: &Path) {
        if self.dry_run() {
            return;
        }
        if self.options.no_open {
            self.output.debug("Skipping editor launch (--no-open)");
            return;
        }
        if let Err(e) = self.editor.launch(workspace) {
            self.output.warn(format!("Failed to launch editor: {}", e));
        }
    }

    /// Present a history entry together with its (possibly missing) manifest.
    pub fn snapshot(&self, entry: &HistoryEntry, manifest: Option<&Manifest>) -> SessionSnapshot {
        let repos = manifest.map(|m| m.repos.as_slice()).unwrap_or_default();
        let any_worktree = repos
            .iter()
            .any(|r| !r.worktree.as_os_str().is_empty() && r.worktree.is_dir());
        let workspace_exists = entry.workspace.as_deref().is_some_and(Path::exists);

        SessionSnapshot {
            session_id: entry.session_id.clone(),
            timestamp: Some(entry.timestamp.clone()).filter(|t| !t.is_empty()),
            workspace: entry.workspace.clone(),
            status: if any_worktree || workspace_exists {
                SessionStatus::Active
            } else {
                SessionStatus::Stale
            },
            repos: repos.iter().map(Into::into).collect(),
        }
    }
}

/// Base branch selection from `--base` values.
///
/// `--base develop` changes the default, `--base svc-a:release` overrides a
/// single repo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseBranches {
    default: String,
    overrides: HashMap<String, String>,
}

impl BaseBranches {
    pub fn parse(default: &str, specs: &[String]) -> Result<Self> {
        let mut bases = Self {
            default: default.to_string(),
            overrides: HashMap::new(),
        };
        for spec in specs {
            let spec = spec.trim();
            match spec.split_once(':') {
                Some((repo, branch)) => {
                    let (repo, branch) = (repo.trim(), branch.trim());
                    if repo.is_empty() || branch.is_empty() {
                        return Err(WmError::input(format!(
                            "Invalid --base value '{}'; expected BRANCH or REPO:BRANCH",
                            spec
                        )));
                    }
                    bases.overrides.insert(repo.to_string(), branch.to_string());
                }
                None if spec.is_empty() => {
                    return Err(WmError::input("--base requires a branch name"));
                }
                None => bases.default = spec.to_string(),
            }
        }
        Ok(bases)
    }

    pub fn for_repo(&self, repo: &str) -> &str {
        self.overrides
            .get(repo)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

/// Pick the session id from `--session` or the positional argument.
pub fn session_arg(flag: Option<&str>, positional: Option<&str>, action: &str) -> Result<String> {
    flag.or(positional)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| WmError::input(format!("Provide a session identifier to {}.", action)))
}
