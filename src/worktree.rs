//! Worktree provisioning for workspace sessions.
//!
//! Each session repo gets its own worktree under
//! `<worktrees_root>/<repo>/<slug>`. [`WorktreeProvisioner::prepare`] decides
//! whether to create a new branch, reuse an existing one, or fall back to a
//! timestamp-suffixed branch; [`WorktreeProvisioner::teardown`] undoes it.

use crate::error::Result;
use crate::git::GitBackend;
use crate::output::Output;
use crate::prompt::Prompter;
use crate::session::RepoEntry;
use std::fs;
use std::path::{Path, PathBuf};

/// A worktree registered with git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    /// None for a detached HEAD or a bare entry
    pub branch: Option<String>,
}

impl WorktreeInfo {
    /// Parse a single worktree block of porcelain output.
    fn from_porcelain_lines(lines: &[&str]) -> Option<Self> {
        let mut path: Option<PathBuf> = None;
        let mut branch: Option<String> = None;

        for line in lines {
            if let Some(rest) = line.strip_prefix("worktree ") {
                path = Some(PathBuf::from(rest));
            } else if let Some(rest) = line.strip_prefix("branch ") {
                let name = rest.strip_prefix("refs/heads/").unwrap_or(rest);
                branch = Some(name.to_string());
            }
        }

        Some(WorktreeInfo {
            path: path?,
            branch,
        })
    }
}

/// Parse the output of `git worktree list --porcelain`.
///
/// Worktrees are separated by blank lines; the first one listed is the main
/// worktree.
pub fn parse_worktree_list_porcelain(output: &str) -> Vec<WorktreeInfo> {
    let mut worktrees = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in output.lines().chain(std::iter::once("")) {
        if !line.is_empty() {
            block.push(line);
            continue;
        }
        if block.is_empty() {
            continue;
        }
        if let Some(wt) = WorktreeInfo::from_porcelain_lines(&block) {
            worktrees.push(wt);
        }
        block.clear();
    }

    worktrees
}

/// Everything needed to provision one repo of a session.
#[derive(Debug, Clone)]
pub struct WorktreeRequest<'a> {
    pub repo_name: &'a str,
    /// The source clone.
    pub root: &'a Path,
    pub worktree: &'a Path,
    pub base: &'a str,
    pub branch: &'a str,
    /// Attach to an existing branch without asking.
    pub reuse: bool,
}

/// Terminal state of [`WorktreeProvisioner::prepare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    Reused,
    ReusedByDefault,
    CreatedWithSuffix,
    /// The target path already held a checkout; nothing was provisioned.
    Adopted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provision {
    /// The branch actually checked out, which may differ from the request.
    pub branch: String,
    pub outcome: ProvisionOutcome,
}

/// What [`WorktreeProvisioner::retire`] did with a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireOutcome {
    Skipped,
    WouldDelete,
    Deleted,
    Failed,
}

pub struct WorktreeProvisioner<'a> {
    git: &'a dyn GitBackend,
    prompter: &'a dyn Prompter,
    output: Output,
    dry_run: bool,
}

impl<'a> WorktreeProvisioner<'a> {
    pub fn new(
        git: &'a dyn GitBackend,
        prompter: &'a dyn Prompter,
        output: Output,
        dry_run: bool,
    ) -> Self {
        Self {
            git,
            prompter,
            output,
            dry_run,
        }
    }

    /// Create or reuse the worktree described by `request`.
    pub fn prepare(&self, request: &WorktreeRequest<'_>) -> Result<Provision> {
        if is_occupied(request.worktree) {
            self.output.warn(format!(
                "Worktree path {} already exists and is not empty; skipping provisioning for {}",
                request.worktree.display(),
                request.repo_name
            ));
            let branch = self
                .branch_at(request.root, request.worktree)
                .unwrap_or_else(|| request.branch.to_string());
            return Ok(Provision {
                branch,
                outcome: ProvisionOutcome::Adopted,
            });
        }

        if !self.git.branch_exists(request.root, request.branch) {
            self.create(request, request.branch)?;
            return Ok(Provision {
                branch: request.branch.to_string(),
                outcome: ProvisionOutcome::Created,
            });
        }

        if request.reuse {
            self.output.info(format!(
                "Reusing existing branch '{}' for {}",
                request.branch, request.repo_name
            ));
            self.attach(request)?;
            return Ok(Provision {
                branch: request.branch.to_string(),
                outcome: ProvisionOutcome::Reused,
            });
        }

        if !self.prompter.is_interactive() {
            self.output.warn(format!(
                "Branch '{}' already exists for {}; reusing it (non-interactive)",
                request.branch, request.repo_name
            ));
            self.attach(request)?;
            return Ok(Provision {
                branch: request.branch.to_string(),
                outcome: ProvisionOutcome::ReusedByDefault,
            });
        }

        let question = format!(
            "Branch '{}' already exists for {}. Reuse it?",
            request.branch, request.repo_name
        );
        if self.prompter.confirm(&question, true)? {
            self.attach(request)?;
            return Ok(Provision {
                branch: request.branch.to_string(),
                outcome: ProvisionOutcome::Reused,
            });
        }

        let suffixed = format!("{}-{}", request.branch, chrono::Utc::now().timestamp());
        self.output.info(format!(
            "Creating branch '{}' for {} instead",
            suffixed, request.repo_name
        ));
        self.create(request, &suffixed)?;
        Ok(Provision {
            branch: suffixed,
            outcome: ProvisionOutcome::CreatedWithSuffix,
        })
    }

    /// Delete a session worktree directory, then retire its branch.
    pub fn teardown(&self, entry: &RepoEntry) -> RetireOutcome {
        let worktree = &entry.worktree;
        if !worktree.as_os_str().is_empty() && worktree.exists() {
            if self.dry_run {
                self.output.info(format!(
                    "[dry-run] Would remove worktree {}",
                    worktree.display()
                ));
            } else if let Err(e) = fs::remove_dir_all(worktree) {
                self.output.warn(format!(
                    "Failed to remove worktree {}: {}",
                    worktree.display(),
                    e
                ));
            } else {
                self.output
                    .info(format!("Removed worktree {}", worktree.display()));
            }
        }

        self.retire(&entry.root, &entry.branch, &entry.base, &entry.repo)
    }

    /// Delete a session branch from its source clone.
    ///
    /// Never deletes the base branch. Git failures are reported as warnings.
    pub fn retire(&self, root: &Path, branch: &str, base: &str, repo_name: &str) -> RetireOutcome {
        let branch = branch.trim();
        if branch.is_empty() || root.as_os_str().is_empty() || branch == base.trim() {
            return RetireOutcome::Skipped;
        }

        let label = if repo_name.is_empty() {
            root.display().to_string()
        } else {
            repo_name.to_string()
        };

        if self.dry_run {
            self.output.info(format!(
                "[dry-run] Would delete branch '{}' in {}",
                branch, label
            ));
            return RetireOutcome::WouldDelete;
        }

        if !root.is_dir() {
            self.output.warn(format!(
                "Repo root {} is missing; skipping branch cleanup for '{}'",
                root.display(),
                branch
            ));
            return RetireOutcome::Skipped;
        }

        if !self.git.branch_exists(root, branch) {
            self.output.debug(format!(
                "Branch '{}' already absent in {}",
                branch, label
            ));
            return RetireOutcome::Skipped;
        }

        if let Err(e) = self.git.prune_worktrees(root) {
            self.output
                .warn(format!("Failed to prune worktrees in {}: {}", label, e));
        }

        match self.git.delete_branch(root, branch) {
            Ok(()) => {
                self.output
                    .info(format!("Deleted branch '{}' in {}", branch, label));
                RetireOutcome::Deleted
            }
            Err(e) => {
                self.output.warn(format!(
                    "Failed to delete branch '{}' in {}: {}",
                    branch, label, e
                ));
                RetireOutcome::Failed
            }
        }
    }

    /// The branch git has checked out at `path`, if it is a worktree of `root`.
    pub fn branch_at(&self, root: &Path, path: &Path) -> Option<String> {
        let target = normalize(path);
        self.git
            .list_worktrees(root)
            .ok()?
            .into_iter()
            .find(|wt| normalize(&wt.path) == target)
            .and_then(|wt| wt.branch)
    }

    fn create(&self, request: &WorktreeRequest<'_>, branch: &str) -> Result<()> {
        self.ensure_parent(request.worktree)?;
        self.git.fetch_all(request.root)?;
        self.git
            .add_worktree_new_branch(request.root, request.worktree, branch, request.base)?;
        self.output.success(format!(
            "Created worktree {} on '{}' from '{}'",
            request.worktree.display(),
            branch,
            request.base
        ));
        Ok(())
    }

    fn attach(&self, request: &WorktreeRequest<'_>) -> Result<()> {
        self.ensure_parent(request.worktree)?;
        self.git
            .add_worktree(request.root, request.worktree, request.branch)?;
        self.output.success(format!(
            "Created worktree {} on existing '{}'",
            request.worktree.display(),
            request.branch
        ));
        Ok(())
    }

    fn ensure_parent(&self, worktree: &Path) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        if let Some(parent) = worktree.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

/// A directory with at least one entry.
fn is_occupied(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
