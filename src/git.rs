//! Git command execution.
//!
//! All git invocations target a specific clone through `git -C <repo>`. The
//! [`GitBackend`] trait is the seam the provisioner talks to; [`GitCli`] is
//! the real implementation that shells out to the `git` executable.

use crate::error::{Result, WmError};
use crate::output::Output;
use crate::worktree::{parse_worktree_list_porcelain, WorktreeInfo};
use std::path::Path;
use std::process::{Command, Stdio};

pub trait GitBackend {
    /// Fail early when git cannot be run at all.
    fn ensure_available(&self) -> Result<()>;

    /// `git rev-parse --verify <branch>`; false for a missing repo directory.
    fn branch_exists(&self, repo: &Path, branch: &str) -> bool;

    /// `git fetch --all --prune`
    fn fetch_all(&self, repo: &Path) -> Result<()>;

    /// `git worktree add <path> <branch>` for an existing branch.
    fn add_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()>;

    /// `git worktree add -b <branch> <path> <base>`
    fn add_worktree_new_branch(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<()>;

    /// `git worktree prune`
    fn prune_worktrees(&self, repo: &Path) -> Result<()>;

    /// `git branch -D <branch>`
    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()>;

    /// `git worktree list --porcelain`
    fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>>;
}

/// Shells out to the `git` executable.
///
/// Mutating commands are logged at debug level and skipped in dry-run mode;
/// read-only queries always run.
#[derive(Debug, Clone, Copy)]
pub struct GitCli {
    dry_run: bool,
    output: Output,
}

impl GitCli {
    pub fn new(dry_run: bool, output: Output) -> Self {
        Self { dry_run, output }
    }

    /// Run a mutating git command in `repo`.
    fn run(&self, repo: &Path, args: &[&str]) -> Result<()> {
        let display = command_line(repo, args);
        self.output.debug(format!("+ {}", display));
        if self.dry_run {
            return Ok(());
        }

        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(WmError::CommandFailed {
                command: display,
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(())
    }

    /// Run a read-only git command and capture stdout.
    fn query(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(WmError::CommandFailed {
                command: command_line(repo, args),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl GitBackend for GitCli {
    fn ensure_available(&self) -> Result<()> {
        which::which("git")
            .map(|_| ())
            .map_err(|_| WmError::MissingCommand("git".to_string()))
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> bool {
        if !repo.is_dir() {
            return false;
        }
        Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(["rev-parse", "--verify", "--quiet", branch])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["fetch", "--all", "--prune"])
    }

    fn add_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        let path = path.to_string_lossy();
        self.run(repo, &["worktree", "add", path.as_ref(), branch])
    }

    fn add_worktree_new_branch(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<()> {
        let path = path.to_string_lossy();
        self.run(repo, &["worktree", "add", "-b", branch, path.as_ref(), base])
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.run(repo, &["worktree", "prune"])
    }

    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.run(repo, &["branch", "-D", branch])
    }

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>> {
        let stdout = self.query(repo, &["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list_porcelain(&stdout))
    }
}

/// Human-readable form of a git invocation, used in logs and errors.
fn command_line(repo: &Path, args: &[&str]) -> String {
    let mut parts = vec![
        "git".to_string(),
        "-C".to_string(),
        quote(&repo.to_string_lossy()),
    ];
    parts.extend(args.iter().map(|a| quote(a)));
    parts.join(" ")
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
