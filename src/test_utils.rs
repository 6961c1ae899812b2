//! Test utilities shared across modules.
//!
//! In-memory stand-ins for every collaborator a [`Workbench`] talks to, and a
//! [`Fixture`] that wires them up over a temporary directory.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::commands::Workbench;
use crate::config::{Config, RunOptions};
use crate::editor::EditorLauncher;
use crate::error::{Result, WmError};
use crate::git::GitBackend;
use crate::locator::RepoSource;
use crate::output::Output;
use crate::prompt::{NonInteractive, Prompter};
use crate::worktree::WorktreeInfo;

// ============================================================================
// Git
// ============================================================================

/// A mutating call received by [`FakeGit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Fetch(PathBuf),
    Add {
        repo: PathBuf,
        path: PathBuf,
        branch: String,
    },
    AddNewBranch {
        repo: PathBuf,
        path: PathBuf,
        branch: String,
        base: String,
    },
    Prune(PathBuf),
    DeleteBranch(PathBuf, String),
}

/// Records git calls and keeps branches and worktrees in memory.
///
/// Adding a worktree creates its directory with a `.git` file so the path
/// looks populated afterwards, the way a real checkout would.
#[derive(Debug, Default)]
pub struct FakeGit {
    branches: RefCell<HashMap<PathBuf, HashSet<String>>>,
    worktrees: RefCell<Vec<(PathBuf, PathBuf, String)>>,
    calls: RefCell<Vec<GitCall>>,
    fail_add: Cell<bool>,
    fail_delete: Cell<bool>,
    dry_run: Cell<bool>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(self, root: &Path, branch: &str) -> Self {
        self.add_branch(root, branch);
        self
    }

    pub fn with_worktree(self, root: &Path, path: &Path, branch: &str) -> Self {
        self.register_worktree(root, path, branch);
        self
    }

    pub fn failing_add(self) -> Self {
        self.fail_add.set(true);
        self
    }

    pub fn failing_delete(self) -> Self {
        self.fail_delete.set(true);
        self
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.set(true);
    }

    pub fn add_branch(&self, root: &Path, branch: &str) {
        self.branches
            .borrow_mut()
            .entry(root.to_path_buf())
            .or_default()
            .insert(branch.to_string());
    }

    /// Register a worktree (and its branch) without touching the filesystem.
    pub fn register_worktree(&self, root: &Path, path: &Path, branch: &str) {
        self.add_branch(root, branch);
        self.worktrees
            .borrow_mut()
            .push((root.to_path_buf(), path.to_path_buf(), branch.to_string()));
    }

    pub fn has_branch(&self, root: &Path, branch: &str) -> bool {
        self.branches
            .borrow()
            .get(root)
            .is_some_and(|set| set.contains(branch))
    }

    pub fn mutations(&self) -> Vec<GitCall> {
        self.calls.borrow().clone()
    }

    /// Record `call`; false when nothing should actually change.
    fn record(&self, call: GitCall) -> bool {
        if self.dry_run.get() {
            return false;
        }
        self.calls.borrow_mut().push(call);
        true
    }

    fn checkout(&self, root: &Path, path: &Path, branch: &str) -> Result<()> {
        fs::create_dir_all(path)?;
        fs::write(path.join(".git"), format!("gitdir: {}\n", root.display()))?;
        self.register_worktree(root, path, branch);
        Ok(())
    }

    fn failure(command: &str) -> WmError {
        WmError::CommandFailed {
            command: format!("git {}", command),
            stderr: "fatal: simulated failure".to_string(),
        }
    }
}

impl GitBackend for FakeGit {
    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> bool {
        self.has_branch(repo, branch)
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        self.record(GitCall::Fetch(repo.to_path_buf()));
        Ok(())
    }

    fn add_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        if self.fail_add.get() {
            return Err(Self::failure("worktree add"));
        }
        let call = GitCall::Add {
            repo: repo.to_path_buf(),
            path: path.to_path_buf(),
            branch: branch.to_string(),
        };
        if self.record(call) {
            self.checkout(repo, path, branch)?;
        }
        Ok(())
    }

    fn add_worktree_new_branch(
        &self,
        repo: &Path,
        path: &Path,
        branch: &str,
        base: &str,
    ) -> Result<()> {
        if self.fail_add.get() || self.has_branch(repo, branch) {
            return Err(Self::failure("worktree add -b"));
        }
        let call = GitCall::AddNewBranch {
            repo: repo.to_path_buf(),
            path: path.to_path_buf(),
            branch: branch.to_string(),
            base: base.to_string(),
        };
        if self.record(call) {
            self.checkout(repo, path, branch)?;
        }
        Ok(())
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        if self.record(GitCall::Prune(repo.to_path_buf())) {
            self.worktrees
                .borrow_mut()
                .retain(|(root, path, _)| root != repo || path.exists());
        }
        Ok(())
    }

    fn delete_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        if self.fail_delete.get() {
            return Err(Self::failure("branch -D"));
        }
        if self.record(GitCall::DeleteBranch(repo.to_path_buf(), branch.to_string())) {
            if let Some(set) = self.branches.borrow_mut().get_mut(repo) {
                set.remove(branch);
            }
        }
        Ok(())
    }

    fn list_worktrees(&self, repo: &Path) -> Result<Vec<WorktreeInfo>> {
        Ok(self
            .worktrees
            .borrow()
            .iter()
            .filter(|(root, _, _)| root == repo)
            .map(|(_, path, branch)| WorktreeInfo {
                path: path.clone(),
                branch: Some(branch.clone()),
            })
            .collect())
    }
}

// ============================================================================
// Prompts, repos, editor
// ============================================================================

/// Answers questions from a script and remembers what was asked.
///
/// Running out of scripted answers behaves like EOF.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    confirms: RefCell<Vec<bool>>,
    choices: RefCell<Vec<usize>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirms(self, answers: Vec<bool>) -> Self {
        *self.confirms.borrow_mut() = answers;
        self
    }

    pub fn chooses(self, answers: Vec<usize>) -> Self {
        *self.choices.borrow_mut() = answers;
        self
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        true
    }

    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        self.asked.borrow_mut().push(question.to_string());
        let mut answers = self.confirms.borrow_mut();
        if answers.is_empty() {
            return Err(WmError::SelectionCancelled);
        }
        Ok(answers.remove(0))
    }

    fn choose(&self, question: &str, _options: &[String]) -> Result<usize> {
        self.asked.borrow_mut().push(question.to_string());
        let mut answers = self.choices.borrow_mut();
        if answers.is_empty() {
            return Err(WmError::SelectionCancelled);
        }
        Ok(answers.remove(0))
    }
}

/// Fixed token to clone mapping.
#[derive(Debug, Default, Clone)]
pub struct StubLocator {
    repos: HashMap<String, Vec<PathBuf>>,
}

impl StubLocator {
    pub fn insert(&mut self, token: &str, path: PathBuf) {
        self.repos.entry(token.to_string()).or_default().push(path);
    }
}

impl RepoSource for StubLocator {
    fn candidates(&self, token: &str) -> Vec<PathBuf> {
        self.repos.get(token.trim()).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct RecordingEditor {
    launched: RefCell<Vec<PathBuf>>,
}

impl RecordingEditor {
    pub fn launched(&self) -> Vec<PathBuf> {
        self.launched.borrow().clone()
    }

    pub fn clear(&self) {
        self.launched.borrow_mut().clear();
    }
}

impl EditorLauncher for RecordingEditor {
    fn launch(&self, workspace: &Path) -> Result<()> {
        self.launched.borrow_mut().push(workspace.to_path_buf());
        Ok(())
    }
}

// ============================================================================
// Fixture
// ============================================================================

/// A temp directory laid out as
///
/// ```text
/// <tmp>/code/<repo>        clones registered with `with_repo`
/// <tmp>/mirror/<repo>      second clone for `with_ambiguous_repo`
/// <tmp>/worktrees          worktrees_root
/// <tmp>/workspaces         workspaces_root
/// <tmp>/state/history.json history_file
/// ```
pub struct Fixture {
    pub temp_dir: TempDir,
    pub config: Config,
    pub options: RunOptions,
    pub git: FakeGit,
    pub editor: RecordingEditor,
    pub locator: StubLocator,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let config = Config {
            config_path: root.join("config.toml"),
            worktrees_root: root.join("worktrees"),
            workspaces_root: root.join("workspaces"),
            history_file: root.join("state").join("history.json"),
            default_base: "main".to_string(),
            branch_prefix: "feature/".to_string(),
            editors: vec!["wm-test-editor".to_string()],
            search_patterns: Vec::new(),
        };
        Self {
            temp_dir,
            config,
            options: RunOptions::default(),
            git: FakeGit::new(),
            editor: RecordingEditor::default(),
            locator: StubLocator::default(),
        }
    }

    pub fn with_repo(mut self, name: &str) -> Self {
        let path = self.mkdir(&format!("code/{}", name));
        self.locator.insert(name, path);
        self
    }

    /// Two clones named `name`: `code/<name>` first, `mirror/<name>` second.
    pub fn with_ambiguous_repo(mut self, name: &str) -> Self {
        for parent in ["code", "mirror"] {
            let path = self.mkdir(&format!("{}/{}", parent, name));
            self.locator.insert(name, path);
        }
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.options.dry_run = true;
        self.git.dry_run.set(true);
        self
    }

    pub fn no_open(mut self) -> Self {
        self.options.no_open = true;
        self
    }

    pub fn repo_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("code").join(name)
    }

    pub fn mkdir(&self, relative: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn bench(&self) -> Workbench<'_> {
        self.bench_with_prompter(&NonInteractive)
    }

    pub fn bench_with_prompter<'a>(&'a self, prompter: &'a dyn Prompter) -> Workbench<'a> {
        Workbench {
            config: &self.config,
            options: &self.options,
            git: &self.git,
            prompter,
            repos: &self.locator,
            editor: &self.editor,
            output: Output::plain(false),
        }
    }

    pub fn bench_with_options<'a>(&'a self, options: &'a RunOptions) -> Workbench<'a> {
        Workbench {
            options,
            ..self.bench()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_git_tracks_worktrees_and_branches() {
        let fixture = Fixture::new().with_repo("svc-a");
        let root = fixture.repo_path("svc-a");
        let path = fixture.config.worktrees_root.join("svc-a/x");

        fixture
            .git
            .add_worktree_new_branch(&root, &path, "feature/x", "main")
            .unwrap();
        assert!(path.join(".git").is_file());
        assert!(fixture.git.branch_exists(&root, "feature/x"));
        assert!(fixture
            .git
            .add_worktree_new_branch(&root, &path, "feature/x", "main")
            .is_err());

        fs::remove_dir_all(&path).unwrap();
        fixture.git.prune_worktrees(&root).unwrap();
        assert!(fixture.git.list_worktrees(&root).unwrap().is_empty());
    }

    #[test]
    fn test_scripted_prompter_runs_out() {
        let prompter = ScriptedPrompter::new().confirms(vec![true]);
        assert!(prompter.confirm("a?", false).unwrap());
        assert!(matches!(
            prompter.confirm("b?", false),
            Err(WmError::SelectionCancelled)
        ));
        assert_eq!(prompter.questions(), vec!["a?", "b?"]);
    }
}
