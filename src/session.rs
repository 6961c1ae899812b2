//! Session manifests and workspace files.
//!
//! A session is persisted as two JSON documents under the workspaces root:
//!
//! ```text
//! <workspaces_root>/
//! ├── <session_id>.json            # manifest, authoritative
//! ├── <session_id>.code-workspace  # editor folder list
//! ├── <session_id>/notes.md
//! └── archive/                     # pruned sessions, same layout
//! ```
//!
//! Both documents are staged together in a [`SessionState`] and written by
//! [`SessionStore::save`], manifest first.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, WmError};
use crate::output::Output;

pub const ARCHIVE_DIR: &str = "archive";
pub const MANIFEST_EXTENSION: &str = "json";
pub const WORKSPACE_EXTENSION: &str = "code-workspace";
pub const NOTES_FILE: &str = "notes.md";

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Lower-case `text` and collapse every run of other characters into `-`.
pub fn slugify(text: &str) -> Result<String> {
    let lowered = text.to_lowercase();
    let slug = NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();
    if slug.is_empty() {
        return Err(WmError::input(format!(
            "Unable to derive slug from '{}'",
            text
        )));
    }
    Ok(slug)
}

/// `slug--primary+a+b`, with the non-primary repos sorted.
pub fn session_id(slug: &str, primary: &str, others: &[String]) -> String {
    if others.is_empty() {
        return format!("{}--{}", slug, primary);
    }
    let mut tail: Vec<&str> = others.iter().map(String::as_str).collect();
    tail.sort_unstable();
    format!("{}--{}+{}", slug, primary, tail.join("+"))
}

/// Current UTC time, e.g. `2025-03-01T12:00:00Z`.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

// ============================================================================
// Documents
// ============================================================================

/// One provisioned repo of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(default)]
    pub repo: String,
    /// The source clone.
    #[serde(default)]
    pub root: PathBuf,
    #[serde(default)]
    pub worktree: PathBuf,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub base: String,
}

/// A plain folder attached to a session without a worktree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: PathBuf,
}

impl FolderEntry {
    /// Folder named after the last component of `path`.
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub feature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub repos: Vec<RepoEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<FolderEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// The stored slug, or one derived from the feature name.
    pub fn effective_slug(&self) -> Result<String> {
        if let Some(slug) = self.slug.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(slug.to_string());
        }
        if self.feature.trim().is_empty() {
            return Err(WmError::input(format!(
                "Manifest for {} missing slug; unable to extend.",
                self.session_id
            )));
        }
        slugify(&self.feature)
    }

    pub fn has_repo(&self, name: &str) -> bool {
        self.repos.iter().any(|r| r.repo == name)
    }

    /// Worktree paths followed by folder paths.
    pub fn folder_paths(&self) -> Vec<PathBuf> {
        self.repos
            .iter()
            .map(|r| r.worktree.clone())
            .chain(self.folders.iter().map(|f| f.path.clone()))
            .collect()
    }
}

/// One entry of the workspace `folders` list.
///
/// Entries without a `path` (for example `{"uri": ...}` folders added in the
/// editor) are carried through untouched and never compared to the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    #[serde(default, skip_serializing_if = "path_is_empty")]
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkspaceFolder {
    pub fn new(path: PathBuf, name: &str) -> Self {
        Self {
            path,
            name: Some(name.to_string()),
            extra: Map::new(),
        }
    }

    /// True for entries that point at a local path.
    pub fn is_local(&self) -> bool {
        !path_is_empty(&self.path)
    }
}

fn path_is_empty(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

/// The editor-facing document. Keys besides `folders` survive rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default, deserialize_with = "lenient_folders")]
    pub folders: Vec<WorkspaceFolder>,
    #[serde(default = "empty_object")]
    pub settings: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for WorkspaceFile {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            settings: empty_object(),
            extra: Map::new(),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Keep the folder entries that decode; a malformed entry or a non-array
/// `folders` value must not cost the rest of the document.
fn lenient_folders<'de, D>(deserializer: D) -> std::result::Result<Vec<WorkspaceFolder>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl WorkspaceFile {
    pub fn contains(&self, path: &Path) -> bool {
        self.folders.iter().any(|f| f.is_local() && f.path == path)
    }

    /// Folder list derived from a manifest.
    fn folders_for(manifest: &Manifest) -> Vec<WorkspaceFolder> {
        manifest
            .repos
            .iter()
            .map(|r| WorkspaceFolder::new(r.worktree.clone(), &r.repo))
            .chain(
                manifest
                    .folders
                    .iter()
                    .map(|f| WorkspaceFolder::new(f.path.clone(), &f.name)),
            )
            .collect()
    }
}

// ============================================================================
// Staged state
// ============================================================================

/// A manifest and workspace file that are updated together.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub manifest: Manifest,
    pub workspace: WorkspaceFile,
}

impl SessionState {
    pub fn new(session_id: &str, feature: &str, slug: &str) -> Self {
        Self {
            manifest: Manifest {
                session_id: session_id.to_string(),
                feature: feature.to_string(),
                slug: Some(slug.to_string()),
                created_at: Some(now_iso8601()),
                ..Manifest::default()
            },
            workspace: WorkspaceFile::default(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.manifest.session_id
    }

    /// Stage a repo. Rejects a repeated repo name or worktree path.
    pub fn add_repo(&mut self, entry: RepoEntry) -> Result<()> {
        if self.manifest.has_repo(&entry.repo) {
            return Err(WmError::input(format!(
                "Repos already part of session: {}",
                entry.repo
            )));
        }
        if self.workspace.contains(&entry.worktree) {
            return Err(WmError::input(format!(
                "Worktree already present for repo '{}'.",
                entry.repo
            )));
        }
        self.workspace
            .folders
            .push(WorkspaceFolder::new(entry.worktree.clone(), &entry.repo));
        self.manifest.repos.push(entry);
        Ok(())
    }

    /// Stage a plain folder. Rejects a path already in the workspace.
    pub fn add_folder(&mut self, entry: FolderEntry) -> Result<()> {
        if self.workspace.contains(&entry.path) {
            return Err(WmError::input(format!(
                "Folder already present in workspace: {}",
                entry.path.display()
            )));
        }
        self.workspace
            .folders
            .push(WorkspaceFolder::new(entry.path.clone(), &entry.name));
        self.manifest.folders.push(entry);
        Ok(())
    }

    /// Replace the branch recorded for `repo` once provisioning has run.
    pub fn set_branch(&mut self, repo: &str, branch: &str) {
        if let Some(entry) = self.manifest.repos.iter_mut().find(|r| r.repo == repo) {
            entry.branch = branch.to_string();
        }
    }

    /// Both documents must list exactly the same folder paths.
    pub fn validate(&self) -> Result<()> {
        let expected = self.manifest.folder_paths();
        let actual: Vec<&PathBuf> = self
            .workspace
            .folders
            .iter()
            .filter(|f| f.is_local())
            .map(|f| &f.path)
            .collect();

        let expected_set: HashSet<&PathBuf> = expected.iter().collect();
        let actual_set: HashSet<&PathBuf> = actual.iter().copied().collect();

        if expected_set.len() != expected.len() {
            return Err(self.inconsistent("manifest lists a path more than once"));
        }
        if actual_set.len() != actual.len() {
            return Err(self.inconsistent("workspace file lists a folder more than once"));
        }
        if expected_set != actual_set {
            return Err(self.inconsistent("workspace folders do not match the manifest"));
        }
        Ok(())
    }

    /// Rebuild the workspace folder list from the manifest if they diverged.
    /// Entries without a local path are kept after the rebuilt ones.
    ///
    /// Returns true when the workspace was changed.
    pub fn reconcile(&mut self) -> bool {
        if self.validate().is_ok() {
            return false;
        }
        let foreign: Vec<WorkspaceFolder> = self
            .workspace
            .folders
            .drain(..)
            .filter(|f| !f.is_local())
            .collect();
        self.workspace.folders = WorkspaceFile::folders_for(&self.manifest);
        self.workspace.folders.extend(foreign);
        true
    }

    fn inconsistent(&self, message: &str) -> WmError {
        WmError::Inconsistent {
            session: self.manifest.session_id.clone(),
            message: message.to_string(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Locations of one session's artifacts inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub manifest: PathBuf,
    pub workspace: PathBuf,
    pub session_dir: PathBuf,
}

impl SessionPaths {
    pub fn in_dir(dir: &Path, session_id: &str) -> Self {
        Self {
            manifest: dir.join(format!("{}.{}", session_id, MANIFEST_EXTENSION)),
            workspace: dir.join(format!("{}.{}", session_id, WORKSPACE_EXTENSION)),
            session_dir: dir.join(session_id),
        }
    }

    /// Items that are moved or deleted as a unit.
    pub fn artifacts(&self) -> [&Path; 3] {
        [&self.workspace, &self.manifest, &self.session_dir]
    }
}

pub struct SessionStore {
    root: PathBuf,
    dry_run: bool,
    output: Output,
}

impl SessionStore {
    pub fn new(root: &Path, dry_run: bool, output: Output) -> Self {
        Self {
            root: root.to_path_buf(),
            dry_run,
            output,
        }
    }

    pub fn paths(&self, session_id: &str) -> SessionPaths {
        SessionPaths::in_dir(&self.root, session_id)
    }

    pub fn archived_paths(&self, session_id: &str) -> SessionPaths {
        SessionPaths::in_dir(&self.root.join(ARCHIVE_DIR), session_id)
    }

    /// Load the live manifest and workspace file of an existing session.
    ///
    /// A diverged pair is repaired in memory from the manifest.
    pub fn load(&self, session_id: &str) -> Result<SessionState> {
        let paths = self.paths(session_id);
        if !paths.manifest.is_file() {
            return Err(WmError::ManifestNotFound(session_id.to_string()));
        }
        if !paths.workspace.is_file() {
            return Err(WmError::WorkspaceNotFound(session_id.to_string()));
        }

        let manifest = read_manifest_at(&paths.manifest, session_id)?;
        let workspace = match read_json::<WorkspaceFile>(&paths.workspace) {
            Ok(workspace) => workspace,
            Err(e) => {
                self.output.warn(format!(
                    "Workspace file {} could not be parsed ({}); rebuilding it from the manifest",
                    paths.workspace.display(),
                    e
                ));
                WorkspaceFile::default()
            }
        };

        let mut state = SessionState {
            manifest,
            workspace,
        };
        if state.reconcile() {
            self.output.warn(format!(
                "Workspace folders for {} did not match the manifest; rebuilt from the manifest",
                session_id
            ));
        }
        Ok(state)
    }

    /// Read the live manifest; missing or unparsable is an error.
    pub fn read_manifest(&self, session_id: &str) -> Result<Manifest> {
        let path = self.paths(session_id).manifest;
        if !path.is_file() {
            return Err(WmError::ManifestNotFound(session_id.to_string()));
        }
        read_manifest_at(&path, session_id)
    }

    /// Read a manifest for display or cleanup; problems become `None`.
    pub fn try_read_manifest(&self, path: &Path) -> Option<Manifest> {
        if !path.is_file() {
            return None;
        }
        match read_json::<Manifest>(path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                self.output.warn(format!(
                    "Failed to parse manifest {}: {}",
                    path.display(),
                    e
                ));
                None
            }
        }
    }

    /// Validate, then write the manifest followed by the workspace file.
    pub fn save(&self, state: &SessionState) -> Result<SessionPaths> {
        state.validate()?;
        let paths = self.paths(state.session_id());
        self.write_json(&paths.manifest, &state.manifest)?;
        self.write_json(&paths.workspace, &state.workspace)?;
        Ok(paths)
    }

    pub fn ensure_session_dir(&self, session_id: &str) -> Result<PathBuf> {
        let dir = self.paths(session_id).session_dir;
        if !self.dry_run {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Write `notes.md` once; an existing file is left alone.
    ///
    /// Returns true when the file was written.
    pub fn prefill_notes(&self, session_id: &str, text: Option<&str>) -> Result<bool> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        if self.dry_run {
            return Ok(false);
        }

        let dir = self.ensure_session_dir(session_id)?;
        let notes = dir.join(NOTES_FILE);
        if notes.exists() {
            return Ok(false);
        }
        fs::write(&notes, format!("# Notes\n\n{}\n", text))?;
        Ok(true)
    }

    /// Move the live workspace file, manifest and session dir into `archive/`.
    ///
    /// Missing items are skipped. Returns the archived destinations.
    pub fn archive(&self, session_id: &str) -> Result<Vec<PathBuf>> {
        let live = self.paths(session_id);
        let archived = self.archived_paths(session_id);
        let archive_dir = self.root.join(ARCHIVE_DIR);

        if !self.dry_run {
            fs::create_dir_all(&archive_dir)?;
        }

        let mut moved = Vec::new();
        for (from, to) in live.artifacts().into_iter().zip(archived.artifacts()) {
            if !from.exists() {
                continue;
            }
            self.output.info(format!(
                "Archiving {} to {}",
                from.display(),
                to.display()
            ));
            if !self.dry_run {
                remove_path(to)?;
                fs::rename(from, to)?;
            }
            moved.push(to.to_path_buf());
        }
        Ok(moved)
    }

    /// Delete every live and archived artifact of a session.
    ///
    /// Returns the paths that existed.
    pub fn delete_all(&self, session_id: &str) -> Result<Vec<PathBuf>> {
        let live = self.paths(session_id);
        let archived = self.archived_paths(session_id);

        let mut deleted = Vec::new();
        for path in live.artifacts().into_iter().chain(archived.artifacts()) {
            if !path.exists() {
                continue;
            }
            self.output.info(format!("Deleting {}", path.display()));
            if !self.dry_run {
                remove_path(path)?;
            }
            deleted.push(path.to_path_buf());
        }
        Ok(deleted)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if self.dry_run {
            self.output
                .info(format!("[dry-run] Would write {}", path.display()));
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(value)?;
        fs::write(path, content + "\n")?;
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_manifest_at(path: &Path, session_id: &str) -> Result<Manifest> {
    read_json(path).map_err(|e| WmError::ManifestParse {
        session: session_id.to_string(),
        message: e.to_string(),
    })
}

/// Remove a file or directory tree if it exists.
fn remove_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
