//! The global session history.
//!
//! A single JSON document `{ "history": [...] }` that records every session
//! ever created. History is advisory: a corrupt file is reported and treated
//! as empty, and appending to it recreates it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::expand_path;
use crate::error::Result;
use crate::output::Output;
use crate::session::now_iso8601;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryDocument {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// Outcome of reading the backing file.
enum Loaded {
    Missing,
    Corrupt(String),
    Entries(Vec<HistoryEntry>),
}

pub struct HistoryIndex {
    path: PathBuf,
    dry_run: bool,
    output: Output,
}

impl HistoryIndex {
    pub fn new(path: &Path, dry_run: bool, output: Output) -> Self {
        Self {
            path: path.to_path_buf(),
            dry_run,
            output,
        }
    }

    /// All entries in append order. Never fails on bad content.
    pub fn read(&self) -> Vec<HistoryEntry> {
        match self.load() {
            Loaded::Missing => Vec::new(),
            Loaded::Corrupt(reason) => {
                self.output.warn(format!(
                    "History file was corrupt ({}); ignoring it.",
                    reason
                ));
                Vec::new()
            }
            Loaded::Entries(entries) => entries,
        }
    }

    /// Record a new session. A corrupt file is replaced.
    pub fn append(&self, session_id: &str, workspace: &Path) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        let mut history = match self.load() {
            Loaded::Missing => Vec::new(),
            Loaded::Corrupt(_) => {
                self.output.warn("History file was corrupt; recreating it.");
                Vec::new()
            }
            Loaded::Entries(entries) => entries,
        };

        history.push(HistoryEntry {
            session_id: session_id.to_string(),
            workspace: Some(workspace.to_path_buf()),
            timestamp: now_iso8601(),
        });
        self.write(history)
    }

    /// Drop every entry for `session_id`; true when something was removed.
    pub fn remove(&self, session_id: &str) -> Result<bool> {
        let mut history = match self.load() {
            Loaded::Missing => return Ok(false),
            Loaded::Corrupt(reason) => {
                self.output
                    .warn(format!("Failed to parse history file: {}", reason));
                return Ok(false);
            }
            Loaded::Entries(entries) => entries,
        };

        let before = history.len();
        history.retain(|entry| entry.session_id != session_id);
        if history.len() == before {
            return Ok(false);
        }

        if !self.dry_run {
            self.write(history)?;
        }
        Ok(true)
    }

    fn load(&self) -> Loaded {
        if !self.path.exists() {
            return Loaded::Missing;
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return Loaded::Corrupt(e.to_string()),
        };
        match serde_json::from_str::<HistoryDocument>(&content) {
            Ok(doc) => Loaded::Entries(doc.history),
            Err(e) => Loaded::Corrupt(e.to_string()),
        }
    }

    fn write(&self, history: Vec<HistoryEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&HistoryDocument { history })?;
        fs::write(&self.path, content + "\n")?;
        Ok(())
    }
}

/// Latest entry recorded for `session_id`.
pub fn find_by_session<'a>(entries: &'a [HistoryEntry], session_id: &str) -> Option<&'a HistoryEntry> {
    entries.iter().rev().find(|e| e.session_id == session_id)
}

/// Latest entry whose workspace is `workspace`, compared as absolute paths
/// with `.` and `..` resolved.
pub fn find_by_workspace<'a>(entries: &'a [HistoryEntry], workspace: &Path) -> Option<&'a HistoryEntry> {
    let target = normalized(workspace);
    entries
        .iter()
        .rev()
        .find(|e| e.workspace.as_deref().is_some_and(|w| normalized(w) == target))
}

/// Entries ordered by timestamp, newest first unless `oldest_first`.
pub fn sorted_by_time(entries: &[HistoryEntry], oldest_first: bool) -> Vec<HistoryEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    if !oldest_first {
        sorted.reverse();
    }
    sorted
}

fn normalized(path: &Path) -> PathBuf {
    expand_path(&path.to_string_lossy())
}
