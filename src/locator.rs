//! Repository resolution.
//!
//! Turns a short repo name such as `svc-a` into candidate clone directories
//! using the configured search patterns. Each pattern is interpreted in one
//! of three ways:
//!
//! - `~/code/%{repo}`: placeholder, the token is substituted in
//! - `~/code/*`: glob, every match named `svc-a` and every `<match>/svc-a`
//! - `~/code`: literal directory, checked like a single glob match

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::config::expand_path;

pub const REPO_PLACEHOLDER: &str = "%{repo}";

/// Path segment that marks checked-out worktrees.
const WORKTREE_SEGMENT: &str = "worktrees";

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Source of candidate clone directories for a repo token.
pub trait RepoSource {
    /// Ordered, duplicate-free candidates; empty when nothing matches.
    fn candidates(&self, token: &str) -> Vec<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct RepoLocator {
    patterns: Vec<String>,
    worktrees_root: Option<PathBuf>,
}

impl RepoLocator {
    pub fn new(patterns: Vec<String>, worktrees_root: Option<PathBuf>) -> Self {
        Self {
            patterns,
            worktrees_root,
        }
    }

    fn matches_for(&self, pattern: &str, token: &str) -> Vec<PathBuf> {
        let expanded = shellexpand::tilde(pattern).into_owned();

        if expanded.contains(REPO_PLACEHOLDER) {
            let path = expand_path(&expanded.replace(REPO_PLACEHOLDER, token));
            return if path.is_dir() { vec![path] } else { Vec::new() };
        }

        let dirs: Vec<PathBuf> = if expanded.contains(GLOB_CHARS) {
            match glob::glob(&expanded) {
                Ok(paths) => paths.flatten().filter(|p| p.is_dir()).collect(),
                Err(_) => Vec::new(),
            }
        } else {
            let dir = expand_path(&expanded);
            if dir.is_dir() {
                vec![dir]
            } else {
                Vec::new()
            }
        };

        let mut found = Vec::new();
        for dir in dirs {
            if dir.file_name().is_some_and(|name| name == token) {
                found.push(dir.clone());
            }
            let nested = dir.join(token);
            if nested.is_dir() {
                found.push(nested);
            }
        }
        found
    }

    fn is_worktree_path(&self, path: &Path) -> bool {
        let in_segment = path
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == WORKTREE_SEGMENT));
        let under_root = self
            .worktrees_root
            .as_ref()
            .is_some_and(|root| path.starts_with(root));
        in_segment || under_root
    }
}

impl RepoSource for RepoLocator {
    fn candidates(&self, token: &str) -> Vec<PathBuf> {
        let token = token.trim();
        if token.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        self.patterns
            .iter()
            .flat_map(|pattern| self.matches_for(pattern, token))
            .map(|path| absolutize(&path))
            .filter(|path| !self.is_worktree_path(path))
            .filter(|path| seen.insert(path.clone()))
            .collect()
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
