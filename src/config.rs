use crate::error::{Result, WmError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "workspace-manager";

/// The filename for the configuration file.
const CONFIG_FILENAME: &str = "config.toml";

pub const ENV_CONFIG_FILE: &str = "WORKSPACE_MANAGER_CONFIG_FILE";
pub const ENV_WORKTREES_ROOT: &str = "WORKSPACE_MANAGER_WORKTREES_ROOT";
pub const ENV_WORKSPACES_ROOT: &str = "WORKSPACE_MANAGER_WORKSPACES_ROOT";
pub const ENV_HISTORY_FILE: &str = "WORKSPACE_MANAGER_HISTORY_FILE";
pub const ENV_SEARCH_PATTERNS: &str = "WORKSPACE_MANAGER_SEARCH_PATTERNS";
pub const ENV_DRY_RUN: &str = "WORKSPACE_MANAGER_DRY_RUN";
pub const ENV_VERBOSE: &str = "WORKSPACE_MANAGER_VERBOSE";

pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_BRANCH_PREFIX: &str = "feature/";

// ============================================================================
// Config file representation
// ============================================================================

/// The on-disk shape of `config.toml`.
///
/// Every field is optional here; required settings are enforced when the
/// file is resolved into a [`Config`], so that environment variables can
/// fill the gaps.
///
/// # Example
///
/// ```toml
/// worktrees_root = "~/code/worktrees"
/// workspaces_root = "~/code/workspaces"
/// history_file = "~/.config/workspace-manager/history.json"
///
/// [search]
/// patterns = ["~/code/%{repo}", "~/code/*"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub worktrees_root: Option<String>,
    #[serde(default)]
    pub workspaces_root: Option<String>,
    #[serde(default)]
    pub history_file: Option<String>,
    #[serde(default)]
    pub default_base: Option<String>,
    #[serde(default)]
    pub branch_prefix: Option<String>,
    #[serde(default)]
    pub editors: Option<Vec<String>>,
    #[serde(default)]
    pub search: SearchSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSection {
    #[serde(default)]
    pub patterns: Vec<String>,
}

// ============================================================================
// Resolved configuration
// ============================================================================

/// Resolved, immutable settings shared by every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Where this configuration was (or would have been) loaded from.
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Parent of all worktrees: `<worktrees_root>/<repo>/<slug>`.
    pub worktrees_root: PathBuf,
    /// Holds manifests, workspace files, session dirs and `archive/`.
    pub workspaces_root: PathBuf,
    /// The global history index.
    pub history_file: PathBuf,
    /// Base branch used when no `--base` override applies.
    pub default_base: String,
    /// Prefix of the branch created for a session (`feature/<slug>`).
    pub branch_prefix: String,
    /// Editor executables tried in order when launching a workspace.
    pub editors: Vec<String>,
    /// Repository search patterns, see [`crate::locator`].
    pub search_patterns: Vec<String>,
}

impl Config {
    /// Load the configuration for this process.
    ///
    /// Reads the config file (path from `WORKSPACE_MANAGER_CONFIG_FILE` or
    /// `~/.config/workspace-manager/config.toml`) and applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but cannot be read or is invalid TOML
    /// - The config file is missing and the environment does not supply
    ///   every required setting
    /// - A required setting is missing
    /// - A search pattern contains `**`
    pub fn load() -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = config_path_from(&env)?;
        let file = read_config_file(&path)?;
        Self::resolve(path, file, &env)
    }

    /// Combine an optional config file with environment overrides.
    pub fn resolve(
        config_path: PathBuf,
        file: Option<ConfigFile>,
        env: &HashMap<String, String>,
    ) -> Result<Self> {
        let file_missing = file.is_none();
        let file = file.unwrap_or_default();

        let required = |key: &'static str, env_key: &'static str, value: &Option<String>| {
            let raw = env_value(env, env_key).or_else(|| non_blank(value.as_deref()));
            match raw {
                Some(raw) => Ok(expand_path(&raw)),
                None if file_missing => Err(WmError::MissingConfig(config_path.clone())),
                None => Err(WmError::MissingSetting {
                    key,
                    env: env_key,
                    path: config_path.clone(),
                }),
            }
        };

        let worktrees_root = required("worktrees_root", ENV_WORKTREES_ROOT, &file.worktrees_root)?;
        let workspaces_root =
            required("workspaces_root", ENV_WORKSPACES_ROOT, &file.workspaces_root)?;
        let history_file = required("history_file", ENV_HISTORY_FILE, &file.history_file)?;

        let search_patterns = match env_value(env, ENV_SEARCH_PATTERNS) {
            Some(raw) => split_list(&raw),
            None => normalize_list(&file.search.patterns),
        };
        validate_patterns(&search_patterns)?;

        let editors = file
            .editors
            .as_deref()
            .map(normalize_list)
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_editors);

        Ok(Self {
            config_path,
            worktrees_root,
            workspaces_root,
            history_file,
            default_base: non_blank(file.default_base.as_deref())
                .unwrap_or_else(|| DEFAULT_BASE_BRANCH.to_string()),
            branch_prefix: file
                .branch_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_BRANCH_PREFIX.to_string()),
            editors,
            search_patterns,
        })
    }

    /// Render the resolved configuration as TOML for display.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WmError::Config(format!("Failed to render configuration: {}", e)))
    }
}

fn default_editors() -> Vec<String> {
    vec!["code-insiders".to_string(), "code".to_string()]
}

/// Reject `**` globs; they make repository lookup walk entire trees.
pub fn validate_patterns(patterns: &[String]) -> Result<()> {
    if let Some(pattern) = patterns.iter().find(|p| p.contains("**")) {
        return Err(WmError::ProhibitedGlob(pattern.clone()));
    }
    Ok(())
}

// ============================================================================
// Run options
// ============================================================================

/// Per-invocation switches, kept apart from the immutable [`Config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log every mutation instead of performing it.
    pub dry_run: bool,
    /// Show debug lines (executed git commands).
    pub verbose: bool,
    /// Reuse an existing feature branch without asking.
    pub checkout_existing: bool,
    /// Never launch the editor.
    pub no_open: bool,
}

impl RunOptions {
    /// Start from the `WORKSPACE_MANAGER_DRY_RUN` / `_VERBOSE` environment switches.
    pub fn from_env() -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&env)
    }

    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        Self {
            dry_run: env.get(ENV_DRY_RUN).is_some_and(|v| truthy(v)),
            verbose: env.get(ENV_VERBOSE).is_some_and(|v| truthy(v)),
            ..Default::default()
        }
    }
}

// ============================================================================
// Config file management
// ============================================================================

/// Template written by `wm config init`.
const DEFAULT_CONFIG_WITH_COMMENTS: &str = r#"# workspace-manager configuration

# Parent directory of all worktrees: <worktrees_root>/<repo>/<slug>
worktrees_root = "~/code/worktrees"

# Manifests, .code-workspace files, notes and the archive/ folder live here
workspaces_root = "~/code/workspaces"

# Global session history index
history_file = "~/.config/workspace-manager/history.json"

# Base branch for new feature branches (override per run with --base)
default_base = "main"

# Feature branches are named <branch_prefix><slug>
branch_prefix = "feature/"

# Editor executables tried in order when opening a workspace
editors = ["code-insiders", "code"]

[search]
# Where to look for repository clones. Three kinds of pattern are supported:
# - "%{repo}" placeholder: ~/code/mirrors/%{repo}
# - glob (*, ?, [..]):      ~/code/*      (matches ~/code/<x>/<repo> and ~/code/<repo>)
# - plain directory:        ~/code/team   (matches ~/code/team/<repo>)
# Patterns containing "**" are rejected.
patterns = ["~/code/*"]
"#;

/// Get the workspace-manager config directory path (~/.config/workspace-manager/).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| WmError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Get the path to the default config file.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

fn config_path_from(env: &HashMap<String, String>) -> Result<PathBuf> {
    match env_value(env, ENV_CONFIG_FILE) {
        Some(path) => Ok(expand_path(&path)),
        None => default_config_path(),
    }
}

/// The config path this process would load.
pub fn effective_config_path() -> Result<PathBuf> {
    let env: HashMap<String, String> = std::env::vars().collect();
    config_path_from(&env)
}

/// Read and parse a config file; `Ok(None)` when it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.is_file() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let parsed: ConfigFile = toml::from_str(&content).map_err(|e| {
        WmError::Config(format!(
            "Failed to parse config file at {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(Some(parsed))
}

/// Write the commented template to `path`.
///
/// Returns `false` without touching anything when the file already exists.
pub fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_WITH_COMMENTS)?;
    Ok(true)
}

// ============================================================================
// Value helpers
// ============================================================================

/// Expand `~`, make the path absolute and drop `.` and `..` components.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(raw.trim()).as_ref());
    let absolute = std::path::absolute(&expanded).unwrap_or(expanded);
    normalize_lexically(&absolute)
}

/// Resolve `.` and `..` without touching the filesystem. Symlinks are not
/// followed, and `..` at the root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn env_value(env: &HashMap<String, String>, key: &str) -> Option<String> {
    non_blank(env.get(key).map(String::as_str))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split an environment list on `,`, `:` or `;`.
fn split_list(raw: &str) -> Vec<String> {
    let parts: Vec<String> = raw.split([',', ':', ';']).map(str::to_string).collect();
    normalize_list(&parts)
}

/// Trim, drop blanks, and deduplicate while keeping order.
fn normalize_list(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_file() -> ConfigFile {
        ConfigFile {
            worktrees_root: Some("/data/worktrees".to_string()),
            workspaces_root: Some("/data/workspaces".to_string()),
            history_file: Some("/data/history.json".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let config =
            Config::resolve(PathBuf::from("/cfg.toml"), Some(full_file()), &env(&[])).unwrap();
        assert_eq!(config.worktrees_root, PathBuf::from("/data/worktrees"));
        assert_eq!(config.default_base, "main");
        assert_eq!(config.branch_prefix, "feature/");
        assert_eq!(config.editors, vec!["code-insiders", "code"]);
        assert!(config.search_patterns.is_empty());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config::resolve(
            PathBuf::from("/cfg.toml"),
            Some(full_file()),
            &env(&[
                (ENV_WORKTREES_ROOT, "/env/worktrees"),
                (ENV_SEARCH_PATTERNS, "/a/*, /b/%{repo};/a/*"),
            ]),
        )
        .unwrap();
        assert_eq!(config.worktrees_root, PathBuf::from("/env/worktrees"));
        assert_eq!(config.workspaces_root, PathBuf::from("/data/workspaces"));
        assert_eq!(config.search_patterns, vec!["/a/*", "/b/%{repo}"]);
    }

    #[test]
    fn test_missing_file_tolerated_when_env_complete() {
        let config = Config::resolve(
            PathBuf::from("/missing.toml"),
            None,
            &env(&[
                (ENV_WORKTREES_ROOT, "/w"),
                (ENV_WORKSPACES_ROOT, "/s"),
                (ENV_HISTORY_FILE, "/h.json"),
            ]),
        )
        .unwrap();
        assert_eq!(config.history_file, PathBuf::from("/h.json"));
    }

    #[test]
    fn test_missing_file_reports_missing_config() {
        let err = Config::resolve(PathBuf::from("/missing.toml"), None, &env(&[])).unwrap_err();
        assert!(matches!(err, WmError::MissingConfig(ref p) if p == Path::new("/missing.toml")));
    }

    #[test]
    fn test_missing_setting_names_key() {
        let mut file = full_file();
        file.history_file = Some("   ".to_string());
        let err = Config::resolve(PathBuf::from("/cfg.toml"), Some(file), &env(&[])).unwrap_err();
        match err {
            WmError::MissingSetting { key, env, .. } => {
                assert_eq!(key, "history_file");
                assert_eq!(env, ENV_HISTORY_FILE);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_double_star_patterns_rejected() {
        let mut file = full_file();
        file.search.patterns = vec!["~/code/**/*".to_string()];
        let err = Config::resolve(PathBuf::from("/cfg.toml"), Some(file), &env(&[])).unwrap_err();
        assert!(matches!(err, WmError::ProhibitedGlob(_)));
    }

    #[test]
    fn test_tilde_is_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_path("~/code/worktrees"), home.join("code/worktrees"));
    }

    #[test]
    fn test_expand_path_collapses_dot_segments() {
        assert_eq!(
            expand_path("/a/b/../ws/./x.code-workspace"),
            PathBuf::from("/a/ws/x.code-workspace")
        );
        assert_eq!(expand_path("/../a"), PathBuf::from("/a"));
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("sub/../file"), normalize_lexically(&cwd).join("file"));
    }

    #[test]
    fn test_read_config_file_parses_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
worktrees_root = "/w"
workspaces_root = "/s"
history_file = "/h.json"
default_base = "develop"
unknown_key = 1

[search]
patterns = ["/code/*"]
"#,
        )
        .unwrap();

        let file = read_config_file(&path).unwrap().unwrap();
        assert_eq!(file.default_base.as_deref(), Some("develop"));
        assert_eq!(file.search.patterns, vec!["/code/*"]);
    }

    #[test]
    fn test_read_config_file_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_config_file(&temp_dir.path().join("nope.toml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_read_config_file_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "worktrees_root = [").unwrap();
        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, WmError::Config(_)));
    }

    #[test]
    fn test_default_template_is_valid_and_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(write_default_config(&path).unwrap());
        let file = read_config_file(&path).unwrap().unwrap();
        assert_eq!(file.branch_prefix.as_deref(), Some("feature/"));
        assert_eq!(file.search.patterns, vec!["~/code/*"]);

        fs::write(&path, "# mine\n").unwrap();
        assert!(!write_default_config(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine\n");
    }

    #[test]
    fn test_run_options_from_env() {
        let opts = RunOptions::from_env_map(&env(&[(ENV_DRY_RUN, "Yes"), (ENV_VERBOSE, "0")]));
        assert!(opts.dry_run);
        assert!(!opts.verbose);
        assert!(!opts.checkout_existing);
    }

    #[test]
    fn test_config_renders_as_toml() {
        let config =
            Config::resolve(PathBuf::from("/cfg.toml"), Some(full_file()), &env(&[])).unwrap();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("worktrees_root = \"/data/worktrees\""));
        assert!(rendered.contains("branch_prefix = \"feature/\""));
    }
}
