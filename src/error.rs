use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WmError {
    #[error("Config file {} is missing. Run 'wm config init' to create it.", .0.display())]
    MissingConfig(PathBuf),

    #[error("Missing setting '{key}' in {}. Run 'wm config init' or set {env}.", .path.display())]
    MissingSetting {
        key: &'static str,
        env: &'static str,
        path: PathBuf,
    },

    #[error("Prohibited glob pattern detected: '{0}'. Patterns containing '**' are not allowed.")]
    ProhibitedGlob(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unable to locate clone for '{0}'. Add it to your configured search patterns.")]
    RepoNotFound(String),

    #[error("Manifest not found for session: {0}")]
    ManifestNotFound(String),

    #[error("Workspace file not found for session: {0}")]
    WorkspaceNotFound(String),

    #[error("Session manifest for '{session}' could not be parsed: {message}")]
    ManifestParse { session: String, message: String },

    #[error("Session '{0}' not found in history or manifests.")]
    SessionNotFound(String),

    #[error("Session '{session}' is inconsistent: {message}")]
    Inconsistent { session: String, message: String },

    #[error("Missing required command '{0}'. Please install it first.")]
    MissingCommand(String),

    #[error("Command failed: {command}{}", format_stderr(.stderr))]
    CommandFailed { command: String, stderr: String },

    #[error("User interaction is not possible in non-interactive mode")]
    NotInteractive,

    #[error("Selection cancelled")]
    SelectionCancelled,

    #[error("Shell completion error: {0}")]
    ShellCompletion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WmError {
    pub fn input(message: impl Into<String>) -> Self {
        WmError::InvalidInput(message.into())
    }

    /// Configuration problems get an extra remediation line at the top level.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WmError::MissingConfig(_)
                | WmError::MissingSetting { .. }
                | WmError::ProhibitedGlob(_)
                | WmError::Config(_)
        )
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(" ({})", trimmed)
    }
}

pub type Result<T> = std::result::Result<T, WmError>;
