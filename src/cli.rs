//! Command-line definition for `wm`.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "wm")]
#[command(
    version,
    about = "Group multi-repository feature work into Git worktree sessions",
    after_help = "EXAMPLES:
    # Start a session across two repos
    wm init --feature \"Fix Bug\" svc-a svc-b

    # Add another repo and a docs folder later
    wm extend fix-bug--svc-a+svc-b svc-c --folder ~/docs/specs

    # Find and reopen sessions
    wm list --active
    wm open --recent 1

    # Clean up when done
    wm prune fix-bug--svc-a+svc-b     # archive, keep the files
    wm remove fix-bug--svc-a+svc-b    # delete everything"
)]
pub struct Cli {
    /// Show executed git commands and other debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log every change instead of making it
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a session with one worktree per repo
    #[command(after_help = "EXAMPLES:
    wm init --feature \"Fix Bug\" svc-a svc-b
    wm init --feature payments --primary api --base develop --base web:release web api
    wm init --feature spike --folder ~/notes --notes \"try the new client\" svc-a

BRANCHES:
    Each repo gets <branch_prefix><slug> (default feature/<slug>) created from
    its base branch. If the branch already exists you are asked whether to
    reuse it; non-interactive runs reuse it with a warning.")]
    Init {
        /// Feature name; slugified into the session id and branch name
        #[arg(long)]
        feature: String,

        /// Repo whose name comes first in the session id (default: first repo)
        #[arg(long)]
        primary: Option<String>,

        /// Base branch, or REPO:BRANCH to override a single repo
        #[arg(long = "base", value_name = "BRANCH|REPO:BRANCH")]
        bases: Vec<String>,

        /// Extra folder for the workspace: a directory path or a repo name
        #[arg(long = "folder", value_name = "SPEC")]
        folders: Vec<String>,

        /// Initial contents of the session notes file
        #[arg(long)]
        notes: Option<String>,

        /// Reuse existing feature branches without asking
        #[arg(long)]
        checkout_existing: bool,

        /// Do not launch the editor
        #[arg(long)]
        no_open: bool,

        /// Repos to include, by name
        #[arg(required = true)]
        repos: Vec<String>,
    },

    /// Add repos or folders to an existing session
    Extend {
        /// Session identifier (alternative to the first positional argument)
        #[arg(long)]
        session: Option<String>,

        /// Base branch, or REPO:BRANCH to override a single repo
        #[arg(long = "base", value_name = "BRANCH|REPO:BRANCH")]
        bases: Vec<String>,

        /// Extra folder for the workspace: a directory path or a repo name
        #[arg(long = "folder", value_name = "SPEC")]
        folders: Vec<String>,

        /// Reuse existing feature branches without asking
        #[arg(long)]
        checkout_existing: bool,

        /// Do not launch the editor
        #[arg(long)]
        no_open: bool,

        /// Session identifier (unless --session is given) followed by repos
        args: Vec<String>,
    },

    /// Show recorded sessions
    List {
        /// Show at most N sessions
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Only sessions whose worktrees or workspace file still exist
        #[arg(long)]
        active: bool,

        /// Print JSON instead of text blocks
        #[arg(long)]
        json: bool,

        /// Oldest first
        #[arg(long)]
        reverse: bool,
    },

    /// Print a session and open its workspace
    Open {
        /// Session identifier or workspace file path
        #[arg(long)]
        session: Option<String>,

        /// Session identifier or workspace file path
        id: Option<String>,

        /// Open the Nth most recent session (1 = newest)
        #[arg(long, value_name = "N")]
        recent: Option<usize>,

        /// Print the workspace path instead of launching the editor
        #[arg(long = "print")]
        print_only: bool,

        /// Do not launch the editor
        #[arg(long)]
        no_open: bool,
    },

    /// Remove worktrees and branches, archive the session files
    Prune {
        #[arg(long)]
        session: Option<String>,

        id: Option<String>,
    },

    /// Remove worktrees and branches, delete the session files and history
    Remove {
        #[arg(long)]
        session: Option<String>,

        id: Option<String>,
    },

    /// Show the effective configuration
    #[command(after_help = "CONFIG FILE:
    ~/.config/workspace-manager/config.toml
    (override the location with WORKSPACE_MANAGER_CONFIG_FILE)

ENVIRONMENT OVERRIDES:
    WORKSPACE_MANAGER_WORKTREES_ROOT
    WORKSPACE_MANAGER_WORKSPACES_ROOT
    WORKSPACE_MANAGER_HISTORY_FILE
    WORKSPACE_MANAGER_SEARCH_PATTERNS   (separated by , : or ;)
    WORKSPACE_MANAGER_DRY_RUN
    WORKSPACE_MANAGER_VERBOSE")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigSubcommand>,
    },

    /// Output shell completion script to stdout (hidden utility command)
    #[command(hide = true)]
    Completions {
        /// Shell type to generate completions for (bash, zsh, or fish)
        shell: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigSubcommand {
    /// Write a commented template config file (never overwrites)
    Init,
}

/// Split `wm extend` positionals into the session id and repos.
///
/// With `--session` every positional is a repo; otherwise the first one is
/// the session id.
pub fn split_extend_args(session: Option<&str>, args: &[String]) -> (Option<String>, Vec<String>) {
    match session {
        Some(id) => (Some(id.to_string()), args.to_vec()),
        None => match args.split_first() {
            Some((id, repos)) => (Some(id.clone()), repos.to_vec()),
            None => (None, Vec::new()),
        },
    }
}
