//! workspace-manager CLI entry point.
//!
//! Parses command-line arguments, resolves configuration and dispatches to
//! the appropriate command handler.

use clap::Parser;
use workspace_manager::cli::{split_extend_args, Cli, Commands, ConfigSubcommand};
use workspace_manager::commands::{
    config_display_command, config_init_command, extend_command, init_command, list_command,
    open_command, prune_command, remove_command, session_arg, ExtendRequest, InitRequest,
    ListOptions, OpenRequest, Workbench,
};
use workspace_manager::completion::{print_completion_script, ShellType, SUPPORTED_SHELLS};
use workspace_manager::config::{Config, RunOptions};
use workspace_manager::editor::SystemEditor;
use workspace_manager::git::GitCli;
use workspace_manager::locator::RepoLocator;
use workspace_manager::output::Output;
use workspace_manager::prompt::TerminalPrompter;
use workspace_manager::Result;

fn main() {
    let cli = Cli::parse();
    let options = run_options(&cli, RunOptions::from_env());
    let output = Output::new(options.verbose);

    if let Err(e) = run(cli, &options, output) {
        output.error(e.to_string());
        if e.is_config_error() {
            output.info("See 'wm config --help' for the config file location and environment overrides.");
        }
        std::process::exit(1);
    }
}

/// Merge command-line switches into the environment defaults.
fn run_options(cli: &Cli, env: RunOptions) -> RunOptions {
    let (checkout_existing, no_open) = match &cli.command {
        Commands::Init {
            checkout_existing,
            no_open,
            ..
        }
        | Commands::Extend {
            checkout_existing,
            no_open,
            ..
        } => (*checkout_existing, *no_open),
        Commands::Open {
            no_open,
            print_only,
            ..
        } => (false, *no_open || *print_only),
        _ => (false, false),
    };

    RunOptions {
        dry_run: env.dry_run || cli.dry_run,
        verbose: env.verbose || cli.verbose,
        checkout_existing,
        no_open,
    }
}

fn run(cli: Cli, options: &RunOptions, output: Output) -> Result<()> {
    // Commands that work without a resolved configuration
    match &cli.command {
        Commands::Completions { shell } => {
            let shell_type = ShellType::from_name(shell).inspect_err(|_| {
                output.info(format!("Supported shells: {}", SUPPORTED_SHELLS.join(", ")));
            })?;
            print_completion_script(shell_type);
            return Ok(());
        }
        Commands::Config { subcommand } => {
            return match subcommand {
                None => config_display_command(&output),
                Some(ConfigSubcommand::Init) => config_init_command(&output),
            };
        }
        _ => {}
    }

    let config = Config::load()?;
    if options.dry_run {
        output.debug("Dry-run: no files, branches or worktrees will be changed");
    }

    let git = GitCli::new(options.dry_run, output);
    let prompter = TerminalPrompter;
    let locator = RepoLocator::new(
        config.search_patterns.clone(),
        Some(config.worktrees_root.clone()),
    );
    let editor = SystemEditor::new(&config.editors, options.dry_run, output);
    let bench = Workbench {
        config: &config,
        options,
        git: &git,
        prompter: &prompter,
        repos: &locator,
        editor: &editor,
        output,
    };

    match cli.command {
        Commands::Init {
            feature,
            primary,
            bases,
            folders,
            notes,
            repos,
            ..
        } => {
            let request = InitRequest {
                feature,
                repos,
                primary,
                bases,
                folders,
                notes,
            };
            init_command(&bench, &request).map(|_| ())
        }

        Commands::Extend {
            session,
            bases,
            folders,
            args,
            ..
        } => {
            let (session_id, repos) = split_extend_args(session.as_deref(), &args);
            let request = ExtendRequest {
                session_id: session_arg(session_id.as_deref(), None, "extend")?,
                repos,
                bases,
                folders,
            };
            extend_command(&bench, &request).map(|_| ())
        }

        Commands::List {
            limit,
            active,
            json,
            reverse,
        } => {
            let list_options = ListOptions {
                active_only: active,
                limit,
                reverse,
                json,
            };
            list_command(&bench, &list_options).map(|_| ())
        }

        Commands::Open {
            session,
            id,
            recent,
            print_only,
            ..
        } => {
            let request = OpenRequest {
                token: session.or(id),
                recent,
                print_only,
            };
            open_command(&bench, &request).map(|_| ())
        }

        Commands::Prune { session, id } => {
            let session_id = session_arg(session.as_deref(), id.as_deref(), "prune")?;
            prune_command(&bench, &session_id).map(|_| ())
        }

        Commands::Remove { session, id } => {
            let session_id = session_arg(session.as_deref(), id.as_deref(), "remove")?;
            remove_command(&bench, &session_id).map(|_| ())
        }

        // Handled before the configuration is loaded
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}
