//! Config command handler.
//!
//! Displays the effective workspace-manager configuration and writes the
//! commented template.

use crate::config::{effective_config_path, write_default_config, Config};
use crate::error::Result;
use crate::output::{Level, Output};

/// Display the effective configuration as TOML.
///
/// Environment overrides are already applied, so the output is what every
/// other command would run with.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn config_display_command(output: &Output) -> Result<()> {
    let config = Config::load()?;
    for line in config_display_lines(output, &config, config.config_path.is_file())? {
        output.line(line);
    }
    Ok(())
}

fn config_display_lines(output: &Output, config: &Config, file_exists: bool) -> Result<Vec<String>> {
    let mut lines = vec![
        output.colorize("# Effective config", Level::Info),
        output.colorize(&format!("# {}", config.config_path.display()), Level::Debug),
    ];
    if !file_exists {
        lines.push(output.colorize(
            "# (file does not exist, using environment settings)",
            Level::Warn,
        ));
    }
    lines.push(String::new());
    lines.push(config.to_toml()?.trim_end().to_string());
    Ok(lines)
}

/// Write the commented template to the effective config path.
///
/// An existing file is left untouched.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined or the file
/// cannot be written.
pub fn config_init_command(output: &Output) -> Result<()> {
    let path = effective_config_path()?;
    if write_default_config(&path)? {
        output.success(format!("Created config file {}", path.display()));
        output.info("Edit worktrees_root, workspaces_root and [search] patterns to match your setup.");
    } else {
        output.warn(format!(
            "Config file {} already exists; leaving it unchanged.",
            path.display()
        ));
    }
    Ok(())
}
