//! Shell completion scripts for `wm`.
//!
//! The scripts are generated by `clap_complete` from the same [`Cli`]
//! definition the binary parses, so they never drift from the real flags.
//!
//! ```text
//! wm completions zsh > ~/.zfunc/_wm
//! ```

use crate::cli::Cli;
use crate::error::{Result, WmError};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

/// Shell names accepted by `wm completions`.
pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

/// Supported shell types for completion scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    /// Convert to the `clap_complete::Shell` type.
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    /// Parse a shell name or a shell path such as `/usr/bin/zsh`.
    ///
    /// # Errors
    ///
    /// Returns `ShellCompletion` for anything other than bash, zsh or fish.
    pub fn from_name(name: &str) -> Result<Self> {
        let base = std::path::Path::new(name.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);

        match base {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            _ => Err(WmError::ShellCompletion(format!(
                "Unsupported shell: '{}'. Supported shells are: {}.",
                base,
                SUPPORTED_SHELLS.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Generate the completion script for `shell`.
pub fn generate_completion_script(shell: ShellType) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), &mut cmd, "wm", &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Print the completion script for `shell` to stdout.
pub fn print_completion_script(shell: ShellType) {
    print!("{}", generate_completion_script(shell));
}
