//! Terminal interaction.
//!
//! Every question the lifecycle commands may ask goes through [`Prompter`].
//! The terminal implementation refuses to prompt when stdin is not a TTY, and
//! [`NonInteractive`] refuses always, so a missing answer is never silently
//! replaced by a default.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::{Result, WmError};
use crate::output::{BOLD, CYAN, GRAY, GREEN, RESET, YELLOW};

pub trait Prompter {
    /// Whether questions can be asked at all.
    fn is_interactive(&self) -> bool;

    /// Ask a yes/no question.
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;

    /// Ask the user to pick one of `options`; returns the 0-based index.
    fn choose(&self, question: &str, options: &[String]) -> Result<usize>;
}

/// Prompts on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        if !self.is_interactive() {
            return Err(WmError::NotInteractive);
        }
        let stdin = io::stdin();
        confirm_with(&mut stdin.lock(), &mut io::stdout(), question, default)
    }

    fn choose(&self, question: &str, options: &[String]) -> Result<usize> {
        if !self.is_interactive() {
            return Err(WmError::NotInteractive);
        }
        let stdin = io::stdin();
        choose_with(&mut stdin.lock(), &mut io::stdout(), question, options)
    }
}

/// Used when no terminal may be consulted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn confirm(&self, _question: &str, _default: bool) -> Result<bool> {
        Err(WmError::NotInteractive)
    }

    fn choose(&self, _question: &str, _options: &[String]) -> Result<usize> {
        Err(WmError::NotInteractive)
    }
}

/// Yes/no loop over arbitrary streams. EOF cancels.
fn confirm_with(
    input: &mut impl BufRead,
    out: &mut impl Write,
    question: &str,
    default: bool,
) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(out, "{CYAN}?{RESET} {} {GRAY}{}{RESET} ", question, hint)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(WmError::SelectionCancelled);
        }

        match line.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(out, "{YELLOW}Please enter y or n.{RESET}")?,
        }
    }
}

/// Numbered selection loop; empty input picks the first option. EOF cancels.
fn choose_with(
    input: &mut impl BufRead,
    out: &mut impl Write,
    question: &str,
    options: &[String],
) -> Result<usize> {
    if options.is_empty() {
        return Err(WmError::input("Nothing to choose from"));
    }

    writeln!(out, "{CYAN}?{RESET} {}", question)?;
    for (i, option) in options.iter().enumerate() {
        let marker = if i == 0 {
            format!("{GREEN}>{RESET}")
        } else {
            " ".to_string()
        };
        writeln!(out, "  {} {BOLD}{}{RESET}. {}", marker, i + 1, option)?;
    }

    loop {
        write!(out, "{GRAY}Select option (1-{}) [1]:{RESET} ", options.len())?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(WmError::SelectionCancelled);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n >= 1 && n <= options.len() => return Ok(n - 1),
            _ => writeln!(
                out,
                "{YELLOW}Please enter a number between 1 and {}{RESET}",
                options.len()
            )?,
        }
    }
}
