//! Level-tagged message output.
//!
//! Every line is prefixed with its level (`[INFO]`, `[WARN]`, ...). Color is
//! only applied when the target stream is a terminal, and debug lines are
//! suppressed unless verbose output was requested.

use std::io::IsTerminal;

use super::colors::*;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Success,
    Debug,
}

impl Level {
    pub fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
            Level::Debug => "DEBUG",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Level::Info => CYAN,
            Level::Warn => YELLOW,
            Level::Error => RED,
            Level::Success => GREEN,
            Level::Debug => GRAY,
        }
    }
}

/// Output sink handed to every component.
///
/// Cheap to copy; built once at startup from the verbosity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    verbose: bool,
    stdout_color: bool,
    stderr_color: bool,
}

impl Output {
    /// Detect color support from the attached streams.
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            stdout_color: std::io::stdout().is_terminal(),
            stderr_color: std::io::stderr().is_terminal(),
        }
    }

    /// Output without any color codes.
    pub fn plain(verbose: bool) -> Self {
        Self {
            verbose,
            stdout_color: false,
            stderr_color: false,
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(Level::Info, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.log(Level::Warn, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(Level::Error, msg.as_ref());
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        self.log(Level::Success, msg.as_ref());
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(Level::Debug, msg.as_ref());
    }

    pub fn log(&self, level: Level, msg: &str) {
        let Some(line) = self.format_line(level, msg) else {
            return;
        };
        if level == Level::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    /// Print a raw line to stdout (used for rendered blocks and paths).
    pub fn line(&self, text: impl AsRef<str>) {
        println!("{}", text.as_ref());
    }

    /// Wrap `text` in the color of `level` when stdout is a terminal.
    pub fn colorize(&self, text: &str, level: Level) -> String {
        if self.stdout_color {
            format!("{}{}{RESET}", level.color(), text)
        } else {
            text.to_string()
        }
    }

    fn format_line(&self, level: Level, msg: &str) -> Option<String> {
        if level == Level::Debug && !self.verbose {
            return None;
        }
        let color = if level == Level::Error {
            self.stderr_color
        } else {
            self.stdout_color
        };
        let tag = format!("[{}]", level.tag());
        if color {
            Some(format!("{}{}{RESET} {}", level.color(), tag, msg))
        } else {
            Some(format!("{} {}", tag, msg))
        }
    }
}
