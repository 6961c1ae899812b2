//! Editor launch.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, WmError};
use crate::output::Output;

pub trait EditorLauncher {
    /// Open `workspace` in the editor. A missing editor is not an error.
    fn launch(&self, workspace: &Path) -> Result<()>;
}

/// Runs the first editor executable found on `PATH`.
pub struct SystemEditor {
    candidates: Vec<String>,
    dry_run: bool,
    output: Output,
}

impl SystemEditor {
    pub fn new(candidates: &[String], dry_run: bool, output: Output) -> Self {
        Self {
            candidates: candidates.to_vec(),
            dry_run,
            output,
        }
    }

    fn find(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find_map(|name| which::which(name).ok())
    }
}

impl EditorLauncher for SystemEditor {
    fn launch(&self, workspace: &Path) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        let Some(editor) = self.find() else {
            self.output.warn(format!(
                "Editor CLI ({}) not found; skipping launch.",
                self.candidates.join("/")
            ));
            return Ok(());
        };

        self.output.debug(format!(
            "+ {} {}",
            editor.display(),
            workspace.display()
        ));
        let status = Command::new(&editor).arg(workspace).status()?;
        if !status.success() {
            return Err(WmError::CommandFailed {
                command: format!("{} {}", editor.display(), workspace.display()),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_editor_is_a_warning() {
        let editor = SystemEditor::new(
            &["wm-no-such-editor-3f9a".to_string()],
            false,
            Output::plain(false),
        );
        assert!(editor.find().is_none());
        assert!(editor.launch(Path::new("/ws/x.code-workspace")).is_ok());
    }

    #[test]
    fn test_dry_run_never_launches() {
        let editor = SystemEditor::new(&["sh".to_string()], true, Output::plain(false));
        assert!(editor.launch(Path::new("/ws/x.code-workspace")).is_ok());
    }
}
