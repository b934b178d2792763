// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context as AnyhowContext, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Application context containing runtime environment information.
///
/// Captured once at startup, so the configuration loading and the argument
/// resolution do not need to query the environment again.
#[derive(Debug, Clone)]
pub struct Context {
    /// Path to the current executable
    pub current_executable: PathBuf,
    /// Current working directory when the program was invoked
    pub current_directory: PathBuf,
}

impl Context {
    /// Capture the current application context.
    pub fn capture() -> Result<Self> {
        let current_executable =
            env::current_exe().with_context(|| "Failed to get current executable path")?;

        let current_directory =
            env::current_dir().with_context(|| "Failed to get current working directory")?;

        Ok(Context { current_executable, current_directory })
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Context:")?;
        writeln!(f, "Current Executable: {}", self.current_executable.display())?;
        write!(f, "Current Directory: {}", self.current_directory.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_capture() {
        let context = Context::capture();
        assert!(context.is_ok());

        let ctx = context.unwrap();

        assert!(ctx.current_directory.is_absolute());
        assert!(ctx.current_executable.is_absolute());
    }

    #[test]
    fn test_display_format() {
        let context = Context {
            current_executable: PathBuf::from("/usr/bin/makegraph"),
            current_directory: PathBuf::from("/project"),
        };

        let output = format!("{}", context);
        assert!(output.contains("Current Executable: /usr/bin/makegraph"));
        assert!(output.contains("Current Directory: /project"));
    }
}
