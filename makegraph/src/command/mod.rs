// SPDX-License-Identifier: GPL-3.0-or-later

//! This module provides the representation of a single shell invocation
//! found in a build trace.
//!
//! The commands are not executed, only read from the dry-run output of the
//! build tool. The parser which produces them lives in the `parser` module.

pub mod parser;

pub use parser::{parse, parse_traced, ParseError, TracedCommand};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents one command of the trace.
///
/// The `raw_args` are the arguments after quote removal and unescaping, as
/// the executed program would see them. The `escaped_args` keep the quoting
/// as it was written in the trace. That's relevant for flags like
/// `-DNAME='value with spaces'`, which would lose their meaning when written
/// out again without the quotes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandLine {
    pub executable: String,
    pub raw_args: Vec<String>,
    pub escaped_args: Vec<String>,
}

impl CommandLine {
    pub fn new(executable: impl Into<String>, raw_args: Vec<String>, escaped_args: Vec<String>) -> Self {
        Self { executable: executable.into(), raw_args, escaped_args }
    }

    /// Returns a command with the first argument promoted to be the executable.
    ///
    /// Used to look through launcher programs like `ccache gcc -c ...`.
    /// Returns `None` when there are no arguments.
    pub fn without_launcher(&self) -> Option<CommandLine> {
        let (executable, raw_args) = self.raw_args.split_first()?;
        let escaped_args = self.escaped_args.iter().skip(1).cloned().collect();
        Some(CommandLine::new(executable.clone(), raw_args.to_vec(), escaped_args))
    }

    /// Constructor method for testing purposes, when the raw and escaped
    /// arguments are the same.
    #[cfg(test)]
    pub fn from_strs(executable: &str, args: &[&str]) -> Self {
        let args: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        CommandLine::new(executable, args.clone(), args)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable)?;
        for arg in &self.escaped_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_display_uses_escaped_arguments() {
        let sut = CommandLine::new(
            "gcc",
            vec!["-DX=a b".to_string(), "-c".to_string()],
            vec!["-DX='a b'".to_string(), "-c".to_string()],
        );

        assert_eq!(sut.to_string(), "gcc -DX='a b' -c");
    }

    #[test]
    fn test_without_launcher() {
        let sut = CommandLine::from_strs("ccache", &["clang", "-c", "a.c"]);

        assert_eq!(sut.without_launcher(), Some(CommandLine::from_strs("clang", &["-c", "a.c"])));
        assert_eq!(CommandLine::from_strs("ccache", &[]).without_launcher(), None);
    }
}
