// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashSet;

use super::recognition::executable_name;
use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

const UTILITIES_MESSAGE: &str = "utilities";
const CONFIGURED_MESSAGE: &str = "configured to ignore";

/// A tool to ignore a command by the executable name.
///
/// The ignored commands become no-op steps: they are accounted for, but
/// do not contribute inputs or outputs to the build graph.
pub(super) struct IgnoreByName {
    executables: HashSet<String>,
    suffixes: &'static [&'static str],
    reason: &'static str,
}

impl IgnoreByName {
    pub(super) fn new() -> Self {
        let executables = UTILITY_FILES.iter().map(|name| name.to_string()).collect();
        Self { executables, suffixes: &UTILITY_SUFFIXES, reason: UTILITIES_MESSAGE }
    }

    pub(super) fn from(names: &[String]) -> Self {
        let executables = names.iter().cloned().collect();
        Self { executables, suffixes: &[], reason: CONFIGURED_MESSAGE }
    }
}

impl Default for IgnoreByName {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildTool for IgnoreByName {
    fn name(&self) -> &str {
        self.reason
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        let name = executable_name(command, conventions);
        self.executables.contains(name) || self.suffixes.iter().any(|suffix| name.ends_with(suffix))
    }

    fn create_step(&self, command: &CommandLine, _: &dyn PathConventions) -> Result<BuildStepInfo, ClassifyError> {
        Ok(BuildStepInfo::no_op(command.clone()))
    }
}

/// Binary utilities of the cross compiling toolchains (`arm-linux-androideabi-strip`).
const UTILITY_SUFFIXES: [&str; 6] = ["-strip", "-ranlib", "-objcopy", "-objdump", "-readelf", "-nm"];

#[rustfmt::skip]
const UTILITY_FILES: [&str; 52] = [
    // shell builtins and coreutils
    "[", "basename", "cat", "cd", "chmod", "cp", "dirname", "echo", "env", "exit",
    "false", "head", "install", "ln", "ls", "mkdir", "mv", "printf", "pwd",
    "rm", "rmdir", "sed", "sh", "tail", "test", "touch", "tr", "true", "awk", "grep",
    // Windows commands
    "cmd", "copy", "del", "echo.", "if", "md", "move", "rd", "xcopy", "type",
    "findstr",
    // build tools and binary utilities
    "make", "gmake", "mingw32-make", "strip", "ranlib", "objcopy", "objdump",
    "readelf", "nm", "llvm-strip", "llvm-objcopy",
];
