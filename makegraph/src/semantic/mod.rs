// SPDX-License-Identifier: GPL-3.0-or-later

//! This module provides semantic recognition for the commands of a build
//! trace. It identifies compiler, archiver and linker invocations and turns
//! them into build steps with their inputs and outputs.
//!
//! The main abstractions are:
//! - `BuildTool`: recognizes one kind of command and creates its build step.
//! - `BuildStepInfo`: one recognized unit of work (compile, link, or no-op).
//! - `classify`: runs the recognizers over the commands in priority order.

pub mod flags;
pub mod statistics;
pub mod tools;

use crate::command::CommandLine;
use crate::conventions::{PathConventions, PathHandle};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Represents one recognized unit of work of the build.
///
/// Compiling `a.c` into `a.o` has `a.c` as input and `a.o` as output, and the
/// inputs are source files. Linking `a.o` into `a.so` has `a.o` as input and
/// `a.so` as output. Utility commands (copy, echo, etc.) are steps with
/// no inputs and outputs.
///
/// The paths are as they were written in the command. When the directory of
/// the command is known, relative paths are relative to it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildStepInfo {
    pub command: CommandLine,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub inputs_are_source_files: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

impl BuildStepInfo {
    pub fn new(
        command: CommandLine,
        inputs: Vec<String>,
        outputs: Vec<String>,
        inputs_are_source_files: bool,
    ) -> Self {
        Self { command, inputs, outputs, inputs_are_source_files, working_directory: None }
    }

    pub fn with_directory(self, working_directory: Option<String>) -> Self {
        Self { working_directory, ..self }
    }

    /// The canonical form of a path of the step, resolved against the
    /// directory of the command when that's known.
    pub fn location(&self, path: &str, conventions: &dyn PathConventions) -> PathHandle {
        match &self.working_directory {
            Some(directory) => conventions.join_paths(directory, path),
            None => conventions.to_canonical_path(path),
        }
    }

    /// A step which consumes the command, but does not contribute to the build graph.
    pub fn no_op(command: CommandLine) -> Self {
        Self::new(command, vec![], vec![], false)
    }

    pub fn is_no_op(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Recognizes a kind of command and creates the build step of it.
///
/// The recognizers are stateless. The path conventions of the trace are
/// passed in, because the executable names are platform specific
/// (`C:\ndk\clang.exe` vs. `/ndk/clang`).
pub trait BuildTool: Send + Sync {
    /// Name of the recognizer, used in log messages.
    fn name(&self) -> &str;

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool;

    /// Creates the build step of a matching command.
    ///
    /// Called only when `is_match` returned true for the command.
    fn create_step(
        &self,
        command: &CommandLine,
        conventions: &dyn PathConventions,
    ) -> Result<BuildStepInfo, ClassifyError>;
}

/// Represents the errors of a recognized command which can't be turned into
/// a build step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Unknown compiler flag '{flag}' in command: {command}")]
    UnknownCompilerFlag { flag: String, command: String },
    #[error("Flag '{flag}' is missing its argument in command: {command}")]
    MissingFlagArgument { flag: String, command: String },
    #[error("No source file found in compiler command: {command}")]
    MissingSource { command: String },
    #[error("Multiple source files found in compiler command: {command}")]
    MultipleSources { command: String },
    #[error("No output found in command: {command}")]
    MissingOutput { command: String },
}

/// The result of the classification.
///
/// Every command is either turned into one step, or it's listed as unclassified.
#[derive(Debug, Default, PartialEq)]
pub struct Classification {
    pub steps: Vec<BuildStepInfo>,
    pub unclassified: Vec<CommandLine>,
}

/// Assigns build steps to the commands.
///
/// The recognizers are tried in the given order, the first match wins.
/// Commands which are not recognized by any of them are collected, so the
/// caller can decide if that's a problem or not.
pub fn classify(
    commands: &[CommandLine],
    conventions: &dyn PathConventions,
    tools: &[Box<dyn BuildTool>],
) -> Result<Classification, ClassifyError> {
    let mut classification = Classification::default();

    for command in commands {
        match tools.iter().find(|tool| tool.is_match(command, conventions)) {
            Some(tool) => {
                let step = tool.create_step(command, conventions)?;
                log::debug!("Recognized by {}: {}", tool.name(), command);
                classification.steps.push(step);
            }
            None => {
                log::warn!("Command is not recognized: {}", command);
                classification.unclassified.push(command.clone());
            }
        }
    }
    Ok(classification)
}
