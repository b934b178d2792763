// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use super::recognition::{ToolKind, ToolRecognizer};
use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

/// Creates static libraries from object files (`ar rcs libfoo.a a.o b.o`).
///
/// The first argument is the operation (with or without a dash), the next
/// one is the archive and the rest are the members. Only the operations
/// which insert members (`r` and `q`) produce a step with inputs and outputs,
/// the others (list, extract, delete) are no-op steps.
pub(super) struct Archiver {
    recognizer: Arc<ToolRecognizer>,
}

impl Archiver {
    pub(super) fn new(recognizer: Arc<ToolRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl BuildTool for Archiver {
    fn name(&self) -> &str {
        "archiver"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        self.recognizer.is_kind(command, conventions, ToolKind::Archiver)
    }

    fn create_step(&self, command: &CommandLine, _: &dyn PathConventions) -> Result<BuildStepInfo, ClassifyError> {
        let mut operation = String::new();
        let mut archive: Option<&String> = None;
        let mut members = vec![];
        let mut args = command.raw_args.iter();

        while let Some(arg) = args.next() {
            if arg == "--plugin" {
                args.next();
            } else if arg.starts_with("--") || arg.starts_with('@') {
                log::debug!("Archiver option is ignored: {arg}");
            } else if archive.is_none() && (operation.is_empty() || arg.starts_with('-')) {
                operation.push_str(arg.trim_start_matches('-'));
            } else if archive.is_none() {
                archive = Some(arg);
            } else {
                members.push(arg.clone());
            }
        }

        let archive = match archive {
            Some(archive) if !operation.is_empty() => archive,
            _ => return Err(ClassifyError::MissingOutput { command: command.to_string() }),
        };
        if operation.contains(['r', 'q']) {
            Ok(BuildStepInfo::new(command.clone(), members, vec![archive.clone()], false))
        } else {
            Ok(BuildStepInfo::no_op(command.clone()))
        }
    }
}
