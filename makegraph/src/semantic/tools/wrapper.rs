// SPDX-License-Identifier: GPL-3.0-or-later

//! Handling of the compiler wrappers like ccache, distcc, and sccache.
//!
//! The wrappers get the real compiler invocation as their arguments. The
//! wrapper is removed from the command and the rest is passed to the
//! delegate tools. The created step holds the real compiler command.

use super::combinators::Any;
use super::recognition::executable_name;
use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

pub(super) struct CompilerWrapper {
    delegate: Any,
}

impl CompilerWrapper {
    pub(super) fn new(delegate: Any) -> Self {
        Self { delegate }
    }

    /// Extracts the real compiler invocation from the wrapper invocation.
    fn unwrap(command: &CommandLine, conventions: &dyn PathConventions) -> Option<CommandLine> {
        match executable_name(command, conventions) {
            "ccache" | "sccache" => command.without_launcher(),
            "distcc" => Self::unwrap_distcc(command),
            _ => None,
        }
    }

    /// distcc can have its own options before the compiler.
    fn unwrap_distcc(command: &CommandLine) -> Option<CommandLine> {
        let mut current = command.clone();
        loop {
            let next = current.without_launcher()?;
            match current.raw_args.first().map(String::as_str) {
                Some("-j" | "--jobs") => current = next.without_launcher()?,
                Some(option) if option.starts_with('-') => current = next,
                _ => return Some(next),
            }
        }
    }
}

impl BuildTool for CompilerWrapper {
    fn name(&self) -> &str {
        "compiler wrapper"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        Self::unwrap(command, conventions)
            .is_some_and(|unwrapped| self.delegate.is_match(&unwrapped, conventions))
    }

    fn create_step(
        &self,
        command: &CommandLine,
        conventions: &dyn PathConventions,
    ) -> Result<BuildStepInfo, ClassifyError> {
        match Self::unwrap(command, conventions) {
            Some(unwrapped) => self.delegate.create_step(&unwrapped, conventions),
            None => Ok(BuildStepInfo::no_op(command.clone())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conventions::Posix;
    use crate::semantic::tools::compiler::NativeCompiler;
    use crate::semantic::tools::recognition::ToolRecognizer;
    use std::sync::Arc;

    fn wrapper() -> CompilerWrapper {
        let recognizer = Arc::new(ToolRecognizer::new());
        CompilerWrapper::new(Any::new(vec![Box::new(NativeCompiler::new(recognizer))]))
    }

    #[test]
    fn test_ccache_wrapped_compile() {
        let command = CommandLine::from_strs("/usr/bin/ccache", &["gcc", "-c", "a.c", "-o", "a.o"]);

        assert!(wrapper().is_match(&command, &Posix));
        let step = wrapper().create_step(&command, &Posix).unwrap();
        assert_eq!(step.command, CommandLine::from_strs("gcc", &["-c", "a.c", "-o", "a.o"]));
        assert_eq!(step.inputs, vec!["a.c"]);
        assert_eq!(step.outputs, vec!["a.o"]);
    }

    #[test]
    fn test_distcc_options_are_skipped() {
        let command = CommandLine::from_strs("distcc", &["-j", "4", "--verbose", "clang", "-c", "a.c"]);

        assert!(wrapper().is_match(&command, &Posix));
        let step = wrapper().create_step(&command, &Posix).unwrap();
        assert_eq!(step.command.executable, "clang");
    }

    #[test]
    fn test_wrapped_non_compiler_is_not_matched() {
        assert!(!wrapper().is_match(&CommandLine::from_strs("ccache", &["rm", "a.o"]), &Posix));
        assert!(!wrapper().is_match(&CommandLine::from_strs("ccache", &[]), &Posix));
        assert!(!wrapper().is_match(&CommandLine::from_strs("gcc", &["-c", "a.c"]), &Posix));
    }
}
