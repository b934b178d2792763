// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use super::recognition::{ToolKind, ToolRecognizer};
use super::source::{is_binary_file, looks_like_a_source_file};
use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::flags::{classify_flag, FlagClass};
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

const DEFAULT_OUTPUT: &str = "a.out";

/// Links objects and libraries into a shared library or an executable.
///
/// Recognizes the compiler drivers invoked without `-c`, and the linkers
/// invoked directly. The flags are not validated here, the linker flags are
/// too many to keep a table of them. The unknown flags are assumed to stand
/// alone.
///
/// When the command has source files only (`gcc main.c -o main`), it compiles
/// and links in one go: the step's inputs are the source files.
pub(super) struct Linker {
    recognizer: Arc<ToolRecognizer>,
}

impl Linker {
    pub(super) fn new(recognizer: Arc<ToolRecognizer>) -> Self {
        Self { recognizer }
    }

    fn consumes_next(flag: &str) -> bool {
        LINKER_ONE_ARG_FLAGS.contains(flag) || classify_flag(flag) == FlagClass::ConsumesNextArg
    }
}

impl BuildTool for Linker {
    fn name(&self) -> &str {
        "linker"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        match self.recognizer.recognize(command, conventions) {
            Some(ToolKind::Compiler) => !command.raw_args.iter().any(|arg| arg == "-c"),
            Some(ToolKind::Linker) => true,
            _ => false,
        }
    }

    fn create_step(&self, command: &CommandLine, _: &dyn PathConventions) -> Result<BuildStepInfo, ClassifyError> {
        let mut output = None;
        let mut binaries = vec![];
        let mut sources = vec![];
        let mut args = command.raw_args.iter();

        while let Some(arg) = args.next() {
            if arg == "-o" {
                let value = args.next().ok_or_else(|| ClassifyError::MissingFlagArgument {
                    flag: arg.clone(),
                    command: command.to_string(),
                })?;
                output = Some(value.clone());
            } else if let Some(value) = arg.strip_prefix("-o") {
                output = Some(value.to_string());
            } else if arg.starts_with('-') {
                if Self::consumes_next(arg) {
                    args.next();
                }
            } else if arg.starts_with('@') {
                log::debug!("Response file is not followed: {arg}");
            } else if is_binary_file(arg) {
                binaries.push(arg.clone());
            } else if looks_like_a_source_file(arg) {
                sources.push(arg.clone());
            }
        }

        let output = output.unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
        let step = if sources.is_empty() {
            BuildStepInfo::new(command.clone(), binaries, vec![output], false)
        } else {
            sources.extend(binaries);
            BuildStepInfo::new(command.clone(), sources, vec![output], true)
        };
        Ok(step)
    }
}

/// Flags of the linkers which take the next argument, and the compiler
/// driver does not know about them.
#[rustfmt::skip]
static LINKER_ONE_ARG_FLAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "-l", "-T", "-e", "-m", "-z", "-h", "-u", "-y", "-R", "-F",
        "-soname", "--soname", "-rpath", "--rpath", "-rpath-link", "--rpath-link",
        "-Map", "--version-script", "--dynamic-linker", "-dynamic-linker",
        "--entry", "--hash-style", "--build-id", "--exclude-libs", "--script",
        "--sysroot", "--undefined", "--wrap", "-plugin", "--plugin", "-plugin-opt",
    ])
});

#[cfg(test)]
mod test {
    use super::*;
    use crate::conventions::{Posix, Windows};

    fn linker() -> Linker {
        Linker::new(Arc::new(ToolRecognizer::new()))
    }

    #[test]
    fn test_shared_library_link() {
        let command = CommandLine::from_strs(
            "g++",
            &["-Wl,-soname,libfoo.so", "-shared", "obj/a.o", "obj/b.o", "obj/libdep.a", "-lc", "-lm", "-o", "libs/x86/libfoo.so"],
        );

        assert!(linker().is_match(&command, &Posix));
        let step = linker().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["obj/a.o", "obj/b.o", "obj/libdep.a"]);
        assert_eq!(step.outputs, vec!["libs/x86/libfoo.so"]);
        assert!(!step.inputs_are_source_files);
    }

    #[test]
    fn test_direct_linker_invocation() {
        let command = CommandLine::from_strs("ld.lld", &["-soname", "libx.so", "-shared", "a.o", "-o", "libx.so"]);

        assert!(linker().is_match(&command, &Posix));
        let step = linker().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["a.o"]);
        assert_eq!(step.outputs, vec!["libx.so"]);
    }

    #[test]
    fn test_flag_arguments_are_not_inputs() {
        let command = CommandLine::from_strs("clang", &["-L", "libs.o", "-target", "x.o", "a.o", "-oprog"]);

        let step = linker().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["a.o"]);
        assert_eq!(step.outputs, vec!["prog"]);
    }

    #[test]
    fn test_compile_and_link() {
        let command = CommandLine::from_strs("gcc", &["main.c", "util.c", "libz.a", "-o", "main"]);

        let step = linker().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["main.c", "util.c", "libz.a"]);
        assert_eq!(step.outputs, vec!["main"]);
        assert!(step.inputs_are_source_files);
    }

    #[test]
    fn test_default_output() {
        let command = CommandLine::from_strs("cc", &["a.o"]);

        let step = linker().create_step(&command, &Posix).unwrap();
        assert_eq!(step.outputs, vec!["a.out"]);
    }

    #[test]
    fn test_windows_linker() {
        let command = CommandLine::from_strs("C:\\ndk\\bin\\clang++.exe", &["-shared", "obj\\a.o", "-o", "libs\\x86\\libfoo.so"]);

        assert!(linker().is_match(&command, &Windows));
        let step = linker().create_step(&command, &Windows).unwrap();
        assert_eq!(step.inputs, vec!["obj\\a.o"]);
    }

    #[test]
    fn test_compile_is_not_a_link() {
        let command = CommandLine::from_strs("gcc", &["-c", "a.c"]);

        assert!(!linker().is_match(&command, &Posix));
        assert!(!linker().is_match(&CommandLine::from_strs("ar", &["rcs", "x.a"]), &Posix));
    }
}
