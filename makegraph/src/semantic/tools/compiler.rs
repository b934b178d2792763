// SPDX-License-Identifier: GPL-3.0-or-later

//! Recognition of the GCC and Clang compiler invocations.
//!
//! The compile invocations (with `-c`) are validated against the flag table.
//! Every flag must be known, otherwise the step can't be trusted: an unknown
//! flag might consume the next argument, which would then be taken for the
//! source file.

use std::sync::Arc;

use super::recognition::{ToolKind, ToolRecognizer};
use super::source::looks_like_a_source_file;
use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::flags::{classify_flag, FlagClass};
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

/// Compiles a single source file into an object file.
pub(super) struct NativeCompiler {
    recognizer: Arc<ToolRecognizer>,
}

impl NativeCompiler {
    pub(super) fn new(recognizer: Arc<ToolRecognizer>) -> Self {
        Self { recognizer }
    }
}

impl BuildTool for NativeCompiler {
    fn name(&self) -> &str {
        "compiler"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        self.recognizer.is_kind(command, conventions, ToolKind::Compiler)
            && command.raw_args.iter().any(|arg| arg == "-c")
    }

    fn create_step(
        &self,
        command: &CommandLine,
        conventions: &dyn PathConventions,
    ) -> Result<BuildStepInfo, ClassifyError> {
        let arguments = CompileArguments::parse(command)?;

        let source = match arguments.sources.as_slice() {
            [] => return Err(ClassifyError::MissingSource { command: command.to_string() }),
            [source] => source.clone(),
            _ => return Err(ClassifyError::MultipleSources { command: command.to_string() }),
        };
        let output = arguments.output.unwrap_or_else(|| default_object_name(&source, conventions));

        Ok(BuildStepInfo::new(command.clone(), vec![source], vec![output], true))
    }
}

/// Compiler invocations which do not compile anything.
///
/// The build scripts often ask the compiler about its version or its target
/// (`gcc -dumpmachine`), or run the preprocessor only. These produce no files.
pub(super) struct CompilerQuery {
    recognizer: Arc<ToolRecognizer>,
}

impl CompilerQuery {
    pub(super) fn new(recognizer: Arc<ToolRecognizer>) -> Self {
        Self { recognizer }
    }

    fn is_query(argument: &str) -> bool {
        matches!(argument, "-E" | "--version" | "--help" | "-###" | "-M" | "-MM")
            || argument.starts_with("-dump")
            || argument.starts_with("-print-")
            || argument.starts_with("--print-")
    }
}

impl BuildTool for CompilerQuery {
    fn name(&self) -> &str {
        "compiler query"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        if !self.recognizer.is_kind(command, conventions, ToolKind::Compiler) {
            return false;
        }
        match command.raw_args.as_slice() {
            [] => true,
            [single] if single == "-v" => true,
            args => args.iter().any(|arg| Self::is_query(arg)),
        }
    }

    fn create_step(&self, command: &CommandLine, _: &dyn PathConventions) -> Result<BuildStepInfo, ClassifyError> {
        Ok(BuildStepInfo::no_op(command.clone()))
    }
}

/// The flags of a compile command, as they are needed to compile the source
/// on its own.
///
/// These are the escaped arguments without the source file and without the
/// output (`-o <output>` or `-o<output>`).
pub fn source_flags(command: &CommandLine, source: &str) -> Vec<String> {
    let mut flags = Vec::with_capacity(command.escaped_args.len());
    let mut skip_next = false;
    let mut keep_next = false;

    for (raw, escaped) in command.raw_args.iter().zip(&command.escaped_args) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if keep_next {
            keep_next = false;
            flags.push(escaped.clone());
            continue;
        }
        if raw == "-o" {
            skip_next = true;
        } else if raw.starts_with("-o") {
            continue;
        } else if raw.starts_with('-') {
            keep_next = classify_flag(raw) == FlagClass::ConsumesNextArg;
            flags.push(escaped.clone());
        } else if raw != source && !looks_like_a_source_file(raw) {
            flags.push(escaped.clone());
        }
    }
    flags
}

/// The relevant arguments of a compile command.
#[derive(Debug, Default, PartialEq)]
struct CompileArguments {
    sources: Vec<String>,
    output: Option<String>,
}

impl CompileArguments {
    fn parse(command: &CommandLine) -> Result<Self, ClassifyError> {
        let mut result = Self::default();
        let mut language_given = false;
        let mut args = command.raw_args.iter();

        while let Some(arg) = args.next() {
            if arg == "-o" {
                let output = Self::argument_of(arg, args.next(), command)?;
                result.output = Some(output.clone());
            } else if let Some(output) = arg.strip_prefix("-o") {
                result.output = Some(output.to_string());
            } else if arg.starts_with('@') {
                log::debug!("Response file is not followed: {arg}");
            } else if arg.starts_with('-') {
                match classify_flag(arg) {
                    FlagClass::Standalone => {
                        language_given |= arg.starts_with("-x");
                    }
                    FlagClass::ConsumesNextArg => {
                        Self::argument_of(arg, args.next(), command)?;
                        language_given |= arg == "-x";
                    }
                    FlagClass::Unknown => {
                        return Err(ClassifyError::UnknownCompilerFlag {
                            flag: arg.clone(),
                            command: command.to_string(),
                        });
                    }
                }
            } else if language_given || looks_like_a_source_file(arg) {
                result.sources.push(arg.clone());
            } else {
                log::debug!("Argument is not a source file: {arg}");
            }
        }
        Ok(result)
    }

    fn argument_of<'a>(
        flag: &str,
        argument: Option<&'a String>,
        command: &CommandLine,
    ) -> Result<&'a String, ClassifyError> {
        argument.ok_or_else(|| ClassifyError::MissingFlagArgument {
            flag: flag.to_string(),
            command: command.to_string(),
        })
    }
}

/// The compiler writes the object file into the current directory, named
/// after the source file.
fn default_object_name(source: &str, conventions: &dyn PathConventions) -> String {
    let name = conventions.file_name(source);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.o"),
        _ => format!("{name}.o"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conventions::{Posix, Windows};

    fn compiler() -> NativeCompiler {
        NativeCompiler::new(Arc::new(ToolRecognizer::new()))
    }

    #[test]
    fn test_compile_with_output() {
        let command = CommandLine::from_strs("gcc", &["-c", "-Ijni", "-DX=1", "jni/a.c", "-o", "obj/a.o"]);

        assert!(compiler().is_match(&command, &Posix));
        let step = compiler().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["jni/a.c"]);
        assert_eq!(step.outputs, vec!["obj/a.o"]);
        assert!(step.inputs_are_source_files);
    }

    #[test]
    fn test_compile_with_glued_output() {
        let command = CommandLine::from_strs("clang", &["-c", "a.c", "-oobj/a.o"]);

        let step = compiler().create_step(&command, &Posix).unwrap();
        assert_eq!(step.outputs, vec!["obj/a.o"]);
    }

    #[test]
    fn test_compile_without_output() {
        let command = CommandLine::from_strs("gcc", &["-c", "jni/src/main.cpp"]);

        let step = compiler().create_step(&command, &Posix).unwrap();
        assert_eq!(step.outputs, vec!["main.o"]);
    }

    #[test]
    fn test_compile_with_separate_arguments() {
        let command = CommandLine::from_strs(
            "clang",
            &["-c", "-I", "include.c", "-MF", "obj/a.o.d", "-target", "armv7-none-linux-androideabi", "a.c"],
        );

        let step = compiler().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["a.c"]);
    }

    #[test]
    fn test_compile_with_language_given() {
        let command = CommandLine::from_strs("gcc", &["-x", "c", "-c", "input.txt", "-o", "a.o"]);

        let step = compiler().create_step(&command, &Posix).unwrap();
        assert_eq!(step.inputs, vec!["input.txt"]);
    }

    #[test]
    fn test_windows_compiler() {
        let command = CommandLine::from_strs("C:\\ndk\\bin\\clang++.exe", &["-c", "C:\\jni\\a.cpp", "-o", "obj\\a.o"]);

        assert!(compiler().is_match(&command, &Windows));
        let step = compiler().create_step(&command, &Windows).unwrap();
        assert_eq!(step.inputs, vec!["C:\\jni\\a.cpp"]);
        assert_eq!(step.outputs, vec!["obj\\a.o"]);
    }

    #[test]
    fn test_unknown_flag_is_reported() {
        let command = CommandLine::from_strs("gcc", &["-c", "-qwerty", "a.c"]);

        let result = compiler().create_step(&command, &Posix);
        assert_eq!(
            result,
            Err(ClassifyError::UnknownCompilerFlag {
                flag: "-qwerty".to_string(),
                command: "gcc -c -qwerty a.c".to_string()
            })
        );
    }

    #[test]
    fn test_missing_flag_argument() {
        let command = CommandLine::from_strs("gcc", &["-c", "a.c", "-o"]);

        let result = compiler().create_step(&command, &Posix);
        assert!(matches!(result, Err(ClassifyError::MissingFlagArgument { flag, .. }) if flag == "-o"));
    }

    #[test]
    fn test_missing_and_multiple_sources() {
        let missing = CommandLine::from_strs("gcc", &["-c", "-o", "a.o"]);
        let multiple = CommandLine::from_strs("gcc", &["-c", "a.c", "b.c"]);

        assert!(matches!(compiler().create_step(&missing, &Posix), Err(ClassifyError::MissingSource { .. })));
        assert!(matches!(compiler().create_step(&multiple, &Posix), Err(ClassifyError::MultipleSources { .. })));
    }

    #[test]
    fn test_link_is_not_a_compile() {
        let command = CommandLine::from_strs("gcc", &["a.o", "-o", "a.so"]);

        assert!(!compiler().is_match(&command, &Posix));
    }

    #[test]
    fn test_compiler_queries() {
        let sut = CompilerQuery::new(Arc::new(ToolRecognizer::new()));

        for args in [vec!["--version"], vec!["-dumpmachine"], vec!["-print-libgcc-file-name"], vec![], vec!["-E", "a.c"]] {
            let command = CommandLine::from_strs("gcc", &args);
            assert!(sut.is_match(&command, &Posix), "{command}");
        }
        assert!(sut.is_match(&CommandLine::from_strs("clang", &["-v"]), &Posix));
        assert!(!sut.is_match(&CommandLine::from_strs("gcc", &["-c", "a.c"]), &Posix));
        assert!(!sut.is_match(&CommandLine::from_strs("gcc", &["-v", "-c", "a.c"]), &Posix));
        assert!(!sut.is_match(&CommandLine::from_strs("rm", &["--version"]), &Posix));
    }

    #[test]
    fn test_source_flags() {
        let command = CommandLine::new(
            "gcc",
            vec!["-c", "-DX=a b", "-I", "inc", "jni/a.c", "-o", "obj/a.o", "-O2"]
                .into_iter()
                .map(String::from)
                .collect(),
            vec!["-c", "-DX='a b'", "-I", "inc", "jni/a.c", "-o", "obj/a.o", "-O2"]
                .into_iter()
                .map(String::from)
                .collect(),
        );

        assert_eq!(source_flags(&command, "jni/a.c"), vec!["-c", "-DX='a b'", "-I", "inc", "-O2"]);
    }

    #[test]
    fn test_source_flags_with_language_given() {
        let command = CommandLine::from_strs("gcc", &["-x", "c", "-c", "input.txt", "-oa.o"]);

        assert_eq!(source_flags(&command, "input.txt"), vec!["-x", "c", "-c"]);
    }
}
