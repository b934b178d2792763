// SPDX-License-Identifier: GPL-3.0-or-later

//! Recognition of the toolchain executables by their file names.
//!
//! The executable names are matched with regular expressions, so the cross
//! compiling variants (`arm-linux-androideabi-gcc`) and the versioned ones
//! (`clang-15`) are recognized without listing them one by one.

use crate::command::CommandLine;
use crate::conventions::PathConventions;
use regex_lite::Regex;
use std::collections::HashMap;

/// The kinds of toolchain executables we can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    /// A compiler driver, which compiles (with `-c`) or links.
    Compiler,
    /// A static library archiver.
    Archiver,
    /// A linker which is invoked directly.
    Linker,
}

/// Recognizes the kind of an executable from its file name.
pub struct ToolRecognizer {
    names: HashMap<String, ToolKind>,
    patterns: Vec<(ToolKind, Regex)>,
}

impl ToolRecognizer {
    /// Creates a recognizer with the default patterns.
    pub fn new() -> Self {
        // matches gcc, g++, cc, c++, cross-compilation variants, and versioned variants
        let gcc_pattern = Regex::new(r"^(?:[^/]*-)?(?:gcc|g\+\+|cc|c\+\+)(?:-[\d.]+)?$")
            .expect("Invalid GCC regex pattern");
        // matches clang, clang++, cross-compilation variants, and versioned variants
        let clang_pattern = Regex::new(r"^(?:[^/]*-)?clang(?:\+\+)?(?:-[\d.]+)?$")
            .expect("Invalid Clang regex pattern");
        // matches ar, llvm-ar, gcc-ar and the cross-compilation variants
        let archiver_pattern = Regex::new(r"^(?:[^/]*-)?ar(?:-[\d.]+)?$")
            .expect("Invalid archiver regex pattern");
        // matches ld, ld.gold, ld.bfd, ld.lld, lld and the cross-compilation variants
        let linker_pattern =
            Regex::new(r"^(?:[^/]*-)?(?:ld(?:\.(?:lld|gold|bfd))?|lld)(?:-[\d.]+)?$")
                .expect("Invalid linker regex pattern");

        Self {
            names: HashMap::new(),
            patterns: vec![
                (ToolKind::Compiler, gcc_pattern),
                (ToolKind::Compiler, clang_pattern),
                (ToolKind::Archiver, archiver_pattern),
                (ToolKind::Linker, linker_pattern),
            ],
        }
    }

    /// Creates a recognizer which knows only the given executable names.
    pub fn from_names(names: impl IntoIterator<Item = (String, ToolKind)>) -> Self {
        Self { names: names.into_iter().collect(), patterns: vec![] }
    }

    /// Recognizes the kind of the command's executable.
    pub fn recognize(&self, command: &CommandLine, conventions: &dyn PathConventions) -> Option<ToolKind> {
        let name = executable_name(command, conventions);
        if let Some(kind) = self.names.get(name) {
            return Some(*kind);
        }
        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(name))
            .map(|(kind, _)| *kind)
    }

    pub fn is_kind(&self, command: &CommandLine, conventions: &dyn PathConventions, kind: ToolKind) -> bool {
        self.recognize(command, conventions) == Some(kind)
    }
}

impl Default for ToolRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The file name of the executable without the `.exe` extension.
pub fn executable_name<'a>(command: &'a CommandLine, conventions: &dyn PathConventions) -> &'a str {
    let name = conventions.file_name(&command.executable);
    let split = name.len().saturating_sub(4);
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(extension)) if !stem.is_empty() && extension.eq_ignore_ascii_case(".exe") => stem,
        _ => name,
    }
}
