// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashSet;
use std::sync::LazyLock;

/// Checks if the argument names a file which the compiler can compile.
pub fn looks_like_a_source_file(argument: &str) -> bool {
    // not a command line flag
    if argument.starts_with('-') {
        return false;
    }
    match extension(argument) {
        Some(extension) => SOURCE_EXTENSIONS.contains(extension),
        None => false,
    }
}

/// Checks if the argument names a binary file (object file or library).
///
/// Binary files are not compilable source files and are typically used as
/// inputs to the linker or the archiver rather than the compiler.
pub fn is_binary_file(argument: &str) -> bool {
    if argument.starts_with('-') {
        return false;
    }
    match extension(argument) {
        Some(extension) => BINARY_EXTENSIONS.contains(extension.to_lowercase().as_str()),
        None => false,
    }
}

/// Checks if the source file is a C++ source, by the extension.
pub fn is_cpp_source(path: &str) -> bool {
    extension(path).is_some_and(|extension| CPP_EXTENSIONS.contains(extension))
}

/// The extension of the last path segment, for both path separators.
fn extension(path: &str) -> Option<&str> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => Some(extension),
        _ => None,
    }
}

#[rustfmt::skip]
static SOURCE_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        // C
        "c",
        // C++
        "C", "cc", "CC", "c++", "C++", "cxx", "cpp", "cp", "CPP",
        // ObjectiveC
        "m", "mm", "M",
        // Preprocessed
        "i", "ii",
        // Assembly
        "s", "S", "sx", "asm",
    ])
});

#[rustfmt::skip]
static CPP_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from(["C", "cc", "CC", "c++", "C++", "cxx", "cpp", "cp", "CPP", "mm", "ii"])
});

#[rustfmt::skip]
static BINARY_EXTENSIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        // Object files
        "o", "obj",
        // Static libraries
        "a", "lib",
        // Dynamic/shared libraries
        "so", "dylib", "dll",
    ])
});
