// SPDX-License-Identifier: GPL-3.0-or-later

//! Path handling for command traces recorded on different platforms.
//!
//! A trace is analyzed with the path rules of the machine which produced it,
//! not the machine running the analysis. This makes it possible to replay a
//! Windows trace on a POSIX host (and the other way around). The paths are
//! therefore kept as strings and never converted to `std::path::PathBuf`.
//!
//! There are two production implementations (`Posix` and `Windows`), and the
//! `Synthetic` decorator which replaces the path splitting of a base
//! implementation while delegating everything else to it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The escaping grammar of the shell which would execute the trace.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Grammar {
    /// Backslash escapes the next character, single and double quotes group.
    Posix,
    /// Backslashes are literal unless they precede a double quote.
    Windows,
}

/// The platform where a trace was recorded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    /// The platform this program is running on.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Posix => write!(f, "posix"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// Returns the path conventions of the given platform.
pub fn for_platform(platform: Platform) -> Arc<dyn PathConventions> {
    match platform {
        Platform::Posix => Arc::new(Posix),
        Platform::Windows => Arc::new(Windows),
    }
}

/// A platform neutral, lexically normalized path.
///
/// Separators are always `/`, the `.` segments are removed and the `..`
/// segments are folded where possible. A Windows drive prefix is kept
/// as it was written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathHandle(String);

impl PathHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        match name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => Some(extension),
            _ => None,
        }
    }
}

impl fmt::Display for PathHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PathHandle {
    /// Wraps an already canonical string. Use `PathConventions::to_canonical_path`
    /// for anything read from a trace.
    fn from(value: &str) -> Self {
        PathHandle(value.to_string())
    }
}

/// Answers the path questions of the trace's origin platform.
///
/// The implementations are stateless. For a path without any platform
/// specific syntax (forward slashes, no drive letter) all implementations
/// must give the same answers.
pub trait PathConventions: fmt::Debug + Send + Sync {
    /// The escaping grammar of the shell on this platform.
    fn grammar(&self) -> Grammar;

    fn is_absolute(&self, path: &str) -> bool;

    /// The last segment of the path. Trailing separators are ignored.
    fn file_name<'a>(&self, path: &'a str) -> &'a str;

    /// Everything before the last segment, or an empty string when
    /// the path has a single segment.
    fn parent<'a>(&self, path: &'a str) -> &'a str;

    fn to_canonical_path(&self, path: &str) -> PathHandle;

    /// Resolves `child` against `base`. An absolute `child` is returned
    /// as it is (after canonicalization).
    fn join_paths(&self, base: &str, child: &str) -> PathHandle {
        if self.is_absolute(child) || base.is_empty() {
            self.to_canonical_path(child)
        } else {
            self.to_canonical_path(&format!("{base}/{child}"))
        }
    }
}

/// Path conventions of Unix-like systems.
#[derive(Copy, Clone, Debug, Default)]
pub struct Posix;

impl PathConventions for Posix {
    fn grammar(&self) -> Grammar {
        Grammar::Posix
    }

    fn is_absolute(&self, path: &str) -> bool {
        path.starts_with('/')
    }

    fn file_name<'a>(&self, path: &'a str) -> &'a str {
        split_last(path, |c| c == '/').1
    }

    fn parent<'a>(&self, path: &'a str) -> &'a str {
        split_last(path, |c| c == '/').0
    }

    fn to_canonical_path(&self, path: &str) -> PathHandle {
        let rooted = path.starts_with('/');
        let prefix = if rooted { "/" } else { "" };
        PathHandle(normalize(prefix, rooted, path.split('/')))
    }
}

/// Path conventions of Windows, where both `\` and `/` are separators.
#[derive(Copy, Clone, Debug, Default)]
pub struct Windows;

impl Windows {
    fn is_separator(c: char) -> bool {
        c == '/' || c == '\\'
    }

    /// Splits the drive letter (`C:`) off the path.
    fn split_drive(path: &str) -> (&str, &str) {
        let bytes = path.as_bytes();
        if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
            path.split_at(2)
        } else {
            ("", path)
        }
    }
}

impl PathConventions for Windows {
    fn grammar(&self) -> Grammar {
        Grammar::Windows
    }

    fn is_absolute(&self, path: &str) -> bool {
        let (_, rest) = Self::split_drive(path);
        rest.starts_with(Self::is_separator)
    }

    fn file_name<'a>(&self, path: &'a str) -> &'a str {
        let (_, rest) = Self::split_drive(path);
        split_last(rest, Self::is_separator).1
    }

    fn parent<'a>(&self, path: &'a str) -> &'a str {
        let (drive, rest) = Self::split_drive(path);
        let (parent, _) = split_last(rest, Self::is_separator);
        if drive.is_empty() {
            parent
        } else {
            // the parent is a prefix of the rest, so extend it with the drive
            &path[..drive.len() + parent.len()]
        }
    }

    fn to_canonical_path(&self, path: &str) -> PathHandle {
        let (drive, rest) = Self::split_drive(path);
        let unc = drive.is_empty()
            && rest.len() > 1
            && rest.starts_with(Self::is_separator)
            && rest[1..].starts_with(Self::is_separator);
        let rooted = rest.starts_with(Self::is_separator);
        let prefix = match (unc, rooted) {
            (true, _) => "//".to_string(),
            (false, true) => format!("{drive}/"),
            (false, false) => drive.to_string(),
        };
        PathHandle(normalize(&prefix, rooted, rest.split(Self::is_separator)))
    }
}

type SplitFn = for<'a> fn(&'a str) -> &'a str;

/// Decorates a base implementation, replacing the path splitting only.
///
/// Used to replay a trace with path rules which differ from both production
/// implementations, e.g. a trace produced by a cross compiling build host.
#[derive(Clone)]
pub struct Synthetic<C> {
    base: C,
    file_name: Option<SplitFn>,
    parent: Option<SplitFn>,
}

impl<C: PathConventions> Synthetic<C> {
    pub fn new(base: C) -> Self {
        Self { base, file_name: None, parent: None }
    }

    pub fn with_file_name(self, file_name: SplitFn) -> Self {
        Self { file_name: Some(file_name), ..self }
    }

    pub fn with_parent(self, parent: SplitFn) -> Self {
        Self { parent: Some(parent), ..self }
    }
}

impl<C: fmt::Debug> fmt::Debug for Synthetic<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthetic")
            .field("base", &self.base)
            .field("file_name", &self.file_name.is_some())
            .field("parent", &self.parent.is_some())
            .finish()
    }
}

impl<C: PathConventions> PathConventions for Synthetic<C> {
    fn grammar(&self) -> Grammar {
        self.base.grammar()
    }

    fn is_absolute(&self, path: &str) -> bool {
        self.base.is_absolute(path)
    }

    fn file_name<'a>(&self, path: &'a str) -> &'a str {
        match self.file_name {
            Some(file_name) => file_name(path),
            None => self.base.file_name(path),
        }
    }

    fn parent<'a>(&self, path: &'a str) -> &'a str {
        match self.parent {
            Some(parent) => parent(path),
            None => self.base.parent(path),
        }
    }

    fn to_canonical_path(&self, path: &str) -> PathHandle {
        self.base.to_canonical_path(path)
    }

    fn join_paths(&self, base: &str, child: &str) -> PathHandle {
        self.base.join_paths(base, child)
    }
}

/// Splits the path at its last separator, ignoring trailing separators.
///
/// The root separator stays with the parent: `/a` splits into `/` and `a`.
fn split_last(path: &str, is_separator: fn(char) -> bool) -> (&str, &str) {
    let trimmed = path.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        return (path, "");
    }
    match trimmed.rfind(is_separator) {
        None => ("", trimmed),
        Some(index) => {
            let name = &trimmed[index + 1..];
            let parent = trimmed[..index].trim_end_matches(is_separator);
            if parent.is_empty() {
                (&trimmed[..1], name)
            } else {
                (parent, name)
            }
        }
    }
}

fn normalize<'a>(prefix: &str, rooted: bool, segments: impl Iterator<Item = &'a str>) -> String {
    let mut result: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => continue,
            ".." => match result.last() {
                Some(&last) if last != ".." => {
                    result.pop();
                }
                // can't go above the root
                _ if rooted => {}
                _ => result.push(segment),
            },
            _ => result.push(segment),
        }
    }
    let joined = result.join("/");
    if prefix.is_empty() && joined.is_empty() {
        ".".to_string()
    } else {
        format!("{prefix}{joined}")
    }
}
