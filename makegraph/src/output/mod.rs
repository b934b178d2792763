// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the result of the analysis: the native build
//! configuration, which describes every discovered library with its source
//! files, compiler flags and toolchain.
//!
//! The configuration is assembled from the flow graphs of the variants
//! (see the `assembler` module), and written as a JSON document by the
//! `OutputWriter`.

pub mod assembler;
pub mod json;

use crate::conventions::PathHandle;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path;
use thiserror::Error;

pub use assembler::{assemble, AssembleError, Variant};

/// The native build configuration of a project.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBuildConfig {
    /// The libraries by their identity (variant and output path).
    pub libraries: BTreeMap<String, NativeLibrary>,
    pub toolchains: BTreeMap<String, NativeToolchain>,
    pub c_file_extensions: BTreeSet<String>,
    pub cpp_file_extensions: BTreeSet<String>,
}

/// A library (or an executable) built by the native build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeLibrary {
    pub output: PathHandle,
    pub artifact_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<String>,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<String>,
    pub files: BTreeSet<NativeSourceFile>,
}

/// The compilers used to build a library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeToolchain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c_compiler_executable: Option<PathHandle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp_compiler_executable: Option<PathHandle>,
}

/// A source file of a library, with the flags it was compiled with.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeSourceFile {
    pub path: PathHandle,
    pub flags: Vec<String>,
    pub working_directory: PathHandle,
}

impl NativeBuildConfig {
    /// Registers the toolchain and returns its name.
    ///
    /// An already registered toolchain keeps its name. The new ones are
    /// named in the order they are registered.
    pub fn add_toolchain(&mut self, toolchain: NativeToolchain) -> String {
        if let Some((name, _)) = self.toolchains.iter().find(|(_, existing)| **existing == toolchain) {
            return name.clone();
        }
        let name = (self.toolchains.len()..)
            .map(|index| format!("toolchain-{index}"))
            .find(|name| !self.toolchains.contains_key(name))
            .unwrap_or_default();
        self.toolchains.insert(name.clone(), toolchain);
        name
    }

    /// Unions two configurations.
    ///
    /// The libraries with the same identity are merged: their source file sets
    /// are unioned. The same source file with different flags is kept twice.
    /// The toolchains of `other` are renamed to avoid name clashes.
    pub fn merge(mut self, other: NativeBuildConfig) -> NativeBuildConfig {
        let renames: BTreeMap<String, String> = other
            .toolchains
            .into_iter()
            .map(|(name, toolchain)| (name, self.add_toolchain(toolchain)))
            .collect();

        for (identity, mut library) in other.libraries {
            library.toolchain = library.toolchain.and_then(|name| renames.get(&name).cloned());
            match self.libraries.get_mut(&identity) {
                Some(existing) => {
                    existing.files.extend(library.files);
                    if existing.toolchain.is_none() {
                        existing.toolchain = library.toolchain;
                    }
                }
                None => {
                    self.libraries.insert(identity, library);
                }
            }
        }
        self.c_file_extensions.extend(other.c_file_extensions);
        self.cpp_file_extensions.extend(other.cpp_file_extensions);
        self
    }
}

/// Writes the configuration into a file.
///
/// The content is written into a temporary file first, and moved to the
/// final location when it's complete. In append mode the content of the
/// existing file is merged into the new one.
pub struct OutputWriter {
    final_path: path::PathBuf,
    temp_path: path::PathBuf,
    append: bool,
}

impl OutputWriter {
    pub fn new(path: &path::Path, append: bool) -> Self {
        Self { final_path: path.to_path_buf(), temp_path: path.with_extension("tmp"), append }
    }

    pub fn write(self, config: NativeBuildConfig) -> Result<(), WriterError> {
        let config = if self.append && self.final_path.exists() {
            let previous = self.read_previous()?;
            log::info!("Merging with the libraries of the existing output: {}", previous.libraries.len());
            previous.merge(config)
        } else {
            config
        };

        let file = fs::File::create(&self.temp_path)
            .map_err(|err| WriterError::Io(self.temp_path.clone(), err))?;
        json::to_writer(file, &config).map_err(|err| WriterError::Format(self.temp_path.clone(), err))?;

        fs::rename(&self.temp_path, &self.final_path).map_err(|err| WriterError::Io(self.final_path, err))?;
        Ok(())
    }

    fn read_previous(&self) -> Result<NativeBuildConfig, WriterError> {
        let file = fs::File::open(&self.final_path)
            .map_err(|err| WriterError::Io(self.final_path.clone(), err))?;
        json::from_reader(file).map_err(|err| WriterError::Format(self.final_path.clone(), err))
    }
}

/// Represents errors that can occur while writing output.
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to access the output file {0}: {1}")]
    Io(path::PathBuf, std::io::Error),
    #[error("Failed to process the output file {0}: {1}")]
    Format(path::PathBuf, serde_json::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn source(path: &str, flags: &[&str]) -> NativeSourceFile {
        NativeSourceFile {
            path: PathHandle::from(path),
            flags: flags.iter().map(|flag| flag.to_string()).collect(),
            working_directory: PathHandle::from("/project"),
        }
    }

    fn library(variant: &str, toolchain: Option<&str>, files: &[NativeSourceFile]) -> NativeLibrary {
        NativeLibrary {
            output: PathHandle::from("/project/libs/x86/libfoo.so"),
            artifact_name: "foo".to_string(),
            abi: Some("x86".to_string()),
            variant: variant.to_string(),
            toolchain: toolchain.map(String::from),
            files: files.iter().cloned().collect(),
        }
    }

    fn toolchain(c: &str) -> NativeToolchain {
        NativeToolchain { c_compiler_executable: Some(PathHandle::from(c)), cpp_compiler_executable: None }
    }

    fn config_fixture() -> NativeBuildConfig {
        let mut config = NativeBuildConfig::default();
        let name = config.add_toolchain(toolchain("/ndk/gcc"));
        config.libraries.insert(
            "debug:libs/x86/libfoo.so".to_string(),
            library("debug", Some(&name), &[source("/project/a.c", &["-c", "-g"])]),
        );
        config.c_file_extensions.insert("c".to_string());
        config
    }

    #[test]
    fn test_add_toolchain_deduplicates() {
        let mut config = NativeBuildConfig::default();

        assert_eq!(config.add_toolchain(toolchain("/ndk/gcc")), "toolchain-0");
        assert_eq!(config.add_toolchain(toolchain("/ndk/clang")), "toolchain-1");
        assert_eq!(config.add_toolchain(toolchain("/ndk/gcc")), "toolchain-0");
        assert_eq!(config.toolchains.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let config = config_fixture();

        assert_eq!(config.clone().merge(config.clone()), config);
    }

    #[test]
    fn test_merge_keeps_different_flags() {
        let mut other = NativeBuildConfig::default();
        let name = other.add_toolchain(toolchain("/ndk/gcc"));
        other.libraries.insert(
            "debug:libs/x86/libfoo.so".to_string(),
            library("debug", Some(&name), &[source("/project/a.c", &["-c", "-O2"])]),
        );

        let result = config_fixture().merge(other);

        assert_eq!(result.libraries.len(), 1);
        assert_eq!(result.libraries["debug:libs/x86/libfoo.so"].files.len(), 2);
        assert_eq!(result.toolchains.len(), 1);
    }

    #[test]
    fn test_merge_renames_toolchains() {
        let mut other = NativeBuildConfig::default();
        let clang = other.add_toolchain(toolchain("/ndk/clang"));
        other.libraries.insert("release:libs/x86/libfoo.so".to_string(), library("release", Some(&clang), &[]));

        let result = config_fixture().merge(other);

        assert_eq!(result.toolchains.len(), 2);
        let renamed = result.libraries["release:libs/x86/libfoo.so"].toolchain.clone().unwrap();
        assert_eq!(result.toolchains[&renamed], toolchain("/ndk/clang"));
        assert_eq!(result.libraries["debug:libs/x86/libfoo.so"].toolchain.as_deref(), Some("toolchain-0"));
    }

    #[test]
    fn test_writer_creates_and_appends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("native_build.json");

        OutputWriter::new(&path, false).write(config_fixture()).unwrap();
        let mut other = NativeBuildConfig::default();
        other.libraries.insert("release:libs/x86/libfoo.so".to_string(), library("release", None, &[]));
        OutputWriter::new(&path, true).write(other).unwrap();

        let result = json::from_reader(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(result.libraries.len(), 2);
        assert_eq!(result.toolchains.len(), 1);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_writer_overwrites_without_append() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("native_build.json");

        OutputWriter::new(&path, false).write(config_fixture()).unwrap();
        OutputWriter::new(&path, false).write(NativeBuildConfig::default()).unwrap();

        let result = json::from_reader(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(result, NativeBuildConfig::default());
    }
}
