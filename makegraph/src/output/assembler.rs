// SPDX-License-Identifier: GPL-3.0-or-later

//! Assembles the native build configuration from the flow graphs.
//!
//! Every terminal target of a variant becomes a library. Its chain of compile
//! steps becomes the source files of the library, each with the flags of
//! its own compile command. The paths are resolved against the directory of
//! the compile command (when the build tool reported it) or else the working
//! directory of the variant. The path conventions of the platform which
//! recorded the trace are used, so variants recorded on different platforms
//! can be assembled into one document.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::{NativeBuildConfig, NativeLibrary, NativeSourceFile, NativeToolchain};
use crate::conventions::{PathConventions, PathHandle};
use crate::flow::FlowGraph;
use crate::semantic::tools::source::is_cpp_source;
use crate::semantic::tools::source_flags;
use crate::semantic::BuildStepInfo;
use thiserror::Error;

/// The analyzed trace of one build variant.
#[derive(Clone, Debug)]
pub struct Variant {
    pub name: String,
    /// The directory where the build was run. The relative paths of the
    /// trace are relative to it.
    pub working_directory: String,
    pub conventions: Arc<dyn PathConventions>,
    pub graph: FlowGraph,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error(
        "Output '{output}' of variant '{variant}' is not a shared library, a static library or an executable"
    )]
    UnrecognizedOutput { variant: String, output: String },
}

/// Android ABI names, as they appear in the output directories.
const KNOWN_ABIS: [&str; 7] = ["armeabi", "armeabi-v7a", "arm64-v8a", "x86", "x86_64", "mips", "mips64"];

/// Assembles the flow graphs of the variants into one configuration.
///
/// The variants are processed in order. The graphs are not modified, the
/// result is built from scratch.
pub fn assemble(variants: &[Variant]) -> Result<NativeBuildConfig, AssembleError> {
    variants.iter().try_fold(NativeBuildConfig::default(), |config, variant| {
        let assembled = assemble_variant(variant)?;
        log::debug!("Variant {} has {} libraries", variant.name, assembled.libraries.len());
        Ok(config.merge(assembled))
    })
}

fn assemble_variant(variant: &Variant) -> Result<NativeBuildConfig, AssembleError> {
    let conventions = variant.conventions.as_ref();
    let working_directory = conventions.to_canonical_path(&variant.working_directory);
    let mut config = NativeBuildConfig::default();

    for (target, chain) in variant.graph.iter() {
        let output = conventions.join_paths(&variant.working_directory, target);
        if !matches!(output.extension(), None | Some("so") | Some("a")) {
            return Err(AssembleError::UnrecognizedOutput {
                variant: variant.name.clone(),
                output: target.clone(),
            });
        }

        let mut files = BTreeSet::new();
        for step in chain {
            let step_directory = match &step.working_directory {
                Some(directory) => conventions.join_paths(&variant.working_directory, directory),
                None => working_directory.clone(),
            };
            for source in &step.inputs {
                let path = conventions.join_paths(step_directory.as_str(), source);
                match path.extension() {
                    Some(extension) if is_cpp_source(path.as_str()) => {
                        config.cpp_file_extensions.insert(extension.to_string());
                    }
                    Some("c") => {
                        config.c_file_extensions.insert("c".to_string());
                    }
                    _ => {}
                }
                files.insert(NativeSourceFile {
                    path,
                    flags: source_flags(&step.command, source),
                    working_directory: step_directory.clone(),
                });
            }
        }

        let toolchain = toolchain_of(chain, conventions).map(|toolchain| config.add_toolchain(toolchain));
        let identity = format!("{}:{}", variant.name, conventions.to_canonical_path(target));
        let library = NativeLibrary {
            artifact_name: artifact_name(&output),
            abi: abi_of(&output),
            output,
            variant: variant.name.clone(),
            toolchain,
            files,
        };
        config.libraries.insert(identity, library);
    }
    Ok(config)
}

/// The first C and the first C++ compiler of the chain.
fn toolchain_of(chain: &[BuildStepInfo], conventions: &dyn PathConventions) -> Option<NativeToolchain> {
    let compiler_of = |cpp: bool| {
        chain
            .iter()
            .find(|step| step.inputs.iter().any(|input| is_cpp_source(input) == cpp))
            .map(|step| conventions.to_canonical_path(&step.command.executable))
    };
    let toolchain = NativeToolchain {
        c_compiler_executable: compiler_of(false),
        cpp_compiler_executable: compiler_of(true),
    };
    if toolchain.c_compiler_executable.is_none() && toolchain.cpp_compiler_executable.is_none() {
        None
    } else {
        Some(toolchain)
    }
}

/// The file name of the output without the `lib` prefix and the extension.
fn artifact_name(output: &PathHandle) -> String {
    let name = file_name(output);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    match stem.strip_prefix("lib") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => stem.to_string(),
    }
}

/// The ABI of the output, when it's in a directory named after an ABI.
fn abi_of(output: &PathHandle) -> Option<String> {
    let mut segments = output.as_str().rsplit('/');
    segments.next();
    segments
        .next()
        .filter(|parent| KNOWN_ABIS.contains(parent))
        .map(String::from)
}

fn file_name(path: &PathHandle) -> &str {
    path.as_str().rsplit('/').next().unwrap_or(path.as_str())
}
