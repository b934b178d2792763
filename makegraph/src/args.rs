// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation.

use crate::config::TracePlatform;
use anyhow::anyhow;
use clap::{arg, command, ArgAction, ArgMatches, Command};
use std::fmt;

/// Common constants used in the module.
const DEFAULT_OUTPUT_FILE: &str = "native_build.json";
const PLATFORM_VALUES: [&str; 3] = ["posix", "windows", "host"];

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The path of the configuration file.
    pub config: Option<String>,
    // Overrides the platform of the configuration.
    pub platform: Option<TracePlatform>,
    // The directory where the traces were recorded.
    pub working_dir: Option<String>,
    pub variants: Vec<VariantTrace>,
    pub output: BuildConfigOutput,
}

/// A trace file of a build variant.
#[derive(Debug, PartialEq)]
pub struct VariantTrace {
    pub name: String,
    pub file_name: String,
}

#[derive(Debug, PartialEq)]
pub struct BuildConfigOutput {
    pub file_name: String,
    pub append: bool,
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let config = matches.get_one::<String>("config").map(String::to_string);
        let working_dir = matches.get_one::<String>("working-dir").map(String::to_string);
        let platform = matches
            .get_one::<String>("platform")
            .map(|value| parse_platform(value))
            .transpose()?;
        let variants = matches
            .get_many::<String>("variant")
            .ok_or_else(|| anyhow!("missing variant trace"))?
            .map(|value| VariantTrace::try_from(value.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let output = BuildConfigOutput::try_from(&matches)?;

        Ok(Arguments { config, platform, working_dir, variants, output })
    }
}

impl TryFrom<&str> for VariantTrace {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.split_once('=') {
            Some((name, file_name)) if !name.is_empty() && !file_name.is_empty() => {
                Ok(VariantTrace { name: name.to_string(), file_name: file_name.to_string() })
            }
            _ => Err(anyhow!("variant shall be given as NAME=TRACE_FILE, got: {value}")),
        }
    }
}

impl TryFrom<&ArgMatches> for BuildConfigOutput {
    type Error = anyhow::Error;

    fn try_from(matches: &ArgMatches) -> Result<Self, Self::Error> {
        let file_name = matches
            .get_one::<String>("output")
            .map(String::to_string)
            .ok_or_else(|| anyhow!("missing output file"))?;
        let append = *matches.get_one::<bool>("append").unwrap_or(&false);
        Ok(BuildConfigOutput { file_name, append })
    }
}

fn parse_platform(value: &str) -> anyhow::Result<TracePlatform> {
    match value {
        "posix" => Ok(TracePlatform::Posix),
        "windows" => Ok(TracePlatform::Windows),
        "host" => Ok(TracePlatform::Host),
        _ => Err(anyhow!("unrecognized platform: {value}")),
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Arguments:")?;
        if let Some(config) = &self.config {
            writeln!(f, "  config: {config}")?;
        }
        if let Some(platform) = &self.platform {
            writeln!(f, "  platform: {platform:?}")?;
        }
        if let Some(working_dir) = &self.working_dir {
            writeln!(f, "  working directory: {working_dir}")?;
        }
        for variant in &self.variants {
            writeln!(f, "  variant: {} from {}", variant.name, variant.file_name)?;
        }
        write!(f, "  output: {} (append: {})", self.output.file_name, self.output.append)
    }
}

/// Represents the command line interface of the application.
pub fn cli() -> Command {
    command!()
        .about("Reconstructs the native build graph from dry-run build traces")
        .arg_required_else_help(true)
        .args(&[
            arg!(-c --config <FILE> "Path of the config file"),
            arg!(-p --platform <PLATFORM> "Platform which recorded the traces")
                .value_parser(PLATFORM_VALUES),
            arg!(-d --"working-dir" <DIR> "Directory where the traces were recorded"),
            arg!(--variant <VARIANT> "Trace of a build variant, as NAME=TRACE_FILE")
                .action(ArgAction::Append)
                .required(true),
            arg!(-o --output <FILE> "Path of the result file")
                .default_value(DEFAULT_OUTPUT_FILE)
                .hide_default_value(false),
            arg!(-a --append "Append result to an existing output file").action(ArgAction::SetTrue),
        ])
}
