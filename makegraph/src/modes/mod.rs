// SPDX-License-Identifier: GPL-3.0-or-later

//! The application logic: reads the traces of the variants, analyzes them
//! and writes the assembled native build configuration.

mod analysis;

use crate::context::Context;
use crate::conventions::{self, PathConventions};
use crate::output::{self, OutputWriter};
use crate::semantic::statistics::ClassificationStatistics;
use crate::semantic::{tools, BuildTool};
use crate::{args, config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// The configured application, ready to run.
pub struct Application {
    traces: Vec<analysis::TraceFile>,
    working_directory: String,
    conventions: Arc<dyn PathConventions>,
    tools: Vec<Box<dyn BuildTool>>,
    unclassified: config::UnclassifiedPolicy,
    writer: OutputWriter,
}

impl Application {
    /// Configure the application based on the command line arguments and the configuration.
    ///
    /// Here we are checking if the trace files are present. If that is not
    /// the case, we try to return a useful error message.
    pub fn configure(
        context: Context,
        args: args::Arguments,
        config: config::Main,
    ) -> Result<Self, ConfigurationError> {
        let platform = args.platform.unwrap_or(config.platform).resolve();
        log::debug!("Traces are analyzed with the path rules of: {platform}");

        let traces = args
            .variants
            .into_iter()
            .map(|variant| {
                let path = PathBuf::from(&variant.file_name);
                if path.is_file() {
                    Ok(analysis::TraceFile { variant: variant.name, path })
                } else {
                    Err(ConfigurationError::TraceNotFound(variant.file_name))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        let working_directory = args
            .working_dir
            .unwrap_or_else(|| context.current_directory.to_string_lossy().into_owned());

        Ok(Self {
            traces,
            working_directory,
            conventions: conventions::for_platform(platform),
            tools: tools::create(&config.tools),
            unclassified: config.unclassified,
            writer: OutputWriter::new(PathBuf::from(&args.output.file_name).as_path(), args.output.append),
        })
    }

    /// It actually runs the application.
    ///
    /// These errors are all run-time errors, the user were passing valid
    /// arguments and configurations.
    pub fn run(self) -> ExitCode {
        let stats = ClassificationStatistics::new();
        let result = self.execute(&stats);
        log::info!("{stats}");

        match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(error) => {
                log::error!("makegraph: {error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(self, stats: &Arc<ClassificationStatistics>) -> Result<(), analysis::RunError> {
        let analyzer = analysis::Analyzer::new(
            self.conventions,
            &self.working_directory,
            &self.tools,
            self.unclassified,
            Arc::clone(stats),
        );
        let variants = analyzer.analyze_all(&self.traces)?;
        let config = output::assemble(&variants)?;
        log::info!("Libraries found: {}", config.libraries.len());
        self.writer.write(config)?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Trace file not found: {0}")]
    TraceNotFound(String),
}
