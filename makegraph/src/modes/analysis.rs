// SPDX-License-Identifier: GPL-3.0-or-later

use crate::conventions::PathConventions;
use crate::flow::{analyze_with, FlowAnalysis, FlowError};
use crate::output::{AssembleError, Variant, WriterError};
use crate::semantic::statistics::ClassificationStatistics;
use crate::semantic::BuildTool;
use crate::config::UnclassifiedPolicy;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::{fs, thread};

/// The trace file of a build variant.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct TraceFile {
    pub variant: String,
    pub path: PathBuf,
}

/// Analyzes the traces of the variants.
///
/// The traces are independent from each other, so each of them is analyzed
/// on its own thread. The results are returned in the order of the traces.
pub(super) struct Analyzer<'a> {
    conventions: Arc<dyn PathConventions>,
    working_directory: &'a str,
    tools: &'a [Box<dyn BuildTool>],
    unclassified: UnclassifiedPolicy,
    stats: Arc<ClassificationStatistics>,
}

impl<'a> Analyzer<'a> {
    pub(super) fn new(
        conventions: Arc<dyn PathConventions>,
        working_directory: &'a str,
        tools: &'a [Box<dyn BuildTool>],
        unclassified: UnclassifiedPolicy,
        stats: Arc<ClassificationStatistics>,
    ) -> Self {
        Self { conventions, working_directory, tools, unclassified, stats }
    }

    pub(super) fn analyze_all(&self, traces: &[TraceFile]) -> Result<Vec<Variant>, RunError> {
        thread::scope(|scope| {
            let handles: Vec<_> = traces
                .iter()
                .map(|trace| (trace, scope.spawn(move || self.analyze(trace))))
                .collect();

            handles
                .into_iter()
                .map(|(trace, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(RunError::Aborted { variant: trace.variant.clone() }))
                })
                .collect()
        })
    }

    fn analyze(&self, trace: &TraceFile) -> Result<Variant, RunError> {
        log::debug!("Analyzing variant {} from {}", trace.variant, trace.path.display());
        let content = fs::read(&trace.path)
            .map_err(|source| RunError::TraceAccess { path: trace.path.clone(), source })?;
        let text = String::from_utf8_lossy(&content);

        let analysis = analyze_with(&text, self.conventions.as_ref(), self.tools)
            .map_err(|source| RunError::Analysis { variant: trace.variant.clone(), source })?;
        self.record(&analysis);
        self.check_unclassified(&trace.variant, &analysis)?;

        Ok(Variant {
            name: trace.variant.clone(),
            working_directory: self.working_directory.to_string(),
            conventions: Arc::clone(&self.conventions),
            graph: analysis.graph,
        })
    }

    fn record(&self, analysis: &FlowAnalysis) {
        let no_ops = analysis.steps.iter().filter(|step| step.is_no_op()).count();

        self.stats.traces_analyzed.fetch_add(1, Ordering::Relaxed);
        self.stats.commands_parsed.fetch_add(analysis.commands, Ordering::Relaxed);
        self.stats.build_steps.fetch_add(analysis.steps.len(), Ordering::Relaxed);
        self.stats.no_op_steps.fetch_add(no_ops, Ordering::Relaxed);
        self.stats.unclassified_commands.fetch_add(analysis.unclassified.len(), Ordering::Relaxed);
        self.stats.terminal_targets.fetch_add(analysis.graph.len(), Ordering::Relaxed);
    }

    fn check_unclassified(&self, variant: &str, analysis: &FlowAnalysis) -> Result<(), RunError> {
        match (self.unclassified, analysis.unclassified.first()) {
            (UnclassifiedPolicy::Fail, Some(first)) => Err(RunError::Unclassified {
                variant: variant.to_string(),
                count: analysis.unclassified.len(),
                first: first.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Represents the errors of the run, after the configuration was accepted.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to read trace file {path}: {source}")]
    TraceAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to analyze the trace of variant '{variant}': {source}")]
    Analysis {
        variant: String,
        #[source]
        source: FlowError,
    },
    #[error("Variant '{variant}' has {count} unrecognized commands, the first one: {first}")]
    Unclassified { variant: String, count: usize, first: String },
    #[error("Analysis of variant '{variant}' was aborted")]
    Aborted { variant: String },
    #[error("Failed to assemble the build configuration: {0}")]
    Assemble(#[from] AssembleError),
    #[error("Failed to write the build configuration: {0}")]
    Write(#[from] WriterError),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conventions::Posix;
    use crate::semantic::tools::default_tools;
    use std::io::Write;

    fn trace_file(dir: &tempfile::TempDir, variant: &str, content: &str) -> TraceFile {
        let path = dir.path().join(format!("{variant}.txt"));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        TraceFile { variant: variant.to_string(), path }
    }

    #[test]
    fn test_variants_keep_their_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let traces = vec![
            trace_file(&dir, "debug", "gcc -c a.c -o a.o\ngcc -shared a.o -o liba.so\n"),
            trace_file(&dir, "release", "gcc -c b.c -o b.o\nprotoc x.proto\ngcc -shared b.o -o libb.so\n"),
        ];
        let tools = default_tools();
        let stats = ClassificationStatistics::new();
        let sut = Analyzer::new(Arc::new(Posix), "/project", &tools, UnclassifiedPolicy::Warn, Arc::clone(&stats));

        let variants = sut.analyze_all(&traces).unwrap();

        let names: Vec<&str> = variants.iter().map(|variant| variant.name.as_str()).collect();
        assert_eq!(names, vec!["debug", "release"]);
        assert_eq!(stats.traces_analyzed.load(Ordering::Relaxed), 2);
        assert_eq!(stats.commands_parsed.load(Ordering::Relaxed), 5);
        assert_eq!(stats.unclassified_commands.load(Ordering::Relaxed), 1);
        assert_eq!(stats.terminal_targets.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_unclassified_commands_fail_when_configured() {
        let dir = tempfile::TempDir::new().unwrap();
        let traces = vec![trace_file(&dir, "debug", "protoc x.proto\n")];
        let tools = default_tools();
        let sut = Analyzer::new(
            Arc::new(Posix),
            "/project",
            &tools,
            UnclassifiedPolicy::Fail,
            ClassificationStatistics::new(),
        );

        let result = sut.analyze_all(&traces);

        match result {
            Err(RunError::Unclassified { variant, count, first }) => {
                assert_eq!(variant, "debug");
                assert_eq!(count, 1);
                assert_eq!(first, "protoc x.proto");
            }
            other => panic!("Expected unclassified error, got: {other:?}"),
        }
    }

    #[test]
    fn test_analysis_error_names_the_variant() {
        let dir = tempfile::TempDir::new().unwrap();
        let traces = vec![trace_file(&dir, "broken", "gcc -c 'a.c\n")];
        let tools = default_tools();
        let sut = Analyzer::new(
            Arc::new(Posix),
            "/project",
            &tools,
            UnclassifiedPolicy::Warn,
            ClassificationStatistics::new(),
        );

        let result = sut.analyze_all(&traces);

        assert!(matches!(result, Err(RunError::Analysis { variant, .. }) if variant == "broken"));
    }
}
