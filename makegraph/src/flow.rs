// SPDX-License-Identifier: GPL-3.0-or-later

//! Reconstruction of the build graph from the ordered build steps.
//!
//! The trace has no explicit dependency declarations. The dependencies are
//! found by matching the inputs of a step with the outputs of the steps
//! before it. A step whose outputs are never consumed by a later step is a
//! terminal target (a shared library, a static library or an executable).
//!
//! For each terminal target the graph holds the chain of compile steps which
//! contributed to it, reached through any number of intermediate steps
//! (archives, partial links). The compile steps of different targets are
//! kept apart, even when they compile the same source file.

use crate::command::{parse_traced, CommandLine, ParseError};
use crate::conventions::{PathConventions, PathHandle};
use crate::semantic::tools::{default_tools, source::is_binary_file};
use crate::semantic::{classify, BuildStepInfo, BuildTool, ClassifyError};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Maps the terminal targets to the compile steps which built them.
///
/// The keys are the outputs as they were written in the trace, resolved
/// against the directory of the command when that's known. The chains
/// are in production order, with one source file per step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowGraph(BTreeMap<String, Vec<BuildStepInfo>>);

impl FlowGraph {
    pub fn targets(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn chain(&self, target: &str) -> Option<&[BuildStepInfo]> {
        self.0.get(target).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<BuildStepInfo>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Vec<BuildStepInfo>>> for FlowGraph {
    fn from(value: BTreeMap<String, Vec<BuildStepInfo>>) -> Self {
        FlowGraph(value)
    }
}

/// The result of a trace analysis.
#[derive(Debug, Default)]
pub struct FlowAnalysis {
    pub graph: FlowGraph,
    /// Number of commands found in the trace.
    pub commands: usize,
    pub steps: Vec<BuildStepInfo>,
    pub unclassified: Vec<CommandLine>,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Malformed trace: {0}")]
    Parse(#[from] ParseError),
    #[error("Unrecognizable command: {0}")]
    Classify(#[from] ClassifyError),
    #[error("Output '{output}' is produced by two commands: '{first}' and '{second}'")]
    DuplicateOutput { output: String, first: String, second: String },
}

/// Analyzes a trace with the built-in tools.
pub fn analyze(text: &str, conventions: &dyn PathConventions) -> Result<FlowAnalysis, FlowError> {
    analyze_with(text, conventions, &default_tools())
}

/// Analyzes a trace with the given tools.
pub fn analyze_with(
    text: &str,
    conventions: &dyn PathConventions,
    tools: &[Box<dyn BuildTool>],
) -> Result<FlowAnalysis, FlowError> {
    let traced = parse_traced(text, conventions)?;
    log::debug!("Commands found in the trace: {}", traced.len());

    let mut steps = Vec::new();
    let mut unclassified = Vec::new();
    for group in traced.chunk_by(|one, other| one.directory == other.directory) {
        let commands: Vec<CommandLine> = group.iter().map(|traced| traced.command.clone()).collect();
        let classification = classify(&commands, conventions, tools)?;
        let directory = &group[0].directory;
        steps.extend(classification.steps.into_iter().map(|step| step.with_directory(directory.clone())));
        unclassified.extend(classification.unclassified);
    }

    let graph = flow_graph(&steps, conventions)?;
    log::debug!("Terminal targets found in the trace: {}", graph.len());

    Ok(FlowAnalysis { graph, commands: traced.len(), steps, unclassified })
}

/// Builds the flow graph from the ordered build steps.
pub fn flow_graph(steps: &[BuildStepInfo], conventions: &dyn PathConventions) -> Result<FlowGraph, FlowError> {
    let state = steps
        .iter()
        .enumerate()
        .try_fold(FlowState::default(), |state, (index, step)| state.advance(index, step, conventions))?;

    Ok(state.into_graph(conventions))
}

/// The knowledge collected from the steps seen so far.
#[derive(Default)]
struct FlowState<'a> {
    /// The producer step of each output.
    producers: BTreeMap<PathHandle, usize>,
    steps: Vec<&'a BuildStepInfo>,
    /// The compile steps each step was built from, by the step index.
    reachable: Vec<BTreeSet<usize>>,
    /// The steps whose outputs were consumed by a later step.
    consumed: BTreeSet<usize>,
}

impl<'a> FlowState<'a> {
    fn advance(
        mut self,
        index: usize,
        step: &'a BuildStepInfo,
        conventions: &dyn PathConventions,
    ) -> Result<Self, FlowError> {
        let mut reachable = BTreeSet::new();
        if step.inputs_are_source_files {
            reachable.insert(index);
        }
        for input in &step.inputs {
            if let Some(&producer) = self.producers.get(&step.location(input, conventions)) {
                reachable.extend(self.reachable[producer].iter().copied());
                self.consumed.insert(producer);
            }
        }
        for output in &step.outputs {
            let location = step.location(output, conventions);
            if let Some(&previous) = self.producers.get(&location) {
                return Err(FlowError::DuplicateOutput {
                    output: output.clone(),
                    first: self.steps[previous].command.to_string(),
                    second: step.command.to_string(),
                });
            }
            self.producers.insert(location, index);
        }
        self.steps.push(step);
        self.reachable.push(reachable);
        Ok(self)
    }

    fn into_graph(self, conventions: &dyn PathConventions) -> FlowGraph {
        let mut graph = BTreeMap::new();

        for (index, step) in self.steps.iter().enumerate() {
            if self.consumed.contains(&index) || step.outputs.is_empty() {
                continue;
            }
            let chain: Vec<BuildStepInfo> = self.reachable[index]
                .iter()
                .flat_map(|&source_step| self.split_by_source(self.steps[source_step], conventions))
                .collect();
            for output in &step.outputs {
                let target = match &step.working_directory {
                    Some(_) => step.location(output, conventions).as_str().to_string(),
                    None => output.clone(),
                };
                log::debug!("Terminal target {} is built from {} source files", target, chain.len());
                graph.insert(target, chain.clone());
            }
        }
        FlowGraph(graph)
    }

    /// One step per source file of a compile step.
    ///
    /// A step which compiles and links in one go might have objects and
    /// libraries among its inputs, those are not source files.
    fn split_by_source(&self, step: &BuildStepInfo, conventions: &dyn PathConventions) -> Vec<BuildStepInfo> {
        if let [_] = step.inputs.as_slice() {
            return vec![step.clone()];
        }
        step.inputs
            .iter()
            .filter(|input| !is_binary_file(input))
            .filter(|input| !self.producers.contains_key(&step.location(input, conventions)))
            .map(|input| {
                BuildStepInfo::new(step.command.clone(), vec![input.clone()], step.outputs.clone(), true)
                    .with_directory(step.working_directory.clone())
            })
            .collect()
    }
}
