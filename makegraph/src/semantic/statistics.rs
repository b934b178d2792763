// SPDX-License-Identifier: GPL-3.0-or-later

//! Statistics collection for the trace analysis.
//!
//! The traces of the variants are analyzed in parallel, and each of them
//! updates the same counters. After the run the statistics are logged, so
//! the user can see how many commands were not recognized.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters of the analysis, updated with atomic operations.
#[derive(Debug, Default)]
pub struct ClassificationStatistics {
    /// Number of traces analyzed.
    pub traces_analyzed: AtomicUsize,

    /// Number of commands found in the traces.
    pub commands_parsed: AtomicUsize,

    /// Number of commands turned into a build step (no-op steps included).
    pub build_steps: AtomicUsize,

    /// Number of build steps which do not contribute to the graph.
    pub no_op_steps: AtomicUsize,

    /// Number of commands not recognized by any of the tools.
    pub unclassified_commands: AtomicUsize,

    /// Number of final targets found.
    pub terminal_targets: AtomicUsize,
}

impl ClassificationStatistics {
    /// Creates a new instance wrapped in an `Arc` for sharing.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The ratio of the recognized commands in percent.
    pub fn recognition_rate(&self) -> usize {
        let parsed = self.commands_parsed.load(Ordering::Relaxed);
        let unclassified = self.unclassified_commands.load(Ordering::Relaxed);
        if parsed == 0 {
            100
        } else {
            (parsed - unclassified.min(parsed)) * 100 / parsed
        }
    }
}

impl fmt::Display for ClassificationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let traces = self.traces_analyzed.load(Ordering::Relaxed);
        let commands = self.commands_parsed.load(Ordering::Relaxed);
        let steps = self.build_steps.load(Ordering::Relaxed);
        let no_ops = self.no_op_steps.load(Ordering::Relaxed);
        let unclassified = self.unclassified_commands.load(Ordering::Relaxed);
        let targets = self.terminal_targets.load(Ordering::Relaxed);

        writeln!(f, "Trace analysis:")?;
        writeln!(f, "  traces analyzed: {}", traces)?;
        writeln!(f, "  commands parsed: {}", commands)?;
        writeln!(f, "  build steps: {}", steps)?;
        writeln!(f, "  no-op steps: {}", no_ops)?;
        writeln!(f, "  unclassified commands: {}", unclassified)?;
        writeln!(f, "  terminal targets: {}", targets)?;
        write!(f, "  recognition rate: {}%", self.recognition_rate())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_starts_from_zero() {
        let stats = ClassificationStatistics::new();

        assert_eq!(stats.commands_parsed.load(Ordering::Relaxed), 0);
        assert_eq!(stats.terminal_targets.load(Ordering::Relaxed), 0);
        assert_eq!(stats.recognition_rate(), 100);
    }

    #[test]
    fn test_display_format() {
        let stats = ClassificationStatistics::new();
        stats.traces_analyzed.store(2, Ordering::Relaxed);
        stats.commands_parsed.store(20, Ordering::Relaxed);
        stats.build_steps.store(15, Ordering::Relaxed);
        stats.no_op_steps.store(6, Ordering::Relaxed);
        stats.unclassified_commands.store(5, Ordering::Relaxed);
        stats.terminal_targets.store(3, Ordering::Relaxed);

        let output = format!("{}", stats);
        assert!(output.contains("Trace analysis:"));
        assert!(output.contains("traces analyzed: 2"));
        assert!(output.contains("commands parsed: 20"));
        assert!(output.contains("build steps: 15"));
        assert!(output.contains("no-op steps: 6"));
        assert!(output.contains("unclassified commands: 5"));
        assert!(output.contains("terminal targets: 3"));
        assert!(output.contains("recognition rate: 75%"));
    }

    #[test]
    fn test_atomic_updates_from_multiple_threads() {
        let stats = ClassificationStatistics::new();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let stats = Arc::clone(&stats);
                scope.spawn(move || {
                    stats.commands_parsed.fetch_add(5, Ordering::Relaxed);
                });
            }
        });

        assert_eq!(stats.commands_parsed.load(Ordering::Relaxed), 20);
    }
}
