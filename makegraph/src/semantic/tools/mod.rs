// SPDX-License-Identifier: GPL-3.0-or-later

//! This module provides the build tools to recognize the commands of a trace.
//!
//! The tool chain is built as follows:
//! 1. Utilities to ignore (file operations, shell commands, binary utilities)
//! 2. Compiler wrappers (ccache, sccache, distcc) looking through to the compiler
//! 3. Compiler queries (version, target, preprocess only)
//! 4. Compiles
//! 5. Archives
//! 6. Links
//!
//! Tools defined in the configuration are appended after these.

mod archiver;
mod combinators;
mod compiler;
mod ignore;
mod linker;
pub mod recognition;
pub mod source;
mod wrapper;

pub use compiler::source_flags;

use super::BuildTool;
use crate::config;

use archiver::Archiver;
use combinators::Any;
use compiler::{CompilerQuery, NativeCompiler};
use ignore::IgnoreByName;
use linker::Linker;
use recognition::{ToolKind, ToolRecognizer};
use std::sync::Arc;
use wrapper::CompilerWrapper;

/// Creates the built-in tools in their priority order.
pub fn default_tools() -> Vec<Box<dyn BuildTool>> {
    let mut tools: Vec<Box<dyn BuildTool>> = vec![Box::new(IgnoreByName::default())];
    tools.extend(toolchain(Arc::new(ToolRecognizer::default())));
    tools
}

/// Creates the built-in tools, followed by the tools of the configuration.
pub fn create(configured: &[config::Tool]) -> Vec<Box<dyn BuildTool>> {
    let mut tools = default_tools();

    let ignored: Vec<String> = configured
        .iter()
        .filter(|tool| tool.action == config::ToolAction::Ignore)
        .map(|tool| tool.name.clone())
        .collect();
    if !ignored.is_empty() {
        tools.push(Box::new(IgnoreByName::from(&ignored)));
    }

    let names: Vec<(String, ToolKind)> = configured
        .iter()
        .filter_map(|tool| {
            let kind = match tool.action {
                config::ToolAction::Ignore => return None,
                config::ToolAction::Compiler => ToolKind::Compiler,
                config::ToolAction::Archiver => ToolKind::Archiver,
                config::ToolAction::Linker => ToolKind::Linker,
            };
            Some((tool.name.clone(), kind))
        })
        .collect();
    if !names.is_empty() {
        tools.extend(toolchain(Arc::new(ToolRecognizer::from_names(names))));
    }

    log::debug!("Build tools: {}", tools.iter().map(|tool| tool.name()).collect::<Vec<_>>().join(", "));
    tools
}

/// The tools of a toolchain, sharing the same executable recognizer.
fn toolchain(recognizer: Arc<ToolRecognizer>) -> Vec<Box<dyn BuildTool>> {
    let compilers: Vec<Box<dyn BuildTool>> = vec![
        Box::new(CompilerQuery::new(recognizer.clone())),
        Box::new(NativeCompiler::new(recognizer.clone())),
        Box::new(Linker::new(recognizer.clone())),
    ];
    vec![
        Box::new(CompilerWrapper::new(Any::new(compilers))),
        Box::new(CompilerQuery::new(recognizer.clone())),
        Box::new(NativeCompiler::new(recognizer.clone())),
        Box::new(Archiver::new(recognizer.clone())),
        Box::new(Linker::new(recognizer)),
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::CommandLine;
    use crate::conventions::Posix;
    use crate::semantic::classify;

    fn tool(name: &str, action: config::ToolAction) -> config::Tool {
        config::Tool { name: name.to_string(), action }
    }

    #[test]
    fn test_default_tools_classify_a_build() {
        let commands = vec![
            CommandLine::from_strs("mkdir", &["-p", "obj"]),
            CommandLine::from_strs("gcc", &["-c", "a.c", "-o", "obj/a.o"]),
            CommandLine::from_strs("ar", &["rcs", "obj/liba.a", "obj/a.o"]),
            CommandLine::from_strs("gcc", &["-shared", "obj/liba.a", "-o", "libs/liba.so"]),
            CommandLine::from_strs("protoc", &["--cpp_out=.", "a.proto"]),
        ];

        let result = classify(&commands, &Posix, &default_tools()).unwrap();

        assert_eq!(result.steps.len(), 4);
        assert!(result.steps[0].is_no_op());
        assert_eq!(result.steps[1].outputs, vec!["obj/a.o"]);
        assert_eq!(result.steps[2].outputs, vec!["obj/liba.a"]);
        assert_eq!(result.steps[3].outputs, vec!["libs/liba.so"]);
        assert_eq!(result.unclassified, vec![commands[4].clone()]);
    }

    #[test]
    fn test_configured_tools_are_appended() {
        let tools = create(&[
            tool("protoc", config::ToolAction::Ignore),
            tool("mycc", config::ToolAction::Compiler),
            tool("mylink", config::ToolAction::Linker),
        ]);
        let commands = vec![
            CommandLine::from_strs("protoc", &["--cpp_out=.", "a.proto"]),
            CommandLine::from_strs("/opt/bin/mycc", &["-c", "a.c", "-o", "a.o"]),
            CommandLine::from_strs("mylink", &["a.o", "-o", "liba.so"]),
            CommandLine::from_strs("ccache", &["mycc", "-c", "b.c"]),
        ];

        let result = classify(&commands, &Posix, &tools).unwrap();

        assert!(result.unclassified.is_empty());
        assert!(result.steps[0].is_no_op());
        assert_eq!(result.steps[1].inputs, vec!["a.c"]);
        assert_eq!(result.steps[2].outputs, vec!["liba.so"]);
        assert_eq!(result.steps[3].outputs, vec!["b.o"]);
    }

    #[test]
    fn test_builtin_tools_take_priority() {
        let tools = create(&[tool("gcc", config::ToolAction::Ignore)]);
        let commands = vec![CommandLine::from_strs("gcc", &["-c", "a.c"])];

        let result = classify(&commands, &Posix, &tools).unwrap();

        assert!(!result.steps[0].is_no_op());
    }
}
