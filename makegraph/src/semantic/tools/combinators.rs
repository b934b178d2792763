// SPDX-License-Identifier: GPL-3.0-or-later

use crate::command::CommandLine;
use crate::conventions::PathConventions;
use crate::semantic::{BuildStepInfo, BuildTool, ClassifyError};

/// Represents a set of tools, where any of them can recognize the command.
/// The evaluation is done in the order of the tools. The first one which
/// recognizes the command creates the step.
pub(super) struct Any {
    tools: Vec<Box<dyn BuildTool>>,
}

impl Any {
    pub(super) fn new(tools: Vec<Box<dyn BuildTool>>) -> Self {
        Self { tools }
    }

    fn find(&self, command: &CommandLine, conventions: &dyn PathConventions) -> Option<&dyn BuildTool> {
        self.tools
            .iter()
            .find(|tool| tool.is_match(command, conventions))
            .map(|tool| tool.as_ref())
    }
}

impl BuildTool for Any {
    fn name(&self) -> &str {
        "any"
    }

    fn is_match(&self, command: &CommandLine, conventions: &dyn PathConventions) -> bool {
        self.find(command, conventions).is_some()
    }

    fn create_step(
        &self,
        command: &CommandLine,
        conventions: &dyn PathConventions,
    ) -> Result<BuildStepInfo, ClassifyError> {
        match self.find(command, conventions) {
            Some(tool) => tool.create_step(command, conventions),
            None => Ok(BuildStepInfo::no_op(command.clone())),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::conventions::Posix;

    #[test]
    fn test_any_when_no_match() {
        let sut = Any::new(vec![
            Box::new(MockTool::NotRecognize),
            Box::new(MockTool::NotRecognize),
            Box::new(MockTool::NotRecognize),
        ]);

        assert!(!sut.is_match(&command_fixture(), &Posix));
    }

    #[test]
    fn test_any_when_success() {
        let sut = Any::new(vec![
            Box::new(MockTool::NotRecognize),
            Box::new(MockTool::Recognize("second")),
            Box::new(MockTool::Recognize("third")),
        ]);

        assert!(sut.is_match(&command_fixture(), &Posix));
        let step = sut.create_step(&command_fixture(), &Posix).unwrap();
        assert_eq!(step.outputs, vec!["second"]);
    }

    enum MockTool {
        Recognize(&'static str),
        NotRecognize,
    }

    impl BuildTool for MockTool {
        fn name(&self) -> &str {
            "mock"
        }

        fn is_match(&self, _: &CommandLine, _: &dyn PathConventions) -> bool {
            matches!(self, MockTool::Recognize(_))
        }

        fn create_step(
            &self,
            command: &CommandLine,
            _: &dyn PathConventions,
        ) -> Result<BuildStepInfo, ClassifyError> {
            let outputs = match self {
                MockTool::Recognize(output) => vec![output.to_string()],
                MockTool::NotRecognize => vec![],
            };
            Ok(BuildStepInfo::new(command.clone(), vec![], outputs, false))
        }
    }

    fn command_fixture() -> CommandLine {
        CommandLine::from_strs("cc", &["-c", "a.c"])
    }
}
