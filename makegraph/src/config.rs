// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code. It tells which path rules the
//! traces follow, how strict the analysis is about the commands it does not
//! recognize, and which extra tools shall be recognized.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `makegraph.yml`.
//!
//! The configuration file location is searched in the following order:
//! 1. The current working directory
//! 2. The local configuration directory of the user
//! 3. The configuration directory of the user
//! 4. The local configuration directory of the application
//! 5. The configuration directory of the application
//!
//! ```yaml
//! schema: 1.0
//!
//! platform: windows
//! unclassified: fail
//!
//! tools:
//!   - name: protoc
//!     action: ignore
//!   - name: mycc
//!     action: compiler
//!   - name: myar
//!     action: archiver
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use crate::conventions::Platform;
    use serde::Deserialize;
    use std::fmt;

    /// Represents the application configuration.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub platform: TracePlatform,
        #[serde(default)]
        pub unclassified: UnclassifiedPolicy,
        #[serde(default)]
        pub tools: Vec<Tool>,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                platform: TracePlatform::default(),
                unclassified: UnclassifiedPolicy::default(),
                tools: vec![],
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            match serde_yml::to_string(self) {
                Ok(yaml_string) => {
                    for line in yaml_string.lines() {
                        writeln!(f, "{}", line)?;
                    }
                    Ok(())
                }
                Err(_) => Err(fmt::Error),
            }
        }
    }

    /// The platform which recorded the traces.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TracePlatform {
        Posix,
        Windows,
        /// The platform this program is running on.
        #[default]
        Host,
    }

    impl TracePlatform {
        pub fn resolve(&self) -> Platform {
            match self {
                TracePlatform::Posix => Platform::Posix,
                TracePlatform::Windows => Platform::Windows,
                TracePlatform::Host => Platform::host(),
            }
        }
    }

    /// What to do with the commands which are not recognized.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UnclassifiedPolicy {
        /// Log them and continue.
        #[default]
        Warn,
        /// Fail the analysis of the trace.
        Fail,
    }

    /// An extra tool to recognize, by its executable name.
    #[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Tool {
        pub name: String,
        pub action: ToolAction,
    }

    /// How to interpret the invocations of a configured tool.
    #[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum ToolAction {
        /// The tool does not contribute to the build graph.
        Ignore,
        /// The tool takes GCC compatible compiler flags.
        Compiler,
        /// The tool takes `ar` compatible arguments.
        Archiver,
        /// The tool takes `ld` compatible arguments.
        Linker,
    }

    const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use std::collections::HashSet;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: String },
        #[error("Invalid value for field '{field}': '{value}'")]
        InvalidValue { field: &'static str, value: String },
        #[error("Duplicate {field} entry at: {idx}")]
        DuplicateEntry { field: &'static str, idx: usize },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn new() -> Self {
            Self { errors: Vec::new() }
        }

        fn add(&mut self, error: ValidationError) {
            self.errors.push(error);
        }

        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn finish(mut self) -> Result<(), ValidationError> {
            match self.errors.len() {
                0 => Ok(()),
                1 => Err(self.errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors: self.errors }),
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::new();

            for tool in config.tools.iter() {
                collector.add_result(Tool::validate(tool));
            }

            // The first definition would win, the later ones would be silently ignored.
            let mut seen_names = HashSet::new();
            for (idx, tool) in config.tools.iter().enumerate() {
                if !seen_names.insert(tool.name.as_str()) {
                    collector.add(ValidationError::DuplicateEntry { field: "tool", idx });
                }
            }

            collector.finish()
        }
    }

    impl Validator<Tool> for Tool {
        type Error = ValidationError;

        fn validate(config: &Tool) -> Result<(), Self::Error> {
            let name = config.name.trim();
            if name.is_empty() {
                Err(ValidationError::EmptyString { field: "tools.name".to_string() })
            } else if name.contains(['/', '\\']) {
                Err(ValidationError::InvalidValue { field: "tools.name", value: config.name.clone() })
            } else {
                Ok(())
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn tool(name: &str, action: ToolAction) -> Tool {
            Tool { name: name.to_string(), action }
        }

        #[test]
        fn test_validate_default_config() {
            assert!(Main::validate(&Main::default()).is_ok());
        }

        #[test]
        fn test_validate_tool_empty_name() {
            let result = Tool::validate(&tool("  ", ToolAction::Ignore));

            match result {
                Err(ValidationError::EmptyString { field }) => assert_eq!(field, "tools.name"),
                _ => panic!("Expected EmptyString validation error"),
            }
        }

        #[test]
        fn test_validate_tool_name_with_path() {
            let result = Tool::validate(&tool("/usr/bin/protoc", ToolAction::Ignore));

            assert!(matches!(result, Err(ValidationError::InvalidValue { .. })));
        }

        #[test]
        fn test_validate_duplicate_tools() {
            let config = Main {
                tools: vec![
                    tool("protoc", ToolAction::Ignore),
                    tool("mycc", ToolAction::Compiler),
                    tool("protoc", ToolAction::Linker),
                ],
                ..Main::default()
            };

            match Main::validate(&config) {
                Err(ValidationError::DuplicateEntry { field, idx }) => {
                    assert_eq!(field, "tool");
                    assert_eq!(idx, 2);
                }
                _ => panic!("Expected DuplicateEntry validation error"),
            }
        }

        #[test]
        fn test_validate_collects_multiple_errors() {
            let config = Main {
                tools: vec![tool("", ToolAction::Ignore), tool("", ToolAction::Ignore)],
                ..Main::default()
            };

            match Main::validate(&config) {
                Err(ValidationError::Multiple { errors }) => assert_eq!(errors.len(), 3),
                _ => panic!("Expected Multiple validation errors"),
            }
        }
    }
}

pub mod loader {
    use super::{Main, Validator};
    use directories::{BaseDirs, ProjectDirs};
    use log::{debug, info};
    use std::fs::OpenOptions;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const DEFAULT_FILE_NAME: &str = "makegraph.yml";

    pub struct Loader {}

    impl Loader {
        /// Loads the configuration from the specified file or the default locations.
        ///
        /// If the configuration file is specified, it will be used. Otherwise, the default locations
        /// will be searched for the configuration file. If the configuration file is not found, the
        /// default configuration will be returned.
        pub fn load(
            context: &crate::context::Context,
            filename: &Option<String>,
        ) -> Result<Main, ConfigError> {
            if let Some(path) = filename {
                Self::from_file(Path::new(path))
            } else {
                for location in Self::file_locations(context) {
                    debug!("Checking configuration file: {}", location.display());
                    if location.exists() {
                        return Self::from_file(location.as_path());
                    }
                }
                debug!("Configuration file not found. Using the default configuration.");
                Ok(Main::default())
            }
        }

        /// The default locations where the configuration file can be found.
        fn file_locations(context: &crate::context::Context) -> Vec<PathBuf> {
            let mut locations = Vec::new();

            locations.push(context.current_directory.clone());
            if let Some(base_dirs) = BaseDirs::new() {
                locations.push(base_dirs.config_local_dir().to_path_buf());
                locations.push(base_dirs.config_dir().to_path_buf());
            }
            if let Some(proj_dirs) = ProjectDirs::from("com.github", "rizsotto", "makegraph") {
                locations.push(proj_dirs.config_local_dir().to_path_buf());
                locations.push(proj_dirs.config_dir().to_path_buf());
            }
            locations.dedup();
            locations.iter().map(|p| p.join(DEFAULT_FILE_NAME)).collect()
        }

        /// Loads the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let reader = OpenOptions::new()
                .read(true)
                .open(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let content: Main = Self::from_reader(reader)
                .map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            Main::validate(&content)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            Ok(content)
        }

        /// Define the deserialization format of the config file.
        fn from_reader<R, T>(rdr: R) -> serde_yml::Result<T>
        where
            R: std::io::Read,
            T: serde::de::DeserializeOwned,
        {
            serde_yml::from_reader(rdr)
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("Failed to access configuration file '{path}': {source}")]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("Failed to parse configuration from file '{path}': {source}")]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        #[error("Configuration validation failed for file '{path}': {source}")]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

    #[cfg(test)]
    mod test {

        use super::super::*;
        use super::*;
        use std::fs;

        #[test]
        fn test_full_config() {
            let content: &[u8] = br#"
            schema: 1.0

            platform: windows
            unclassified: fail

            tools:
              - name: protoc
                action: ignore
              - name: mycc
                action: compiler
            "#;

            let result: Main = Loader::from_reader(content).unwrap();

            let expected = Main {
                schema: String::from("1.0"),
                platform: TracePlatform::Windows,
                unclassified: UnclassifiedPolicy::Fail,
                tools: vec![
                    Tool { name: "protoc".to_string(), action: ToolAction::Ignore },
                    Tool { name: "mycc".to_string(), action: ToolAction::Compiler },
                ],
            };
            assert_eq!(result, expected);
        }

        #[test]
        fn test_default_values() {
            let content: &[u8] = br#"
            schema: 1.0
            "#;

            let result: Main = Loader::from_reader(content).unwrap();

            assert_eq!(result, Main::default());
            assert_eq!(result.platform, TracePlatform::Host);
            assert_eq!(result.unclassified, UnclassifiedPolicy::Warn);
        }

        #[test]
        fn test_unsupported_schema() {
            let content: &[u8] = br#"
            schema: 4.0
            "#;

            let result: serde_yml::Result<Main> = Loader::from_reader(content);

            assert!(result.is_err());
        }

        #[test]
        fn test_unknown_action() {
            let content: &[u8] = br#"
            schema: 1.0
            tools:
              - name: protoc
                action: execute
            "#;

            let result: serde_yml::Result<Main> = Loader::from_reader(content);

            assert!(result.is_err());
        }

        #[test]
        fn test_load_from_file() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let path = temp_dir.path().join(DEFAULT_FILE_NAME);
            fs::write(&path, "schema: 1.0\nplatform: posix\n").unwrap();

            let result = Loader::from_file(&path).unwrap();

            assert_eq!(result.platform, TracePlatform::Posix);
        }

        #[test]
        fn test_load_invalid_file() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let path = temp_dir.path().join(DEFAULT_FILE_NAME);
            fs::write(&path, "schema: 1.0\ntools:\n  - name: ''\n    action: ignore\n").unwrap();

            let result = Loader::from_file(&path);

            assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
        }

        #[test]
        fn test_load_missing_file() {
            let result = Loader::from_file(Path::new("/nonexistent/makegraph.yml"));

            assert!(matches!(result, Err(ConfigError::FileAccess { .. })));
        }

        #[test]
        fn test_load_from_current_directory() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            fs::write(temp_dir.path().join(DEFAULT_FILE_NAME), "schema: 1.0\nunclassified: fail\n").unwrap();
            let context = crate::context::Context {
                current_executable: PathBuf::from("/usr/bin/makegraph"),
                current_directory: temp_dir.path().to_path_buf(),
            };

            let result = Loader::load(&context, &None).unwrap();

            assert_eq!(result.unclassified, UnclassifiedPolicy::Fail);
        }
    }
}
