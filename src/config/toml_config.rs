use crate::domain::model::{TestDirectives, TestUnit};
use crate::utils::error::{ModuleError, Result};
use crate::utils::validation::{
    validate_module_name, validate_non_empty_string, validate_path, validate_unique, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

pub const DEFAULT_MAIN_DESCRIPTOR_PATH: &str = "src/main/java";
pub const DEFAULT_OUTPUT_PATH: &str = "target/generated-test-sources/test-annotations";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    #[serde(default = "default_main_descriptor_path")]
    pub main_descriptor_path: String,
    pub main_descriptor_binary_path: Option<String>,
    pub output_path: Option<String>,
    #[serde(default = "default_true")]
    pub merge: bool,
    #[serde(default)]
    pub compile: bool,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub requires: Vec<String>,
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn default_main_descriptor_path() -> String {
    DEFAULT_MAIN_DESCRIPTOR_PATH.to_string()
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ModuleError::io(path.display().to_string(), e))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ModuleError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("processor.output_path", &self.processor.output_path)?;
        validate_unique("units.name", self.units.iter().map(|u| u.name.as_str()))?;

        for unit in &self.units {
            validate_non_empty_string("units.name", &unit.name)?;
            validate_path("units.main_descriptor_path", &unit.main_descriptor_path)?;
            if let Some(binary) = &unit.main_descriptor_binary_path {
                validate_path("units.main_descriptor_binary_path", binary)?;
            }
            if let Some(output) = &unit.output_path {
                validate_path("units.output_path", output)?;
            }
            for name in &unit.requires {
                validate_module_name("units.requires", name)?;
            }
        }

        Ok(())
    }

    pub fn output_path(&self) -> &str {
        &self.processor.output_path
    }

    pub fn test_units(&self) -> Vec<TestUnit> {
        self.units.iter().map(UnitConfig::to_test_unit).collect()
    }
}

impl UnitConfig {
    pub fn to_test_unit(&self) -> TestUnit {
        TestUnit {
            name: self.name.clone(),
            main_descriptor_path: self.main_descriptor_path.clone(),
            main_descriptor_binary_path: self.main_descriptor_binary_path.clone(),
            output_path: self.output_path.clone(),
            directives: TestDirectives {
                lines: self.lines.clone(),
                requires: self.requires.clone(),
                merge: self.merge,
                compile: self.compile,
            },
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
