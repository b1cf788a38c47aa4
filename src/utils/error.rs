use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Malformed module descriptor source `{path}`: {message}")]
    MalformedDescriptorSource { path: String, message: String },

    #[error("Malformed module descriptor binary: {message}")]
    MalformedDescriptorBinary { message: String },

    #[error("No test module directives given for {strategy} merge")]
    EmptyTestDirectives { strategy: String },

    #[error("IO error on `{path}`: {source}")]
    IoFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Modifier {modifier} is not valid on a `{directive}` directive")]
    InvalidModifierCombination { directive: String, modifier: String },

    #[error("Module descriptor too large: {what}")]
    DescriptorTooLarge { what: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value `{value}` for `{field}`: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field `{field}`")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Io,
    Internal,
}

impl ModuleError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ModuleError::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn malformed_binary(message: impl Into<String>) -> Self {
        ModuleError::MalformedDescriptorBinary {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ModuleError::MalformedDescriptorSource { .. }
            | ModuleError::MalformedDescriptorBinary { .. } => ErrorCategory::Input,
            ModuleError::EmptyTestDirectives { .. }
            | ModuleError::ConfigError { .. }
            | ModuleError::InvalidConfigValueError { .. }
            | ModuleError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ModuleError::IoFailure { .. } => ErrorCategory::Io,
            ModuleError::InvalidModifierCombination { .. }
            | ModuleError::DescriptorTooLarge { .. }
            | ModuleError::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ModuleError::MalformedDescriptorSource { .. } => {
                "Check that the main module-info.java declares `module <name> {`"
            }
            ModuleError::MalformedDescriptorBinary { .. } => {
                "Rebuild the main module-info.class or point to the source descriptor instead"
            }
            ModuleError::EmptyTestDirectives { .. } => {
                "Add at least one entry to `lines` (textual) or `requires` (compile)"
            }
            ModuleError::IoFailure { .. } => "Verify the path exists and is readable/writable",
            ModuleError::ConfigError { .. }
            | ModuleError::InvalidConfigValueError { .. }
            | ModuleError::MissingConfigError { .. } => "Fix the configuration file and retry",
            ModuleError::InvalidModifierCombination { .. }
            | ModuleError::DescriptorTooLarge { .. }
            | ModuleError::SerializationError(_) => "Please report this as a bug",
        }
    }
}

pub type Result<T> = std::result::Result<T, ModuleError>;
