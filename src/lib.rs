pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::reporter::{CollectingReporter, TracingReporter};
pub use adapters::storage::LocalStorage;
pub use config::toml_config::TomlConfig;
pub use crate::core::processor::{RoundReport, TestModuleProcessor};
pub use domain::model::{
    Descriptor, Export, Modifier, Open, PackageDirective, Provide, Require, TestDirectives,
    TestUnit,
};
pub use utils::error::{ModuleError, Result};
