pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "testmodule")]
#[command(about = "Derive open test module descriptors from a main module descriptor")]
pub struct CliConfig {
    /// Path to the TOML file listing the test units
    #[arg(short, long, default_value = "testmodule.toml")]
    pub config: String,

    /// Project root; relative paths in the config resolve against it
    #[arg(long, default_value = ".")]
    pub base_path: String,

    /// Override `processor.output_path` from the config
    #[arg(long)]
    pub output_path: Option<String>,

    /// Show what would be generated without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Decode a module-info.class and print it instead of processing units
    #[arg(long, value_name = "FILE")]
    pub describe: Option<String>,

    /// With --describe, print the descriptor as JSON
    #[arg(long, requires = "describe")]
    pub json: bool,

    /// Emit log records as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
