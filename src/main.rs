use anyhow::Context;
use clap::Parser;
use std::path::Path;
use testmodule::core::emitter::{render_descriptor, render_json};
use testmodule::core::processor::{main_source_path, BINARY_FILE, SOURCE_FILE};
use testmodule::core::reader;
use testmodule::domain::model::MergeStrategy;
use testmodule::utils::{logger, validation::Validate};
use testmodule::{
    CliConfig, CollectingReporter, LocalStorage, TestModuleProcessor, TomlConfig, TracingReporter,
};

fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::debug!("CLI config: {:?}", args);

    let storage = LocalStorage::new(args.base_path.clone());

    if let Some(path) = &args.describe {
        return describe(&storage, path, args.json);
    }

    tracing::info!("Loading configuration from: {}", args.config);
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config (category: {:?}): {}", e.category(), e);
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Some(output_path) = &args.output_path {
        config.processor.output_path = output_path.clone();
        tracing::info!("Output path overridden to: {}", output_path);
    }

    if let Err(e) = config.validate() {
        tracing::error!(
            "Configuration validation failed (category: {:?}): {}",
            e.category(),
            e
        );
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let units = config.test_units();
    if args.dry_run {
        print_plan(&config);
        return Ok(());
    }

    let reporter = CollectingReporter::new(TracingReporter::new(
        args.verbose || config.processor.verbose,
    ));
    let mut processor = TestModuleProcessor::new(storage, reporter, config.output_path());
    let report = processor.process_round(&units);

    for artifact in &report.generated {
        println!("✅ {} -> {} ({} bytes)", artifact.unit, artifact.path, artifact.size);
    }

    if !report.is_success() {
        for diagnostic in processor.reporter().errors() {
            eprintln!("❌ {}: {}", diagnostic.unit, diagnostic.message);
        }
        eprintln!(
            "{} of {} units failed in round #{}",
            report.failed.len(),
            units.len(),
            report.round
        );
        std::process::exit(1);
    }

    Ok(())
}

fn describe(storage: &LocalStorage, path: &str, json: bool) -> anyhow::Result<()> {
    let descriptor = reader::read_from_binary(storage, path)
        .with_context(|| format!("Failed to describe `{}`", path))?;

    if json {
        println!("{}", render_json(&descriptor)?);
    } else {
        if let Some(version) = &descriptor.version {
            println!("// version {}", version);
        }
        if let Some(main_class) = &descriptor.main_class {
            println!("// main class {}", main_class);
        }
        for line in render_descriptor(&descriptor) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn print_plan(config: &TomlConfig) {
    println!("📋 Dry run: {} units", config.units.len());
    println!("  Output: {}", config.output_path());
    println!();

    for unit in config.test_units() {
        let directives = &unit.directives;
        let strategy = directives.strategy();
        let output_dir = unit.output_path.as_deref().unwrap_or(config.output_path());
        let file = match strategy {
            MergeStrategy::Textual => SOURCE_FILE,
            MergeStrategy::Structural => BINARY_FILE,
        };

        println!("🔧 {}", unit.name);
        println!("  Strategy: {}", strategy);
        if directives.merge {
            let main = match (&strategy, &unit.main_descriptor_binary_path) {
                (MergeStrategy::Structural, Some(binary)) => binary.clone(),
                _ => main_source_path(&unit),
            };
            println!("  Main descriptor: {}", main);
        } else {
            println!("  Main descriptor: (not merged)");
        }
        match strategy {
            MergeStrategy::Textual => println!("  Test lines: {}", directives.lines.len()),
            MergeStrategy::Structural => {
                println!("  Test requires: {}", directives.requires.join(", "))
            }
        }
        println!("  Output: {}", Path::new(output_dir).join(file).display());
        println!();
    }
}
