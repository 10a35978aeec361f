//! Soundlink CLI
//!
//! Command-line driver for the link discovery engine:
//! - Computing a mapping between two JSON entity collections
//! - Inspecting phonetic codes
//! - Comparing strategy cost estimates

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use soundlink_core::values::DistinctValues;
use soundlink_core::{
    AttributePair, Collaborator, Completion, Mapper, MapperRegistry, MappingOutcome, MemoryCache,
    Soundex, SoundexMapper, SoundexMapperConfig, TemporalMapper,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "soundlink")]
#[command(author, version, about = "Soundlink: phonetic link discovery")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute links between a source and a target collection.
    Map {
        /// Source entities (JSON array of {"uri", "properties"})
        #[arg(long)]
        source: PathBuf,
        /// Target entities (JSON array of {"uri", "properties"})
        #[arg(long)]
        target: PathBuf,
        /// Similarity invocation, e.g. `soundex(x.name, y.name)`
        #[arg(long)]
        expr: String,
        /// Similarity threshold in [0, 1]
        #[arg(long, default_value_t = 1.0)]
        threshold: f64,
        /// Mapper configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Strategy name, or `auto` for the cheapest one evaluating the
        /// expression's function; defaults to the function name
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
        format: OutputFormat,
    },

    /// Print the Soundex code of each value.
    Encode {
        values: Vec<String>,
        /// Code length
        #[arg(long, default_value_t = Soundex::DEFAULT_CODE_LENGTH)]
        length: usize,
    },

    /// Print runtime / result-size estimates for every registered strategy.
    Estimate {
        #[arg(long)]
        source_size: usize,
        #[arg(long)]
        target_size: usize,
        #[arg(long, default_value_t = 1.0)]
        threshold: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Tsv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Map {
            source,
            target,
            expr,
            threshold,
            config,
            strategy,
            format,
        } => cmd_map(
            &source,
            &target,
            &expr,
            threshold,
            config.as_deref(),
            strategy.as_deref(),
            format,
        ),
        Commands::Encode { values, length } => {
            cmd_encode(&values, length);
            Ok(())
        }
        Commands::Estimate {
            source_size,
            target_size,
            threshold,
        } => {
            cmd_estimate(source_size, target_size, threshold);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn registry(config: Option<&Path>) -> Result<MapperRegistry> {
    let mut registry = MapperRegistry::new();
    let config = match config {
        Some(path) => SoundexMapperConfig::from_json_file(path)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("failed to load mapper config {}", path.display()))?,
        None => SoundexMapperConfig::default(),
    };
    registry.register(Arc::new(SoundexMapper::new(Arc::new(Soundex::new()), config)));
    registry.register(Arc::new(TemporalMapper::new()));
    Ok(registry)
}

fn load_cache(path: &Path) -> Result<MemoryCache> {
    MemoryCache::from_json_file(path)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("failed to load entities from {}", path.display()))
}

fn cmd_map(
    source: &Path,
    target: &Path,
    expr: &str,
    threshold: f64,
    config: Option<&Path>,
    strategy: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let (function, attributes) = AttributePair::from_expression(expr)?;
    let registry = registry(config)?;
    let source = load_cache(source)?;
    let target = load_cache(target)?;

    let mapper = select_mapper(
        &registry,
        strategy,
        &function,
        &source,
        &target,
        &attributes,
        threshold,
    )?;
    let outcome = mapper.compute_mapping(&source, &target, &attributes, threshold)?;
    print_outcome(mapper.as_ref(), &outcome, format)?;
    Ok(())
}

/// `auto` picks the cheapest strategy for `function`, sized by distinct values.
fn select_mapper(
    registry: &MapperRegistry,
    strategy: Option<&str>,
    function: &str,
    source: &MemoryCache,
    target: &MemoryCache,
    attributes: &AttributePair,
    threshold: f64,
) -> Result<Arc<dyn Mapper>> {
    let name = strategy.unwrap_or(function);
    let mapper = if name == "auto" {
        let source_size =
            DistinctValues::aggregate(source, &attributes.source, Collaborator::SourceCache)?.len();
        let target_size =
            DistinctValues::aggregate(target, &attributes.target, Collaborator::TargetCache)?.len();
        registry.cheapest(function, source_size, target_size, threshold)
    } else {
        registry.get(name)
    };
    mapper.ok_or_else(|| {
        anyhow!(
            "no strategy {:?} for function {:?} (available: {})",
            name,
            function,
            registry.names().join(", ")
        )
    })
}

fn print_outcome(mapper: &dyn Mapper, outcome: &MappingOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Tsv => {
            for (source, target, score) in outcome.mapping.iter() {
                println!("{source}\t{target}\t{score}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.mapping)?);
        }
    }

    let status = match outcome.completion {
        Completion::Complete => "complete".green(),
        Completion::Cancelled { searched, total } => {
            format!("cancelled ({searched}/{total})").as_str().yellow()
        }
    };
    eprintln!(
        "{} {} links via {} ({} source / {} target values, {} skipped)",
        status,
        outcome.mapping.len().to_string().as_str().bold(),
        mapper.name().cyan(),
        outcome.diagnostics.source_values,
        outcome.diagnostics.target_values,
        outcome.diagnostics.skipped_values,
    );
    Ok(())
}

fn cmd_encode(values: &[String], length: usize) {
    let soundex = Soundex::with_code_length(length);
    for value in values {
        println!("{}\t{}", value, soundex.code(value));
    }
}

fn cmd_estimate(source_size: usize, target_size: usize, threshold: f64) {
    let registry = MapperRegistry::with_defaults();
    for mapper in registry.iter() {
        println!(
            "{:<22} runtime={:>12} size={:.1}",
            mapper.name(),
            format!("{:?}", mapper.estimate_runtime(source_size, target_size, threshold)),
            mapper.estimate_result_size(source_size, target_size, threshold),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_command_parses() {
        let cli = Cli::try_parse_from([
            "soundlink",
            "-vv",
            "map",
            "--source",
            "s.json",
            "--target",
            "t.json",
            "--expr",
            "soundex(x.name, y.name)",
            "--threshold",
            "0.75",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Map {
                threshold, format, ..
            } => {
                assert_eq!(threshold, 0.75);
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected map command"),
        }
    }

    #[test]
    fn registry_uses_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapper.json");
        std::fs::write(&path, r#"{"parallel": false}"#).unwrap();
        let registry = registry(Some(&path)).unwrap();
        assert_eq!(registry.names(), vec!["soundex", "temporal_same_begin"]);

        let missing = dir.path().join("missing.json");
        assert!(registry_err(&missing).contains("failed to load mapper config"));
    }

    #[test]
    fn auto_strategy_stays_with_the_expression_function() {
        let mut source = MemoryCache::new();
        let mut target = MemoryCache::new();
        for i in 0..2000 {
            source.add_triple(&format!("s{i}"), "name", &format!("Robert{i}"));
            target.add_triple(&format!("t{i}"), "name", &format!("Rupert{i}"));
        }
        let registry = MapperRegistry::with_defaults();
        let (function, attributes) =
            AttributePair::from_expression("soundex(x.name, y.name)").unwrap();

        let mapper = select_mapper(
            &registry,
            Some("auto"),
            &function,
            &source,
            &target,
            &attributes,
            0.5,
        )
        .unwrap();
        assert_eq!(mapper.name(), "soundex");

        let (function, attributes) =
            AttributePair::from_expression("jaro(x.name, y.name)").unwrap();
        let err = select_mapper(
            &registry,
            Some("auto"),
            &function,
            &source,
            &target,
            &attributes,
            0.5,
        )
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
        assert!(err.contains("jaro"));
    }

    fn registry_err(path: &Path) -> String {
        match registry(Some(path)) {
            Ok(_) => String::new(),
            Err(e) => format!("{e:#}"),
        }
    }
}
