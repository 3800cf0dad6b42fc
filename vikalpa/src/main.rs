//! Vikalpa command line.
//!
//! # Usage
//!
//! ```bash
//! # Generate all configurations of a variation file
//! vikalpa generate scenarios/variations.yaml -o out/variants.yaml --cache out/cache.json
//!
//! # Show per-variation counts and failures without writing anything
//! vikalpa list scenarios/variations.yaml
//!
//! # List registered variation kinds
//! vikalpa kinds
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use vikalpa::io::write_variants;
use vikalpa::{
    CompositionEngine, GenerationCache, GenerationOutcome, Result, VariationFile, VariationRegistry,
};

#[derive(Parser)]
#[command(name = "vikalpa")]
#[command(about = "Generate test configurations from variation files")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate configurations and write them as YAML
    Generate {
        /// Variation file
        file: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "variants.yaml")]
        output: PathBuf,

        /// Generation cache, loaded if present and saved afterwards
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Show how many configurations each scenario yields
    List {
        /// Variation file
        file: PathBuf,

        /// Generation cache, loaded if present
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// List registered variation kinds
    Kinds,
}

// ============================================================================
// Commands
// ============================================================================

fn open_engine(file: &VariationFile, cache: Option<&Path>) -> Result<CompositionEngine> {
    let engine = CompositionEngine::new(file.settings.general.clone());
    match cache {
        Some(path) if path.exists() => Ok(engine.with_cache(GenerationCache::load(path)?)),
        _ => Ok(engine),
    }
}

fn generate(file: &Path, output: &Path, cache: Option<&Path>) -> Result<GenerationOutcome> {
    let variations = VariationFile::load(file)?;
    let engine = open_engine(&variations, cache)?;
    let outcome = engine.generate_all(&variations)?;

    write_variants(output, &outcome.scenarios)?;
    if let Some(path) = cache {
        engine.cache().save(path)?;
    }

    let stats = engine.cache().stats();
    info!(
        "Cache: {} entries, {} hits, {} misses",
        stats.entries, stats.hits, stats.misses
    );
    Ok(outcome)
}

fn list(file: &Path, cache: Option<&Path>) -> Result<GenerationOutcome> {
    let variations = VariationFile::load(file)?;
    let engine = open_engine(&variations, cache)?;
    let outcome = engine.generate_all(&variations)?;

    let mut out = std::io::stdout().lock();
    for scenario in &outcome.scenarios {
        let expected = scenario
            .expected_total
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        writeln!(out, "{}: {} configurations (expected {})", scenario.scenario, scenario.len(), expected)?;
        for summary in &scenario.summaries {
            let expected = summary
                .expected
                .map_or_else(|| "-".to_string(), |n| n.to_string());
            writeln!(out, "  {:<48} {:>6} (expected {})", summary.variation, summary.produced, expected)?;
        }
        for diagnostic in &scenario.diagnostics {
            writeln!(out, "  ! {}: {}", diagnostic.variation, diagnostic.message)?;
        }
    }
    for failure in &outcome.failed_scenarios {
        writeln!(out, "{}: FAILED: {}", failure.scenario, failure.message)?;
    }
    writeln!(out, "Total: {}", outcome.total_configurations())?;
    Ok(outcome)
}

fn report(outcome: &GenerationOutcome) -> ExitCode {
    if outcome.failed_scenarios.is_empty() {
        if !outcome.is_complete() {
            info!("Some scenarios are incomplete; see diagnostics");
        }
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let args = Args::parse();

    let result = match &args.command {
        Commands::Generate {
            file,
            output,
            cache,
        } => generate(file, output, cache.as_deref()),
        Commands::List { file, cache } => list(file, cache.as_deref()),
        Commands::Kinds => {
            for kind in VariationRegistry::with_defaults().kinds() {
                println!("{}", kind);
            }
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(outcome) => report(&outcome),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
