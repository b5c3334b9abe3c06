//! PhET-iO API Comparison CLI
//!
//! Compares a proposed API descriptor against a reference descriptor and
//! reports breaking and designed problems.
//!
//! Usage:
//!   phetio-api-compare reference-api.json proposed-api.json
//!   phetio-api-compare reference-api.json proposed-api.json --no-designed --format json
//!   phetio-api-compare legacy-api.json --up-convert

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use phetio_api_compare::config::OutputFormat;
use phetio_api_compare::{
    compare_descriptors, up_convert, ApiDescriptor, CompareConfig, ComparisonReport,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Exit code when breaking problems (or designed ones, with fail_on_designed) exist
const EXIT_PROBLEMS: i32 = 2;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "phetio-api-compare")]
#[command(about = "Detect breaking and designed changes between two PhET-iO API files")]
struct Cli {
    /// Reference (previously published) API file
    reference: PathBuf,

    /// Proposed API file
    proposed: Option<PathBuf>,

    /// Config file (in addition to api-compare.toml in the usual locations)
    #[arg(short, long)]
    config: Option<String>,

    /// Skip breaking change detection
    #[arg(long)]
    no_breaking: bool,

    /// Skip designed change detection
    #[arg(long)]
    no_designed: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Print the reference API normalized to the nested format and exit
    #[arg(long)]
    up_convert: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let config = CompareConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    let reference = load_descriptor(&cli.reference)?;

    if cli.up_convert {
        let normalized = up_convert(&reference).to_value()?;
        println!("{}", render_json(&normalized, config.report.output_format)?);
        return Ok(0);
    }

    let proposed_path = cli
        .proposed
        .as_deref()
        .context("a proposed API file is required unless --up-convert is given")?;
    let proposed = load_descriptor(proposed_path)?;

    let mut options = config.compare_options();
    if cli.no_breaking {
        options.compare_breaking_api_changes = false;
    }
    if cli.no_designed {
        options.compare_designed_api_changes = false;
    }

    let report = compare_descriptors(&reference, &proposed, &options)
        .context("comparison could not be completed")?;

    match cli.format {
        Format::Json => {
            let value = serde_json::to_value(&report)?;
            println!("{}", render_json(&value, config.report.output_format)?);
        }
        Format::Text => print_text_report(&report),
    }

    let failed = !report.is_safe()
        || (config.report.fail_on_designed && !report.designed_problems.is_empty());
    Ok(if failed { EXIT_PROBLEMS } else { 0 })
}

fn load_descriptor(path: &Path) -> Result<ApiDescriptor> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let descriptor = ApiDescriptor::from_json_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        path = %path.display(),
        version = ?descriptor.version(),
        types = descriptor.types().len(),
        "loaded API descriptor"
    );
    Ok(descriptor)
}

fn render_json(value: &serde_json::Value, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    })
}

fn print_text_report(report: &ComparisonReport) {
    if report.is_clean() {
        println!("No API problems detected");
        return;
    }

    if !report.breaking_problems.is_empty() {
        println!("Breaking API problems ({}):", report.breaking_problems.len());
        for problem in &report.breaking_problems {
            println!("  - {}", problem);
        }
    }

    if !report.designed_problems.is_empty() {
        println!("Designed API problems ({}):", report.designed_problems.len());
        for problem in &report.designed_problems {
            println!("  - {}", problem);
        }
    }
}
