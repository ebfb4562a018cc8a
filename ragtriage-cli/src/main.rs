// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ragtriage CLI
//!
//! Command-line interface for attributing poor RAG evaluation results to
//! the retrieval, context or generation stage.

mod config;
mod output;
mod source;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::TriageConfig;
use output::{render_attribution, render_report, OutputFormat};
use ragtriage_core::{MetricRecord, MetricRow};
use ragtriage_evals::{
    evaluate_rows, list_strategies, AttributionStrategy, Attributor, GradingStandard, MetricGrade,
};
use source::{open_source, InputFormat};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ragtriage")]
#[command(about = "Ragtriage - attribute poor RAG evaluation results to a pipeline stage", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute every record of a metrics file
    Classify(ClassifyArgs),

    /// Show the attribution trace for a single record
    Explain(ExplainArgs),

    /// List built-in attribution strategies
    Strategies,
}

#[derive(Args)]
struct ClassifyArgs {
    /// Metrics file (CSV with header row, JSON array or JSON lines)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format; detected from the file extension when omitted
    #[arg(long, value_enum)]
    input_format: Option<InputFormat>,

    /// Attribution strategy (overrides configuration)
    #[arg(short, long)]
    strategy: Option<AttributionStrategy>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Abort on the first record that cannot be attributed
    #[arg(long)]
    fail_fast: bool,

    /// Grade raw scores against the configured pass thresholds
    #[arg(long)]
    grade: bool,
}

#[derive(Args)]
struct ExplainArgs {
    /// Required by the weighted strategy
    #[arg(long)]
    context_recall: Option<f64>,

    /// Required by the weighted strategy
    #[arg(long)]
    context_precision: Option<f64>,

    #[arg(long)]
    context_entities_recall: f64,

    #[arg(long)]
    answer_relevancy: f64,

    #[arg(long)]
    faithfulness: f64,

    /// Required by the threshold strategy
    #[arg(long)]
    noise_sensitivity: Option<f64>,

    /// Attribution strategy (overrides configuration)
    #[arg(short, long)]
    strategy: Option<AttributionStrategy>,

    /// Print the attribution as JSON
    #[arg(long)]
    json: bool,
}

impl ExplainArgs {
    fn record(&self) -> MetricRecord {
        MetricRecord {
            context_recall: self.context_recall,
            context_precision: self.context_precision,
            context_entities_recall: self.context_entities_recall,
            answer_relevancy: self.answer_relevancy,
            faithfulness: self.faithfulness,
            noise_sensitivity: self.noise_sensitivity,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    let config = TriageConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Classify(args) => {
            let rendered = classify(config, &args)?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, rendered)
                        .with_context(|| format!("Failed to write report to {:?}", path))?;
                    info!("Wrote report to {:?}", path);
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Explain(args) => {
            print!("{}", explain(config, &args)?);
        }
        Commands::Strategies => {
            for (strategy, metadata) in list_strategies() {
                println!("{} - {} v{}", strategy, metadata.name, metadata.version);
                println!("  {}", metadata.description);
                let fields: Vec<&str> = metadata
                    .required_fields
                    .iter()
                    .map(|f| f.as_str())
                    .collect();
                println!("  Requires: {}", fields.join(", "));
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn classify(mut config: TriageConfig, args: &ClassifyArgs) -> Result<String> {
    if let Some(strategy) = args.strategy {
        config.attribution.strategy = strategy;
    }
    if args.fail_fast {
        config.batch.fail_fast = true;
    }
    config.validate()?;

    let attributor: Box<dyn Attributor> = config
        .attribution
        .build()
        .context("Failed to build attributor")?;

    let source = open_source(&args.input, args.input_format)
        .with_context(|| format!("Failed to open {:?}", args.input))?;
    let rows = source
        .load()
        .with_context(|| format!("Failed to load metrics from {}", source.name()))?;
    info!(
        source = source.name(),
        rows = rows.len(),
        strategy = attributor.id(),
        "Loaded metric rows"
    );

    let grades = args.grade.then(|| grade_rows(&config.grading, &rows));
    let report = evaluate_rows(attributor.as_ref(), rows, &config.batch)?;

    render_report(&report, grades.as_deref(), args.format)
}

/// Rows that cannot form a record get no grades; the report already lists them as failed
fn grade_rows(standard: &GradingStandard, rows: &[MetricRow]) -> Vec<Vec<MetricGrade>> {
    rows.iter()
        .map(|row| {
            row.clone()
                .into_record(&[])
                .map(|record| standard.grade(&record))
                .unwrap_or_default()
        })
        .collect()
}

fn explain(mut config: TriageConfig, args: &ExplainArgs) -> Result<String> {
    if let Some(strategy) = args.strategy {
        config.attribution.strategy = strategy;
    }
    config.validate()?;

    let attributor: Box<dyn Attributor> = config
        .attribution
        .build()
        .context("Failed to build attributor")?;
    let attribution = attributor
        .attribute(&args.record())
        .context("Attribution failed")?;

    if args.json {
        Ok(format!("{}\n", serde_json::to_string_pretty(&attribution)?))
    } else {
        Ok(render_attribution(&attribution))
    }
}
