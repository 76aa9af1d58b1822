use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use pcbkit::{
    clearing_passes, cutout_passes, drill_passes, init_logging, isolation_passes, Config,
    FixedPointEngine, FusionStats, OffsetPass, Pipeline, Primitive, Scaler, ToolpathPlan,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    Isolation,
    Clearing,
    Cutout,
    Drill,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Layer primitives as a JSON array
    #[arg(value_name = "PRIMITIVES")]
    input: PathBuf,

    /// Configuration file (JSON or TOML); defaults to the user config if present
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Operation to plan on the fused layer
    #[arg(short = 'O', long, value_enum, default_value = "isolation")]
    operation: Operation,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[derive(Serialize)]
struct Report {
    run_id: String,
    fused: bool,
    message: Option<String>,
    stats: Option<FusionStats>,
    passes: Vec<OffsetPass>,
    plans: Vec<ToolpathPlan>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config: {:?}", path)),
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)
                .with_context(|| format!("Failed to load config: {:?}", path)),
            None => Ok(Config::default()),
        },
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;
    info!(version = pcbkit::VERSION, built = pcbkit::BUILD_DATE, "PCBKit starting");

    let config = load_config(&cli)?;
    let content = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read input file: {:?}", cli.input))?;
    let primitives: Vec<Primitive> =
        serde_json::from_str(&content).with_context(|| "Failed to parse primitives")?;

    let result = Pipeline::run(&primitives, &config.pipeline_options());
    if let Some(message) = &result.message {
        eprintln!("{}", message);
    }

    let passes = match cli.operation {
        Operation::Isolation => {
            if !result.fused {
                bail!("Isolation needs fused geometry");
            }
            isolation_passes(
                &result.primitives,
                &config.isolation,
                &FixedPointEngine::new(),
                &Scaler::default(),
            )?
        }
        Operation::Clearing => clearing_passes(
            &result.primitives,
            &config.clearing,
            &FixedPointEngine::new(),
            &Scaler::default(),
        )?,
        Operation::Cutout => cutout_passes(&result.primitives, &config.cutout)?,
        Operation::Drill => drill_passes(&primitives, &config.drill)?,
    };
    let plans = config.machine.plan_all(&passes);
    info!(
        passes = passes.len(),
        commands = plans.iter().map(|p| p.commands.len()).sum::<usize>(),
        "Toolpaths planned"
    );

    let report = Report {
        run_id: result.run_id.to_string(),
        fused: result.fused,
        message: result.message.clone(),
        stats: result.stats.clone(),
        passes,
        plans,
    };
    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?,
        None => println!("{}", json),
    }

    Ok(())
}
