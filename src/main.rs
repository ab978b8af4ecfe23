use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;

use uav_relay_planner::domain::planner::config::PlannerConfig;
use uav_relay_planner::domain::planner::observer::{LogObserver, PlanObserver};
use uav_relay_planner::loader::parser::load_config;
use uav_relay_planner::loader::writer::{OutputFormat, output_path, write_schedule};
use uav_relay_planner::{logger, plan_from_file};

/// Plans relay transmissions for every topology in a file or directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Topology file (text or .json) or a directory of them.
    input: PathBuf,

    /// Directory the `<stem>_result.<ext>` files are written to.
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Planner configuration as JSON. Missing fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Skip the rebalancing pass after the plan is built.
    #[arg(long)]
    no_optimize: bool,

    /// Dump the optimizer's efficiency tables at trace level.
    #[arg(long)]
    dump_tables: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init();

    let mut config = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("Failed to load planner config '{}'", path.display()))?,
        None => PlannerConfig::default(),
    };
    if args.no_optimize {
        config.optimizer.enabled = false;
    }

    let observer: Arc<dyn PlanObserver> = Arc::new(LogObserver { dump_tables: args.dump_tables });

    let inputs = collect_inputs(&args.input)?;
    log::info!("Planning {} input file(s) from '{}'", inputs.len(), args.input.display());

    let mut failed = 0;
    for input in &inputs {
        if let Err(e) = run_one(input, &args, &config, observer.clone()) {
            log::error!("{:#}", e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} input file(s) could not be planned", failed, inputs.len());
    }
    Ok(())
}

fn run_one(input: &Path, args: &Args, config: &PlannerConfig, observer: Arc<dyn PlanObserver>) -> anyhow::Result<()> {
    let (network, outcome) = plan_from_file(input, config.clone(), observer).with_context(|| format!("Failed to plan '{}'", input.display()))?;

    let target = output_path(input, &args.output, args.format);
    write_schedule(&network, &outcome, &target, args.format).with_context(|| format!("Failed to write result '{}'", target.display()))?;

    log::info!("Result saved to '{}'", target.display());
    Ok(())
}

/// The input itself if it is a file, otherwise the regular files of the directory in name order.
fn collect_inputs(input: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("Input '{}' is neither a file nor a directory", input.display());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input).with_context(|| format!("Failed to read input directory '{}'", input.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
