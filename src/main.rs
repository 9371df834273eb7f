// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use taskmesh::metrics::analyzer::{self, AnalysisReport};
use taskmesh::metrics::{CsvSink, LineSink, MemorySink, TracingSink};
use taskmesh::mobility::MobilityKind;
use taskmesh::simulation::{PoolScope, SimConfig, Simulation};
use taskmesh::time::SimTime;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

/// Overrides applied on top of the defaults or a `--config` file.
#[derive(Args, Clone)]
struct ScenarioArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Simulated seconds.
    #[arg(short, long)]
    duration: Option<f64>,
    #[arg(short, long)]
    workers: Option<u32>,
    #[arg(short, long)]
    publishers: Option<u32>,
    #[arg(short, long)]
    radius: Option<f64>,
    #[arg(long, value_enum)]
    pool: Option<PoolArg>,
    #[arg(long, value_enum)]
    mobility: Option<MobilityArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PoolArg {
    All,
    Workers,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum MobilityArg {
    Levy,
    Stationary,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
        /// Also write one CSV file per record kind.
        #[arg(long)]
        csv: bool,
    },

    Sweep {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(short = 'n', long, default_value_t = 8)]
        seeds: u64,
        #[arg(long, default_value_t = 1)]
        first_seed: u64,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    Analyze {
        #[arg(default_value = "results")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { scenario, seed, output, csv } => {
            let mut config = build_config(&scenario)?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            run_single(config, &output, csv, cli.verbose)?;
        }

        Commands::Sweep {
            scenario,
            seeds,
            first_seed,
            output,
        } => {
            let config = build_config(&scenario)?;
            sweep(config, first_seed, seeds, &output)?;
        }

        Commands::Analyze { path } => {
            info!("Analyzing results in: {}", path.display());
            let reports = analyzer::load_reports(&path)?;
            if reports.is_empty() {
                info!("No analysis files found.");
            } else {
                analyzer::comparison_table(&reports);
            }
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());
    Ok(())
}

fn build_config(args: &ScenarioArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    if let Some(secs) = args.duration {
        config.horizon = SimTime::from_secs_f64(secs);
    }
    if let Some(workers) = args.workers {
        config.num_workers = workers;
    }
    if let Some(publishers) = args.publishers {
        config.num_publishers = publishers;
    }
    if let Some(radius) = args.radius {
        config.radius = radius;
    }
    if let Some(pool) = args.pool {
        config.pool = match pool {
            PoolArg::All => PoolScope::All,
            PoolArg::Workers => PoolScope::Workers,
        };
    }
    if let Some(mobility) = args.mobility {
        config.mobility.kind = match mobility {
            MobilityArg::Levy => MobilityKind::Levy,
            MobilityArg::Stationary => MobilityKind::Stationary,
        };
    }

    config.validate()?;
    Ok(config)
}

fn run_single(mut config: SimConfig, output: &Path, csv: bool, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    config.name = format!("{}_s{}_{}", config.name, config.seed, timestamp);

    info!("taskmesh: Single Run");
    info!("Seed: {}, horizon: {}", config.seed, config.horizon);

    let memory = MemorySink::new();
    let log_path = output.join(format!("{}.log", config.name));
    let mut sim = Simulation::new(config.clone())?
        .with_sink(memory.clone())
        .with_sink(LineSink::create(&log_path)?);
    if csv {
        sim.add_sink(Box::new(CsvSink::create(output, &config.name)?));
    }
    if verbose {
        sim.add_sink(Box::new(TracingSink));
    }

    let horizon_secs = config.horizon.as_secs_f64().ceil() as u64;
    let pb = ProgressBar::new(horizon_secs);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len}s {msg}")?
            .progress_chars("█▓░"),
    );

    for second in 1..=horizon_secs {
        sim.run_until(SimTime::from_secs(second))?;
        pb.inc(1);
        let snapshot = sim.metrics.snapshot(sim.now(), sim.queued_tasks());
        pb.set_message(format!(
            "Matched: {} | Queued: {}",
            snapshot.matched, snapshot.queued_tasks
        ));
    }
    sim.finish()?;
    pb.finish_with_message("Simulation complete");

    info!("Event log saved to: {}", log_path.display());

    let report = analyzer::analyze(&config.name, &memory.records(), &sim.metrics.get_snapshots());
    let json_path = output.join(format!("{}_analysis.json", config.name));
    analyzer::save_report(&report, &json_path)?;
    info!("Analysis saved to: {}", json_path.display());

    info!("Matched: {}/{} tasks", report.tasks_matched, report.tasks_total);
    info!("Avg wait: {:.2}s", report.avg_wait_s);
    info!("Avg group size: {:.2}", report.avg_group_size);

    Ok(())
}

fn run_quiet(config: SimConfig) -> Result<AnalysisReport> {
    let memory = MemorySink::new();
    let mut sim = Simulation::new(config.clone())?.with_sink(memory.clone());
    sim.run()?;
    Ok(analyzer::analyze(
        &config.name,
        &memory.records(),
        &sim.metrics.get_snapshots(),
    ))
}

fn sweep(base: SimConfig, first_seed: u64, seeds: u64, output: &Path) -> Result<()> {
    info!("taskmesh: Sweep");
    info!("Seeds: {}..{}", first_seed, first_seed + seeds);

    let started = Instant::now();
    let mut reports = (first_seed..first_seed + seeds)
        .into_par_iter()
        .map(|seed| {
            let config = base
                .clone()
                .with_seed(seed)
                .with_name(format!("seed_{}", seed));
            run_quiet(config)
        })
        .collect::<Result<Vec<_>>>()?;
    info!("{} runs finished in {:.2}s", reports.len(), started.elapsed().as_secs_f64());

    let avg = analyzer::average_reports("average", &reports);
    reports.push(avg);
    analyzer::comparison_table(&reports);

    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = output.join(format!("sweep_{}.json", timestamp));
    std::fs::write(&path, serde_json::to_string_pretty(&reports)?)?;
    info!("Sweep saved to: {}", path.display());

    Ok(())
}
