//! SIRD grid CLI.
//!
//! Runs a grid scenario and writes every cell's state after every step.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sird_cell_core_rs::orchestrator::StateSnapshot;
use sird_cell_core_rs::{Orchestrator, ScenarioConfig};

#[derive(Parser)]
#[command(name = "sird-cell")]
#[command(about = "Cellular SIRD epidemic simulation on a grid")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario and write the state log.
    Run {
        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,
        /// Number of steps to simulate
        #[arg(short = 'n', long, default_value = "100")]
        steps: usize,
        /// Override the scenario's random seed
        #[arg(long)]
        seed: Option<u64>,
        /// State log file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Resume from a checkpoint written by an earlier run
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Write a checkpoint after the last step
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Load and validate a scenario without running it.
    Validate {
        /// Scenario file (JSON)
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    ScenarioConfig::from_json(&json).with_context(|| format!("Invalid scenario {}", path.display()))
}

/// One `time,cell_id,<state>` line per cell
fn write_states(out: &mut impl Write, orchestrator: &Orchestrator) -> Result<()> {
    let time = orchestrator.current_time();
    for id in orchestrator.cell_ids() {
        writeln!(out, "{},{},{}", time, id, orchestrator.state_of(id)?)?;
    }
    Ok(())
}

fn run(
    scenario: &Path,
    steps: usize,
    seed: Option<u64>,
    output: Option<PathBuf>,
    resume: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
) -> Result<()> {
    let mut scenario = load_scenario(scenario)?;
    if let Some(seed) = seed {
        scenario.rng_seed = seed;
    }

    let mut orchestrator = match resume {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read checkpoint {}", path.display()))?;
            let snapshot = StateSnapshot::from_json(&json)?;
            Orchestrator::load_state(scenario, snapshot)
                .with_context(|| format!("Cannot resume from {}", path.display()))?
        }
        None => Orchestrator::new(scenario)?,
    };

    let mut out: BufWriter<Box<dyn Write>> = match &output {
        Some(path) => BufWriter::new(Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => BufWriter::new(Box::new(io::stdout().lock())),
    };

    info!(cells = orchestrator.num_cells(), steps, "starting run");
    write_states(&mut out, &orchestrator)?;
    for _ in 0..steps {
        orchestrator.tick()?;
        write_states(&mut out, &orchestrator)?;
    }
    out.flush()?;

    let totals = orchestrator.totals();
    info!(
        time = orchestrator.current_time(),
        susceptible = totals.susceptible,
        infected = totals.infected,
        recovered = totals.recovered,
        deceased = totals.deceased,
        "run complete"
    );

    if let Some(path) = checkpoint {
        let json = orchestrator.save_state().to_json()?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;
        info!(path = %path.display(), "checkpoint written");
    }
    Ok(())
}

fn validate(scenario: &Path) -> Result<()> {
    let config = load_scenario(scenario)?;
    let [rows, cols] = config.shape;
    let segments = config.default_config.n_segments();
    let overrides = config.cells.len();
    let lockdown = config.default_config.lockdown.name();

    let orchestrator = Orchestrator::new(config)?;
    let totals = orchestrator.totals();

    println!("Scenario OK: {}", scenario.display());
    println!("Grid: {}x{} ({} cells)", rows, cols, orchestrator.num_cells());
    println!("Age segments: {}", segments);
    println!("Cell overrides: {}", overrides);
    println!("Default lockdown: {}", lockdown);
    println!("Population: {}", totals.population);
    println!("Initial infected ratio: {:.4}", totals.infected);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the state log can be piped
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            steps,
            seed,
            output,
            resume,
            checkpoint,
        } => run(&scenario, steps, seed, output, resume, checkpoint),
        Commands::Validate { scenario } => validate(&scenario),
    }
}
