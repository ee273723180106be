//! Plays one level headlessly with a synthetic participant and writes the
//! results bundle.
//!
//! `doggo-sim [--config PATH] [--participant PATH] [--seed N] [--out PATH]`

use anyhow::{Context, Result};
use clap::Parser;
use doggo_experiment::{run_level, GameConfig, SimulatedParticipant};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "doggo-sim")]
#[command(about = "Play one Doggo/Nogo level with a synthetic participant", long_about = None)]
struct Cli {
    /// Game configuration JSON (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Synthetic participant JSON
    #[arg(long)]
    participant: Option<PathBuf>,

    /// Seed for the scheduler and the participant
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output path for the results bundle
    #[arg(long, default_value = "doggo_sim_results.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    let participant: SimulatedParticipant = match &args.participant {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulatedParticipant::default(),
    };

    let report = run_level(config.clone(), &participant, args.seed);
    let results = report.into_results(&config);

    let file = File::create(&args.out).with_context(|| format!("creating {}", args.out.display()))?;
    results.write_json(BufWriter::new(file))?;

    tracing::info!(
        seed = args.seed,
        score = results.report.score,
        trials = results.report.trials_count,
        phase = results.report.phase.index(),
        median_rt_ms = results.report.median_rt_ms,
        mean_rt_ms = ?results.summary.mean_rt_ms,
        error_rate = results.summary.error_rate,
        z_score = ?results.summary.z_score,
        quantile = ?results.summary.quantile,
        path = %args.out.display(),
        "simulation complete"
    );
    Ok(())
}
