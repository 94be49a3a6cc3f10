use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use notch_app::{SweepConfig, default_taus, run_sweep};
use notch_core::DecayDelay;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "notch-delta",
    version,
    about = "Sweep Notch-Delta lateral inhibition across deactivation delays"
)]
struct Cli {
    /// Grid rows.
    #[arg(long, env = "NOTCH_ROWS", default_value_t = 100)]
    rows: usize,

    /// Grid columns.
    #[arg(long, env = "NOTCH_COLUMNS", default_value_t = 100)]
    columns: usize,

    /// Ticks applied to each colony before rendering.
    #[arg(long, env = "NOTCH_GENERATIONS", default_value_t = 1_000)]
    generations: usize,

    /// Notch level at which a cell commits.
    #[arg(long, env = "NOTCH_THRESHOLD", default_value_t = 0.5)]
    threshold: f64,

    /// Deactivation delay to sweep (number or `inf`); repeatable. Defaults to 0..=19 and inf.
    #[arg(long = "tau", value_name = "TAU")]
    taus: Vec<DecayDelay>,

    /// Directory receiving one `colony_<tau>.png` per run.
    #[arg(long, env = "NOTCH_OUTPUT_DIR", default_value = "figs")]
    output_dir: PathBuf,

    /// Pixels per cell edge; values above 1 enlarge the image.
    #[arg(long, env = "NOTCH_SCALE", default_value_t = 1)]
    scale: u32,

    /// RNG seed shared by every run.
    #[arg(long, env = "NOTCH_SEED")]
    seed: Option<u64>,

    /// Optional path for a JSON summary of the sweep.
    #[arg(long, env = "NOTCH_REPORT")]
    report: Option<PathBuf>,
}

impl Cli {
    fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            rows: self.rows,
            columns: self.columns,
            generations: self.generations,
            notch_threshold: self.threshold,
            taus: if self.taus.is_empty() {
                default_taus()
            } else {
                self.taus.clone()
            },
            output_dir: self.output_dir.clone(),
            scale: self.scale,
            rng_seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.sweep_config();
    info!(
        rows = config.rows,
        columns = config.columns,
        generations = config.generations,
        runs = config.taus.len(),
        output_dir = %config.output_dir.display(),
        "Starting decay-delay sweep",
    );

    let report = run_sweep(&config)?;
    if let Some(path) = &cli.report {
        report.write_json(path)?;
        info!(path = %path.display(), "Wrote sweep report");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
