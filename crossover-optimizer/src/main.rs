use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crossover_optimizer::logging::init_logging;
use crossover_optimizer::{BatchConfig, BatchRunner, TrialBudgetPolicy};

#[derive(Parser, Debug)]
#[command(name = "crossover-optimizer")]
#[command(version = "0.1.0")]
#[command(
    about = "Batch-optimize a dual moving-average crossover strategy over CSV files in a ZIP archive",
    long_about = None
)]
struct Args {
    /// JSON config file; CLI flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ZIP archive containing the price CSV files
    #[arg(short, long)]
    archive: Option<PathBuf>,

    /// Combined trade CSV to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory the archive is extracted into
    #[arg(long)]
    extract_dir: Option<PathBuf>,

    /// Fast moving-average windows, comma separated
    #[arg(long, value_delimiter = ',')]
    fast_windows: Option<Vec<usize>>,

    /// Slow moving-average windows, comma separated
    #[arg(long, value_delimiter = ',')]
    slow_windows: Option<Vec<usize>>,

    /// Stop-loss fractions (0.02 = 2%), comma separated
    #[arg(long, value_delimiter = ',')]
    stop_losses: Option<Vec<f64>>,

    /// Take-profit fractions (0.05 = 5%), comma separated
    #[arg(long, value_delimiter = ',')]
    take_profits: Option<Vec<f64>>,

    /// Keep files whose best Sharpe ratio is strictly above this
    #[arg(long)]
    sharpe_threshold: Option<f64>,

    /// Maximum simulated combinations per file (0 = whole grid)
    #[arg(long)]
    max_trials: Option<usize>,

    /// Let combinations with fast >= slow use up trial slots
    #[arg(long)]
    count_infeasible: bool,

    /// Seed for sampling the grid when it exceeds the trial budget
    #[arg(long)]
    seed: Option<u64>,

    /// Starting cash per backtest
    #[arg(long)]
    cash: Option<f64>,

    /// Commission rate per side (0.001 = 0.1%)
    #[arg(long)]
    commission: Option<f64>,

    /// Process files in filesystem walk order instead of sorted order
    #[arg(long)]
    no_sort: bool,

    /// Log level for this crate (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<BatchConfig> {
        let mut config = match &self.config {
            Some(path) => BatchConfig::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => BatchConfig::default(),
        };

        if let Some(archive) = self.archive {
            config.archive_path = archive;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(dir) = self.extract_dir {
            config.extract_dir = dir;
        }
        if let Some(v) = self.fast_windows {
            config.grid.fast_windows = v;
        }
        if let Some(v) = self.slow_windows {
            config.grid.slow_windows = v;
        }
        if let Some(v) = self.stop_losses {
            config.grid.stop_loss_pcts = v;
        }
        if let Some(v) = self.take_profits {
            config.grid.take_profit_pcts = v;
        }
        if let Some(t) = self.sharpe_threshold {
            config.optimizer.sharpe_threshold = t;
        }
        if let Some(n) = self.max_trials {
            config.optimizer.max_trials = n;
        }
        if self.count_infeasible {
            config.optimizer.budget_policy = TrialBudgetPolicy::CountInfeasible;
        }
        if let Some(seed) = self.seed {
            config.optimizer.seed = seed;
        }
        if let Some(cash) = self.cash {
            config.backtest.starting_cash = cash;
        }
        if let Some(rate) = self.commission {
            config.backtest.commission_rate = rate;
        }
        if self.no_sort {
            config.sort_files = false;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = args.into_config()?;
    let runner = BatchRunner::new(config).context("invalid configuration")?;
    let summary = runner.run().context("batch run failed")?;

    tracing::info!(
        processed = summary.files_processed,
        accepted = summary.accepted,
        rejected = summary.rejected,
        failed = summary.failed,
        "batch complete"
    );

    Ok(())
}
