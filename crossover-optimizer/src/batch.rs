//! Archive → per-file optimization → filter → one combined CSV.

use std::path::{Path, PathBuf};

use common::{BatchConfig, Result, TradeRow};
use tracing::{error, info};

use crate::data::{discover_csv_files, extract_archive, load_csv};
use crate::optimizer::Optimizer;
use crate::report::{format_trades, write_trade_rows, ResultFilter};

/// What happened to a file that made it through the pipeline
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Accepted {
        name: String,
        sharpe_ratio: f64,
        rows: Vec<TradeRow>,
    },
    Rejected {
        name: String,
        sharpe_ratio: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub rows_written: usize,
    pub output_path: Option<PathBuf>,
}

pub struct BatchRunner {
    config: BatchConfig,
    optimizer: Optimizer,
    filter: ResultFilter,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;
        let optimizer = Optimizer::new(
            config.grid.clone(),
            config.optimizer.clone(),
            config.backtest.clone(),
        );
        let filter = ResultFilter::new(config.optimizer.sharpe_threshold);
        Ok(Self {
            config,
            optimizer,
            filter,
        })
    }

    /// Extract, process every CSV, then write the combined table if non-empty.
    /// Only archive and output failures are returned as errors.
    pub fn run(&self) -> Result<BatchSummary> {
        extract_archive(&self.config.archive_path, &self.config.extract_dir)?;
        info!(archive = %self.config.archive_path.display(), "ZIP file extracted successfully");

        let files = discover_csv_files(&self.config.extract_dir, self.config.sort_files)?;
        let mut summary = BatchSummary::default();
        let mut all_rows: Vec<TradeRow> = Vec::new();

        for path in &files {
            let file = display_name(path);
            info!(file = %file, "Processing file");
            summary.files_processed += 1;

            match self.process_file(path) {
                Ok(FileOutcome::Accepted {
                    name,
                    sharpe_ratio,
                    rows,
                }) => {
                    info!(file = %name, sharpe = %format!("{sharpe_ratio:.2}"), trades = rows.len(), "accepted");
                    summary.accepted += 1;
                    all_rows.extend(rows);
                }
                Ok(FileOutcome::Rejected { name, sharpe_ratio }) => {
                    info!(
                        file = %name,
                        sharpe = %format!("{sharpe_ratio:.2}"),
                        threshold = self.filter.threshold(),
                        "below threshold, skipping"
                    );
                    summary.rejected += 1;
                }
                Err(e) => {
                    error!(file = %file, error = %e, "Error processing file");
                    summary.failed += 1;
                }
            }
        }

        if all_rows.is_empty() {
            info!(
                threshold = self.filter.threshold(),
                "No files produced a Sharpe ratio above the threshold. No results saved."
            );
        } else {
            write_trade_rows(&self.config.output_path, &all_rows)?;
            info!(output = %self.config.output_path.display(), rows = all_rows.len(), "Optimized trade results saved");
            summary.rows_written = all_rows.len();
            summary.output_path = Some(self.config.output_path.clone());
        }

        Ok(summary)
    }

    /// Load, optimize, filter and format a single file
    pub fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        let name = file_stem(path);
        let bars = load_csv(path)?;
        let outcome = self.optimizer.optimize(&bars)?;
        let sharpe_ratio = outcome.best.metrics.sharpe_ratio;

        if !self.filter.accepts(sharpe_ratio) {
            return Ok(FileOutcome::Rejected { name, sharpe_ratio });
        }

        let rows = format_trades(&name, &outcome.best, &bars, &self.config.date_format)?;
        Ok(FileOutcome::Accepted {
            name,
            sharpe_ratio,
            rows,
        })
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{bars_to_csv, generate_noise_bars, generate_trending_bars};

    fn runner_in(dir: &Path) -> BatchRunner {
        let mut config = BatchConfig {
            extract_dir: dir.to_path_buf(),
            ..Default::default()
        };
        config.optimizer.max_trials = 0;
        BatchRunner::new(config).unwrap()
    }

    #[test]
    fn test_process_file_accepts_uptrend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TREND.csv");
        std::fs::write(&path, bars_to_csv(&generate_trending_bars(200, 100.0))).unwrap();

        match runner_in(dir.path()).process_file(&path).unwrap() {
            FileOutcome::Accepted {
                name,
                sharpe_ratio,
                rows,
            } => {
                assert_eq!(name, "TREND");
                assert!(sharpe_ratio > 1.0);
                assert!(!rows.is_empty());
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }

    #[test]
    fn test_process_file_rejects_noise() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.csv");
        std::fs::write(&path, bars_to_csv(&generate_noise_bars(200, 7))).unwrap();

        let outcome = runner_in(dir.path()).process_file(&path).unwrap();
        assert!(matches!(outcome, FileOutcome::Rejected { ref name, .. } if name == "noise"));
    }

    #[test]
    fn test_process_file_reports_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Open,Close\n1,2\n").unwrap();

        assert!(runner_in(dir.path()).process_file(&path).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BatchConfig::default();
        config.backtest.starting_cash = 0.0;
        assert!(BatchRunner::new(config).is_err());
    }

    #[test]
    fn test_bad_grid_rejected_before_any_file() {
        let mut config = BatchConfig::default();
        config.grid.stop_loss_pcts = vec![0.0];
        assert!(matches!(
            BatchRunner::new(config),
            Err(common::BacktestError::InvalidParameter(_))
        ));
    }
}
