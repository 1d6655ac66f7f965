use std::fs;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};

/// Parameters of a single dual moving-average crossover run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    pub fast_window: usize,
    pub slow_window: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for StrategyParameters {
    fn default() -> Self {
        Self {
            fast_window: 10,
            slow_window: 50,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
        }
    }
}

impl StrategyParameters {
    pub fn with_windows(mut self, fast: usize, slow: usize) -> Self {
        self.fast_window = fast;
        self.slow_window = slow;
        self
    }

    pub fn with_stop_loss(mut self, stop_loss_pct: f64) -> Self {
        self.stop_loss_pct = stop_loss_pct;
        self
    }

    pub fn with_take_profit(mut self, take_profit_pct: f64) -> Self {
        self.take_profit_pct = take_profit_pct;
        self
    }

    /// Fast window must be strictly shorter than the slow one
    pub fn is_feasible(&self) -> bool {
        self.fast_window < self.slow_window
    }

    /// Number of bars both averages need before they are defined
    pub fn warmup(&self) -> usize {
        self.fast_window.max(self.slow_window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fast_window == 0 {
            return Err(BacktestError::InvalidParameter(
                "fast_window must be positive".to_string(),
            ));
        }
        if !self.is_feasible() {
            return Err(BacktestError::InvalidParameter(format!(
                "fast_window ({}) must be less than slow_window ({})",
                self.fast_window, self.slow_window
            )));
        }
        for (name, pct) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
        ] {
            if !(pct > 0.0 && pct < 1.0) {
                return Err(BacktestError::InvalidParameter(format!(
                    "{name} must be in (0, 1), got {pct}"
                )));
            }
        }
        Ok(())
    }
}

/// Discrete values searched by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub fast_windows: Vec<usize>,
    pub slow_windows: Vec<usize>,
    pub stop_loss_pcts: Vec<f64>,
    pub take_profit_pcts: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            fast_windows: (5..30).step_by(5).collect(),
            slow_windows: (20..100).step_by(10).collect(),
            stop_loss_pcts: vec![0.01, 0.02, 0.03],
            take_profit_pcts: vec![0.03, 0.05, 0.07],
        }
    }
}

impl ParameterGrid {
    pub fn total_combinations(&self) -> usize {
        self.fast_windows.len()
            * self.slow_windows.len()
            * self.stop_loss_pcts.len()
            * self.take_profit_pcts.len()
    }

    /// Every combination, feasible or not, in fast/slow/stop/take order
    pub fn combinations(&self) -> Vec<StrategyParameters> {
        let mut combos = Vec::with_capacity(self.total_combinations());

        for &fast_window in &self.fast_windows {
            for &slow_window in &self.slow_windows {
                for &stop_loss_pct in &self.stop_loss_pcts {
                    for &take_profit_pct in &self.take_profit_pcts {
                        combos.push(StrategyParameters {
                            fast_window,
                            slow_window,
                            stop_loss_pct,
                            take_profit_pct,
                        });
                    }
                }
            }
        }

        combos
    }

    pub fn feasible_combinations(&self) -> Vec<StrategyParameters> {
        self.combinations()
            .into_iter()
            .filter(StrategyParameters::is_feasible)
            .collect()
    }
}

/// Whether combinations rejected by the fast < slow constraint use up trial slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialBudgetPolicy {
    /// Drop infeasible combinations before sampling the budget
    #[default]
    SkipInfeasible,
    /// Sample the budget from the whole grid, then drop infeasible ones
    CountInfeasible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Files are kept only when the best Sharpe ratio is strictly above this
    pub sharpe_threshold: f64,
    /// Upper bound on simulated combinations per file, 0 = unlimited
    pub max_trials: usize,
    pub budget_policy: TrialBudgetPolicy,
    /// Seed for sampling when the grid exceeds the budget
    pub seed: u64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            sharpe_threshold: 1.0,
            max_trials: 50,
            budget_policy: TrialBudgetPolicy::SkipInfeasible,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub starting_cash: f64,
    /// Fraction of traded value charged on entry and on exit
    pub commission_rate: f64,
    /// Annual risk-free rate used by the Sharpe and Sortino ratios
    pub risk_free_rate: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            starting_cash: 100_000.0,
            commission_rate: 0.001,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestSettings {
    pub fn with_cash(mut self, cash: f64) -> Self {
        self.starting_cash = cash;
        self
    }

    pub fn with_commission(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }
}

/// Everything a batch run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub archive_path: PathBuf,
    pub output_path: PathBuf,
    pub extract_dir: PathBuf,
    /// Process discovered files in lexicographic path order
    pub sort_files: bool,
    /// chrono format used for the entry/exit columns
    pub date_format: String,
    pub grid: ParameterGrid,
    pub optimizer: OptimizerSettings,
    pub backtest: BacktestSettings,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            archive_path: PathBuf::from("prices.zip"),
            output_path: PathBuf::from("optimized_trade_results.csv"),
            extract_dir: PathBuf::from("extracted_files"),
            sort_files: true,
            date_format: "%d %b %y".to_string(),
            grid: ParameterGrid::default(),
            optimizer: OptimizerSettings::default(),
            backtest: BacktestSettings::default(),
        }
    }
}

impl BatchConfig {
    /// Load a JSON config file; omitted fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: BatchConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.backtest.starting_cash <= 0.0 {
            return Err(BacktestError::InvalidParameter(
                "starting_cash must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.backtest.commission_rate) {
            return Err(BacktestError::InvalidParameter(format!(
                "commission_rate must be in [0, 1), got {}",
                self.backtest.commission_rate
            )));
        }
        if self.grid.total_combinations() == 0 {
            return Err(BacktestError::InvalidParameter(
                "parameter grid has an empty axis".to_string(),
            ));
        }
        if self.grid.fast_windows.contains(&0) || self.grid.slow_windows.contains(&0) {
            return Err(BacktestError::InvalidParameter(
                "window lengths must be positive".to_string(),
            ));
        }
        for (name, pcts) in [
            ("stop_loss_pcts", &self.grid.stop_loss_pcts),
            ("take_profit_pcts", &self.grid.take_profit_pcts),
        ] {
            if let Some(pct) = pcts.iter().find(|&&p| !(p > 0.0 && p < 1.0)) {
                return Err(BacktestError::InvalidParameter(format!(
                    "{name} values must be in (0, 1), got {pct}"
                )));
            }
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(BacktestError::InvalidParameter(format!(
                "invalid date_format '{}'",
                self.date_format
            )));
        }
        Ok(())
    }
}
