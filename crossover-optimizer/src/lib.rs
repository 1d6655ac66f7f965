pub mod batch;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod optimizer;
pub mod portfolio;
pub mod report;
pub mod signals;

pub use batch::{BatchRunner, BatchSummary, FileOutcome};
pub use data::{discover_csv_files, extract_archive, load_csv};
pub use engine::BacktestEngine;
pub use metrics::MetricsCalculator;
pub use optimizer::{OptimizationOutcome, Optimizer};
pub use portfolio::Portfolio;
pub use report::{format_trades, write_trade_rows, ResultFilter};
pub use signals::SignalGenerator;

// Re-export common types
pub use common::{
    BacktestError, BacktestResult, BacktestSettings, Bar, BatchConfig, ExitReason,
    OptimizerSettings, ParameterGrid, PerformanceMetrics, Position, Result, SignalType,
    StrategyParameters, Trade, TradeRow, TrialBudgetPolicy,
};
