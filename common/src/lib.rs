pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BacktestSettings, BatchConfig, OptimizerSettings, ParameterGrid, StrategyParameters,
    TrialBudgetPolicy,
};
pub use error::{BacktestError, Result};
pub use types::*;
