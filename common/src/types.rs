use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StrategyParameters;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Why a position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Crossover,
    EndOfData,
}

/// Trading signal produced by the crossover rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Buy,
    Close,
    Hold,
}

/// Open long position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_bar: usize,
    pub current_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

/// Closed trade. Dates are resolved from the bar indices when reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn holding_bars(&self) -> usize {
        self.exit_bar - self.entry_bar
    }
}

/// Performance metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    // Returns
    pub total_return: f64,
    pub total_return_pct: f64,
    // Risk metrics
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    // Trade statistics
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub exposure_pct: f64,
}

/// Outcome of one simulation over one price series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub params: StrategyParameters,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<(DateTime<Utc>, f64)>,
    pub trades: Vec<Trade>,
    pub initial_capital: f64,
    pub final_equity: f64,
}

/// One row of the aggregated output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub name: String,
    #[serde(rename = "entry datetime")]
    pub entry_datetime: String,
    #[serde(rename = "entry price")]
    pub entry_price: f64,
    #[serde(rename = "exit datetime")]
    pub exit_datetime: String,
    #[serde(rename = "exit price")]
    pub exit_price: f64,
    pub quantity: f64,
    #[serde(rename = "profit/loss value")]
    pub pnl: f64,
}
