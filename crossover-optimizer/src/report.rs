use std::path::Path;

use common::{BacktestError, BacktestResult, Bar, Result, TradeRow};
use tracing::debug;

/// Keeps a file only when its best Sharpe ratio is strictly above the threshold
#[derive(Debug, Clone, Copy)]
pub struct ResultFilter {
    threshold: f64,
}

impl ResultFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn accepts(&self, sharpe_ratio: f64) -> bool {
        sharpe_ratio > self.threshold
    }
}

/// Turn the trade log into output rows, resolving bar indices to dates
pub fn format_trades(
    name: &str,
    result: &BacktestResult,
    bars: &[Bar],
    date_format: &str,
) -> Result<Vec<TradeRow>> {
    let date_at = |index: usize| {
        bars.get(index)
            .map(|bar| bar.timestamp.format(date_format).to_string())
            .ok_or(BacktestError::TradeIndexOutOfRange {
                index,
                len: bars.len(),
            })
    };

    result
        .trades
        .iter()
        .map(|trade| {
            debug!(
                file = name,
                entry_bar = trade.entry_bar,
                exit_bar = trade.exit_bar,
                reason = ?trade.exit_reason,
                "trade"
            );
            Ok(TradeRow {
                name: name.to_string(),
                entry_datetime: date_at(trade.entry_bar)?,
                entry_price: trade.entry_price,
                exit_datetime: date_at(trade.exit_bar)?,
                exit_price: trade.exit_price,
                quantity: trade.quantity,
                pnl: trade.pnl,
            })
        })
        .collect()
}

/// Write rows with a header line and no index column
pub fn write_trade_rows(path: &Path, rows: &[TradeRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| BacktestError::CsvError(e.to_string()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| BacktestError::CsvError(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_trending_bars;
    use common::{ExitReason, PerformanceMetrics, StrategyParameters, Trade};

    fn result_with(trades: Vec<Trade>) -> BacktestResult {
        BacktestResult {
            params: StrategyParameters::default(),
            metrics: PerformanceMetrics::default(),
            equity_curve: vec![],
            trades,
            initial_capital: 100_000.0,
            final_equity: 100_000.0,
        }
    }

    fn trade(entry_bar: usize, exit_bar: usize) -> Trade {
        Trade {
            entry_bar,
            exit_bar,
            entry_price: 101.5,
            exit_price: 104.0,
            quantity: 900.0,
            pnl: 2250.0,
            exit_reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn test_filter_is_strict() {
        let filter = ResultFilter::new(1.0);
        assert!(!filter.accepts(1.0));
        assert!(filter.accepts(1.0001));
        assert!(!filter.accepts(0.5));
        assert!(!filter.accepts(f64::NAN));
    }

    #[test]
    fn test_format_resolves_dates() {
        let bars = generate_trending_bars(40, 100.0);
        let rows = format_trades("AAPL", &result_with(vec![trade(0, 31)]), &bars, "%d %b %y")
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "AAPL");
        assert_eq!(rows[0].entry_datetime, "01 Jan 24");
        assert_eq!(rows[0].exit_datetime, "01 Feb 24");
        assert_eq!(rows[0].quantity, 900.0);
        assert_eq!(rows[0].pnl, 2250.0);
    }

    #[test]
    fn test_format_is_idempotent() {
        let bars = generate_trending_bars(40, 100.0);
        let result = result_with(vec![trade(2, 5), trade(7, 20)]);

        let first = format_trades("X", &result, &bars, "%d %b %y").unwrap();
        let second = format_trades("X", &result, &bars, "%d %b %y").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_format_rejects_bad_index() {
        let bars = generate_trending_bars(10, 100.0);
        let err = format_trades("X", &result_with(vec![trade(2, 10)]), &bars, "%d %b %y")
            .unwrap_err();
        assert!(matches!(
            err,
            BacktestError::TradeIndexOutOfRange { index: 10, len: 10 }
        ));
    }

    #[test]
    fn test_write_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let bars = generate_trending_bars(10, 100.0);
        let rows = format_trades("X", &result_with(vec![trade(1, 3)]), &bars, "%d %b %y").unwrap();

        write_trade_rows(&path, &rows).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("name,entry datetime,entry price,exit datetime,exit price,quantity,profit/loss value")
        );
        assert_eq!(lines.next(), Some("X,02 Jan 24,101.5,04 Jan 24,104.0,900.0,2250.0"));
        assert_eq!(lines.next(), None);
    }
}
