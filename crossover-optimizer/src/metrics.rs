use chrono::{DateTime, Utc};
use common::{PerformanceMetrics, Trade};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calculate performance metrics from equity curve and trades
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all performance metrics.
    /// `risk_free_rate` is annual and expressed as a fraction.
    pub fn calculate(
        equity_curve: &[(DateTime<Utc>, f64)],
        trades: &[Trade],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> PerformanceMetrics {
        if equity_curve.is_empty() {
            return PerformanceMetrics::default();
        }

        let final_equity = equity_curve.last().map(|(_, e)| *e).unwrap_or(initial_capital);
        let total_return = final_equity - initial_capital;
        let total_return_pct = (total_return / initial_capital) * 100.0;

        let daily_returns = Self::calculate_daily_returns(equity_curve);
        let volatility = Self::calculate_volatility(&daily_returns);
        let sharpe_ratio = Self::calculate_sharpe_ratio(&daily_returns, volatility, risk_free_rate);
        let sortino_ratio = Self::calculate_sortino_ratio(&daily_returns, risk_free_rate);
        let max_drawdown = Self::calculate_max_drawdown(equity_curve);

        let stats = Self::calculate_trade_stats(trades);
        let exposure_pct = Self::calculate_exposure(equity_curve.len(), trades);

        PerformanceMetrics {
            total_return,
            total_return_pct,
            volatility: volatility * 100.0,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            total_trades: trades.len() as u32,
            winning_trades: stats.winning,
            losing_trades: stats.losing,
            win_rate: stats.win_rate,
            profit_factor: stats.profit_factor,
            best_trade: stats.best,
            worst_trade: stats.worst,
            exposure_pct,
        }
    }

    /// Simple bar-to-bar returns of the equity curve
    fn calculate_daily_returns(equity_curve: &[(DateTime<Utc>, f64)]) -> Vec<f64> {
        equity_curve
            .windows(2)
            .map(|w| {
                let prev = w[0].1;
                let curr = w[1].1;
                if prev != 0.0 {
                    (curr - prev) / prev
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Annualized volatility as a fraction (population standard deviation)
    fn calculate_volatility(daily_returns: &[f64]) -> f64 {
        if daily_returns.is_empty() {
            return 0.0;
        }

        let n = daily_returns.len() as f64;
        let mean: f64 = daily_returns.iter().sum::<f64>() / n;
        let variance: f64 = daily_returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
    }

    /// (annualized mean return - risk free) / annualized volatility, 0 when flat
    fn calculate_sharpe_ratio(daily_returns: &[f64], volatility: f64, risk_free_rate: f64) -> f64 {
        if daily_returns.is_empty() || volatility == 0.0 {
            return 0.0;
        }

        let n = daily_returns.len() as f64;
        let mean_daily_return = daily_returns.iter().sum::<f64>() / n;
        let annualized_return = mean_daily_return * TRADING_DAYS_PER_YEAR;

        (annualized_return - risk_free_rate) / volatility
    }

    /// Calculate Sortino ratio (uses only downside deviation)
    fn calculate_sortino_ratio(daily_returns: &[f64], risk_free_rate: f64) -> f64 {
        if daily_returns.is_empty() {
            return 0.0;
        }

        let n = daily_returns.len() as f64;
        let mean_return = daily_returns.iter().sum::<f64>() / n;
        let daily_risk_free = risk_free_rate / TRADING_DAYS_PER_YEAR;

        let downside_sum: f64 = daily_returns
            .iter()
            .filter(|&&r| r < daily_risk_free)
            .map(|&r| (r - daily_risk_free).powi(2))
            .sum();

        let downside_deviation = (downside_sum / n).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        if downside_deviation == 0.0 {
            return 0.0;
        }

        let annualized_return = mean_return * TRADING_DAYS_PER_YEAR;
        (annualized_return - risk_free_rate) / downside_deviation
    }

    /// Largest peak-to-trough decline, in percent
    fn calculate_max_drawdown(equity_curve: &[(DateTime<Utc>, f64)]) -> f64 {
        let mut peak = f64::MIN;
        let mut max_drawdown: f64 = 0.0;

        for (_, equity) in equity_curve {
            peak = peak.max(*equity);
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak * 100.0);
            }
        }

        max_drawdown
    }

    fn calculate_trade_stats(trades: &[Trade]) -> TradeStats {
        if trades.is_empty() {
            return TradeStats::default();
        }

        let mut stats = TradeStats {
            best: f64::MIN,
            worst: f64::MAX,
            ..Default::default()
        };
        let mut total_wins = 0.0;
        let mut total_losses = 0.0;

        for trade in trades {
            if trade.pnl > 0.0 {
                stats.winning += 1;
                total_wins += trade.pnl;
            } else if trade.pnl < 0.0 {
                stats.losing += 1;
                total_losses += trade.pnl.abs();
            }
            stats.best = stats.best.max(trade.pnl);
            stats.worst = stats.worst.min(trade.pnl);
        }

        stats.win_rate = stats.winning as f64 / trades.len() as f64 * 100.0;
        stats.profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        stats
    }

    /// Share of bars spent holding a position, in percent
    fn calculate_exposure(total_bars: usize, trades: &[Trade]) -> f64 {
        if total_bars == 0 || trades.is_empty() {
            return 0.0;
        }

        let held: usize = trades.iter().map(|t| t.holding_bars().max(1)).sum();
        (held as f64 / total_bars as f64 * 100.0).min(100.0)
    }
}

#[derive(Debug, Default)]
struct TradeStats {
    winning: u32,
    losing: u32,
    win_rate: f64,
    profit_factor: f64,
    best: f64,
    worst: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};
    use common::ExitReason;

    fn make_equity_curve(values: &[f64]) -> Vec<(DateTime<Utc>, f64)> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (start + Duration::days(i as i64), v))
            .collect()
    }

    fn trade(pnl: f64, entry_bar: usize, exit_bar: usize) -> Trade {
        Trade {
            entry_bar,
            exit_bar,
            entry_price: 10.0,
            exit_price: 10.0,
            quantity: 1.0,
            pnl,
            exit_reason: ExitReason::Crossover,
        }
    }

    #[test]
    fn test_basic_metrics() {
        let equity = make_equity_curve(&[10000.0, 10100.0, 10200.0, 10300.0, 10400.0]);
        let metrics = MetricsCalculator::calculate(&equity, &[], 10000.0, 0.0);

        assert_eq!(metrics.total_return, 400.0);
        assert_eq!(metrics.total_return_pct, 4.0);
    }

    #[test]
    fn test_flat_equity_has_zero_sharpe() {
        let equity = make_equity_curve(&[100.0; 10]);
        let metrics = MetricsCalculator::calculate(&equity, &[], 100.0, 0.0);

        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.volatility, 0.0);
    }

    #[test]
    fn test_sharpe_formula() {
        // Returns +10%, -10%: mean 0, std 0.1
        let equity = make_equity_curve(&[100.0, 110.0, 99.0]);
        let metrics = MetricsCalculator::calculate(&equity, &[], 100.0, 0.02);

        let vol = 0.1 * 252f64.sqrt();
        assert_relative_eq!(metrics.sharpe_ratio, -0.02 / vol, epsilon = 1e-12);
    }

    #[test]
    fn test_sharpe_ratio_positive() {
        let equity = make_equity_curve(&[10000.0, 10100.0, 10150.0, 10300.0, 10320.0]);
        let metrics = MetricsCalculator::calculate(&equity, &[], 10000.0, 0.0);

        assert!(metrics.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let equity = make_equity_curve(&[10000.0, 11000.0, 9000.0, 9500.0, 10500.0]);
        let max_dd = MetricsCalculator::calculate_max_drawdown(&equity);

        // Peak was 11000, trough was 9000 = 18.18% drawdown
        assert!((max_dd - 18.18).abs() < 0.1);
    }

    #[test]
    fn test_trade_stats() {
        let trades = vec![trade(100.0, 0, 2), trade(-50.0, 3, 4), trade(25.0, 5, 9)];
        let equity = make_equity_curve(&[100.0; 10]);
        let metrics = MetricsCalculator::calculate(&equity, &trades, 100.0, 0.0);

        assert_eq!(metrics.total_trades, 3);
        assert_eq!(metrics.winning_trades, 2);
        assert_eq!(metrics.losing_trades, 1);
        assert_relative_eq!(metrics.profit_factor, 2.5);
        assert_eq!(metrics.best_trade, 100.0);
        assert_eq!(metrics.worst_trade, -50.0);
        assert_relative_eq!(metrics.exposure_pct, 70.0);
    }
}
