use chrono::{DateTime, Utc};
use common::{
    BacktestResult, BacktestSettings, Bar, ExitReason, Result, SignalType, StrategyParameters,
};
use tracing::trace;

use crate::metrics::MetricsCalculator;
use crate::portfolio::Portfolio;
use crate::signals::SignalGenerator;

/// Bar-by-bar simulator for the dual moving-average strategy
pub struct BacktestEngine {
    params: StrategyParameters,
    settings: BacktestSettings,
}

impl BacktestEngine {
    pub fn new(params: StrategyParameters, settings: BacktestSettings) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, settings })
    }

    /// Run backtest on provided bar data
    pub fn run(&self, bars: &[Bar]) -> BacktestResult {
        if bars.len() < self.params.warmup() {
            return self.empty_result(bars);
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let signal_generator =
            SignalGenerator::new(&closes, self.params.fast_window, self.params.slow_window);
        let mut portfolio =
            Portfolio::new(self.settings.starting_cash, self.settings.commission_rate);

        let mut equity_curve: Vec<(DateTime<Utc>, f64)> = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            // Contingent exits only apply from the bar after entry
            let entered_earlier = portfolio
                .current_position()
                .map(|p| p.entry_bar < i)
                .unwrap_or(false);
            if entered_earlier {
                if let Some((fill, reason)) = portfolio.check_exit_levels(bar.open, bar.high, bar.low)
                {
                    portfolio.close_position(fill, i, reason);
                }
            }

            match signal_generator.generate(i, portfolio.has_position()) {
                SignalType::Buy => self.execute_buy(&mut portfolio, bar, i),
                SignalType::Close => {
                    portfolio.close_position(bar.close, i, ExitReason::Crossover);
                }
                SignalType::Hold => {}
            }

            portfolio.update_price(bar.close);
            equity_curve.push((bar.timestamp, portfolio.equity()));
        }

        // Close any remaining position at the last close
        if let Some(last_bar) = bars.last() {
            if portfolio.has_position() {
                portfolio.close_position(last_bar.close, bars.len() - 1, ExitReason::EndOfData);
                if let Some(last) = equity_curve.last_mut() {
                    last.1 = portfolio.equity();
                }
            }
        }

        let final_equity = portfolio.equity();
        let trades = portfolio.into_trades();
        let metrics = MetricsCalculator::calculate(
            &equity_curve,
            &trades,
            self.settings.starting_cash,
            self.settings.risk_free_rate,
        );

        BacktestResult {
            params: self.params,
            metrics,
            equity_curve,
            trades,
            initial_capital: self.settings.starting_cash,
            final_equity,
        }
    }

    fn execute_buy(&self, portfolio: &mut Portfolio, bar: &Bar, bar_index: usize) {
        let quantity = portfolio.calculate_position_size(bar.close);
        if quantity < 1.0 {
            return;
        }

        if let Err(e) = portfolio.open_position(
            quantity,
            bar.close,
            bar_index,
            self.params.stop_loss_pct,
            self.params.take_profit_pct,
        ) {
            trace!(bar_index, error = %e, "entry skipped");
        }
    }

    /// Result for a series too short to produce any signal
    fn empty_result(&self, bars: &[Bar]) -> BacktestResult {
        let equity_curve: Vec<(DateTime<Utc>, f64)> = bars
            .iter()
            .map(|b| (b.timestamp, self.settings.starting_cash))
            .collect();

        BacktestResult {
            params: self.params,
            metrics: Default::default(),
            equity_curve,
            trades: vec![],
            initial_capital: self.settings.starting_cash,
            final_equity: self.settings.starting_cash,
        }
    }
}
