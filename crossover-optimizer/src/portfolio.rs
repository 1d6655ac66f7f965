use common::{BacktestError, ExitReason, Position, Result, Trade};

/// Cash plus at most one long position, with commission charged as a rate
#[derive(Debug)]
pub struct Portfolio {
    cash: f64,
    commission_rate: f64,
    position: Option<Position>,
    trades: Vec<Trade>,
}

impl Portfolio {
    pub fn new(initial_capital: f64, commission_rate: f64) -> Self {
        Self {
            cash: initial_capital,
            commission_rate,
            position: None,
            trades: Vec::new(),
        }
    }

    /// Get current equity (cash + position value)
    pub fn equity(&self) -> f64 {
        self.cash + self.position_value()
    }

    pub fn position_value(&self) -> f64 {
        self.position
            .as_ref()
            .map(|p| p.quantity * p.current_price)
            .unwrap_or(0.0)
    }

    #[cfg(test)]
    fn cash(&self) -> f64 {
        self.cash
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn current_position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    pub fn update_price(&mut self, price: f64) {
        if let Some(pos) = self.position.as_mut() {
            pos.current_price = price;
        }
    }

    /// Whole units affordable with all available cash, commission included
    pub fn calculate_position_size(&self, price: f64) -> f64 {
        if price <= 0.0 {
            return 0.0;
        }
        (self.cash / (price * (1.0 + self.commission_rate))).floor()
    }

    /// Open a long position. Fails if one is already open or cash is short.
    pub fn open_position(
        &mut self,
        quantity: f64,
        price: f64,
        bar_index: usize,
        stop_loss_pct: f64,
        take_profit_pct: f64,
    ) -> Result<()> {
        if self.position.is_some() {
            return Err(BacktestError::InvalidParameter(
                "position already open".to_string(),
            ));
        }

        let cost = quantity * price * (1.0 + self.commission_rate);
        if cost > self.cash {
            return Err(BacktestError::InsufficientCash {
                required: cost,
                available: self.cash,
            });
        }

        self.cash -= cost;
        self.position = Some(Position {
            quantity,
            entry_price: price,
            entry_bar: bar_index,
            current_price: price,
            stop_loss_price: price * (1.0 - stop_loss_pct),
            take_profit_price: price * (1.0 + take_profit_pct),
        });

        Ok(())
    }

    /// Close the open position, if any, and record the trade
    pub fn close_position(
        &mut self,
        price: f64,
        bar_index: usize,
        reason: ExitReason,
    ) -> Option<Trade> {
        let position = self.position.take()?;

        let proceeds = position.quantity * price * (1.0 - self.commission_rate);
        let entry_commission = position.quantity * position.entry_price * self.commission_rate;
        let exit_commission = position.quantity * price * self.commission_rate;
        let pnl =
            position.quantity * (price - position.entry_price) - entry_commission - exit_commission;

        self.cash += proceeds;

        let trade = Trade {
            entry_bar: position.entry_bar,
            exit_bar: bar_index,
            entry_price: position.entry_price,
            exit_price: price,
            quantity: position.quantity,
            pnl,
            exit_reason: reason,
        };

        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Stop-loss / take-profit check against a bar's range.
    ///
    /// Stop-loss wins when both levels are inside the bar. A gap through a
    /// level fills at the open.
    pub fn check_exit_levels(&self, open: f64, high: f64, low: f64) -> Option<(f64, ExitReason)> {
        let pos = self.position.as_ref()?;

        if low <= pos.stop_loss_price {
            let fill = if open <= pos.stop_loss_price {
                open
            } else {
                pos.stop_loss_price
            };
            return Some((fill, ExitReason::StopLoss));
        }

        if high >= pos.take_profit_price {
            let fill = if open >= pos.take_profit_price {
                open
            } else {
                pos.take_profit_price
            };
            return Some((fill, ExitReason::TakeProfit));
        }

        None
    }
}
