pub mod sma;

pub use sma::calculate_sma;

/// Fast and slow averages of close, computed once per run
#[derive(Debug, Clone)]
pub struct MovingAverages {
    pub fast: Vec<Option<f64>>,
    pub slow: Vec<Option<f64>>,
}

impl MovingAverages {
    pub fn calculate(closes: &[f64], fast_window: usize, slow_window: usize) -> Self {
        Self {
            fast: calculate_sma(closes, fast_window),
            slow: calculate_sma(closes, slow_window),
        }
    }

    /// Fast crossed above slow between `idx - 1` and `idx`
    pub fn bullish_cross(&self, idx: usize) -> bool {
        crossover(&self.fast, &self.slow, idx)
    }

    /// Slow crossed above fast between `idx - 1` and `idx`
    pub fn bearish_cross(&self, idx: usize) -> bool {
        crossover(&self.slow, &self.fast, idx)
    }
}

/// `a` was at or below `b` on the previous bar and is strictly above it now.
/// Needs both series defined on both bars.
pub fn crossover(a: &[Option<f64>], b: &[Option<f64>], idx: usize) -> bool {
    if idx == 0 {
        return false;
    }
    let values = (
        a.get(idx - 1).copied().flatten(),
        b.get(idx - 1).copied().flatten(),
        a.get(idx).copied().flatten(),
        b.get(idx).copied().flatten(),
    );
    match values {
        (Some(a_prev), Some(b_prev), Some(a_now), Some(b_now)) => {
            a_prev <= b_prev && a_now > b_now
        }
        _ => false,
    }
}
