use common::SignalType;

use crate::indicators::MovingAverages;

/// Dual moving-average crossover rule with exclusive orders
pub struct SignalGenerator {
    averages: MovingAverages,
}

impl SignalGenerator {
    pub fn new(closes: &[f64], fast_window: usize, slow_window: usize) -> Self {
        Self {
            averages: MovingAverages::calculate(closes, fast_window, slow_window),
        }
    }

    /// Decide what to do at the close of bar `idx`
    pub fn generate(&self, idx: usize, has_position: bool) -> SignalType {
        if !has_position && self.averages.bullish_cross(idx) {
            SignalType::Buy
        } else if has_position && self.averages.bearish_cross(idx) {
            SignalType::Close
        } else {
            SignalType::Hold
        }
    }

    #[cfg(test)]
    fn averages(&self) -> &MovingAverages {
        &self.averages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v_shape() -> Vec<f64> {
        vec![10.0, 9.0, 8.0, 7.0, 12.0, 16.0, 15.0, 10.0, 6.0]
    }

    #[test]
    fn test_buy_only_when_flat() {
        let gen = SignalGenerator::new(&v_shape(), 2, 3);

        assert_eq!(gen.generate(4, false), SignalType::Buy);
        assert_eq!(gen.generate(4, true), SignalType::Hold);
    }

    #[test]
    fn test_close_only_when_holding() {
        let gen = SignalGenerator::new(&v_shape(), 2, 3);
        let bear = (0..9)
            .find(|&i| gen.averages().bearish_cross(i))
            .unwrap();

        assert_eq!(gen.generate(bear, true), SignalType::Close);
        assert_eq!(gen.generate(bear, false), SignalType::Hold);
    }

    #[test]
    fn test_no_signal_during_warmup() {
        let gen = SignalGenerator::new(&v_shape(), 2, 3);
        for idx in 0..3 {
            assert_eq!(gen.generate(idx, false), SignalType::Hold);
        }
    }
}
