/// Simple moving average over a rolling window
///
/// # Returns
/// One entry per price; `None` until `period` prices have been seen
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; prices.len()];
    if period == 0 || prices.len() < period {
        return out;
    }

    let mut window_sum: f64 = prices[..period].iter().sum();
    out[period - 1] = Some(window_sum / period as f64);

    for (i, price) in prices.iter().enumerate().skip(period) {
        window_sum += price - prices[i - period];
        out[i] = Some(window_sum / period as f64);
    }

    out
}
