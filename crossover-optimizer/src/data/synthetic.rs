//! Deterministic price series for tests and demos.

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::Bar;

fn start_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Upward drift with a sine wiggle, so fast/slow averages keep crossing
pub fn generate_trending_bars(days: usize, initial_price: f64) -> Vec<Bar> {
    let start = start_date();

    (0..days)
        .map(|i| {
            let close = initial_price + 0.5 * i as f64 + 4.0 * (i as f64 / 4.0).sin();
            let open = close - 0.2;
            Bar::new(
                start + Duration::days(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
                1_000_000.0,
            )
        })
        .collect()
}

/// Uniform noise of +/-5 around 100 from a 64-bit LCG, no trend
pub fn generate_noise_bars(days: usize, seed: u64) -> Vec<Bar> {
    let start = start_date();
    let mut state = seed;

    (0..days)
        .map(|i| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5;
            let close = 100.0 + unit * 10.0;
            Bar::new(
                start + Duration::days(i as i64),
                close,
                close + 0.5,
                close - 0.5,
                close,
                1_000_000.0,
            )
        })
        .collect()
}

/// Render bars as a CSV file body with `Date,Open,High,Low,Close,Volume`
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("Date,Open,High,Low,Close,Volume\n");
    for bar in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_bars;

    #[test]
    fn test_generate_trending_bars() {
        let bars = generate_trending_bars(200, 100.0);

        assert_eq!(bars.len(), 200);
        assert!(bars[199].close > bars[0].close + 80.0);
        for bar in &bars {
            assert!(bar.high >= bar.open.max(bar.close));
            assert!(bar.low <= bar.open.min(bar.close));
        }
    }

    #[test]
    fn test_noise_is_reproducible_and_bounded() {
        let a = generate_noise_bars(100, 7);
        let b = generate_noise_bars(100, 7);

        assert_eq!(a, b);
        assert!(a.iter().all(|bar| (95.0..=105.0).contains(&bar.close)));
    }

    #[test]
    fn test_csv_round_trip_preserves_length() {
        let bars = generate_trending_bars(30, 50.0);
        let parsed = read_bars(bars_to_csv(&bars).as_bytes()).unwrap();

        assert_eq!(parsed.len(), 30);
        assert_eq!(parsed[0].timestamp, bars[0].timestamp);
    }
}
