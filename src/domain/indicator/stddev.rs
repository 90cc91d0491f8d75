//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_stddev(candles: &[Candle], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Stddev(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(candles.len());
    let warmup = period - 1;

    for (i, candle) in candles.iter().enumerate() {
        let valid = i >= warmup;

        let value = if valid {
            let window = &candles[i - warmup..=i];
            let mean: f64 = window.iter().map(|c| c.close).sum::<f64>() / period as f64;
            let variance: f64 = window
                .iter()
                .map(|c| {
                    let diff = c.close - mean;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            variance.sqrt()
        } else {
            0.0
        };

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid,
            value: IndicatorValue::Simple(value),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
