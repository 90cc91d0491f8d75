//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(X[i-n+1..=i]) where X is the chosen candle field.
//! Warmup: first (n-1) bars are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Source,
};

pub fn calculate_sma(candles: &[Candle], period: usize, source: Source) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma { period, source };
    if period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(candles.len());
    let warmup = period - 1;

    for (i, candle) in candles.iter().enumerate() {
        let valid = i >= warmup;
        let value = if valid {
            candles[i - warmup..=i]
                .iter()
                .map(|c| source.extract(c))
                .sum::<f64>()
                / period as f64
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
        indicator_type,
        values,
    }
}
