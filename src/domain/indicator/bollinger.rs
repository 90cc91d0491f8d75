//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are invalid.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, Source, calculate_sma,
    calculate_stddev, simple_value,
};

pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let mult = stddev_mult_x100 as f64 / 100.0;
    let sma = calculate_sma(candles, period, Source::Close);
    let stddev = calculate_stddev(candles, period);

    let values = sma
        .values
        .iter()
        .zip(&stddev.values)
        .map(|(mid, sd)| {
            let valid = mid.valid && sd.valid;
            let (upper, middle, lower) = if valid {
                let middle = simple_value(mid).unwrap_or(0.0);
                let width = mult * simple_value(sd).unwrap_or(0.0);
                (middle + width, middle, middle - width)
            } else {
                (0.0, 0.0, 0.0)
            };
            IndicatorPoint {
                timestamp: mid.timestamp,
                valid,
                value: IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Relative band width: (upper - lower) / middle.
pub fn band_width(value: &IndicatorValue) -> Option<f64> {
    match *value {
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } if middle != 0.0 => Some((upper - lower) / middle),
        _ => None,
    }
}
