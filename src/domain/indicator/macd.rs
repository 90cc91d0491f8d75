//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow - 1 + signal - 1 bars.

use crate::domain::candle::Candle;
use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, calculate_ema,
};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if candles.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let ema_fast = ema_raw_values(candles, fast);
    let ema_slow = ema_raw_values(candles, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line: Vec<f64> = vec![0.0; candles.len()];
    let macd_warmup = slow.max(fast) - 1;
    let signal_warmup = macd_warmup + signal_period - 1;

    if signal_warmup < candles.len() {
        let seed: f64 = macd_line[macd_warmup..=signal_warmup].iter().sum::<f64>()
            / signal_period as f64;
        let mut signal_ema = seed;
        signal_line[signal_warmup] = signal_ema;

        for i in (signal_warmup + 1)..candles.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                timestamp: candle.timestamp,
                valid: i >= signal_warmup,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_macd(candles, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}

/// Extract raw f64 values from the EMA module, using 0.0 for warmup bars.
fn ema_raw_values(candles: &[Candle], period: usize) -> Vec<f64> {
    calculate_ema(candles, period)
        .values
        .iter()
        .map(|p| match p.value {
            IndicatorValue::Simple(v) => v,
            _ => 0.0,
        })
        .collect()
}
