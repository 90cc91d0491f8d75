//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorFrame`: The set of series a strategy derived from one window
//!
//! Every function is a pure function of the candle slice it is given. Points
//! inside the warmup window carry `valid == false` and are treated as
//! undefined by the strategies.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;

use crate::domain::candle::Candle;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

/// Candle field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Close,
    Volume,
}

impl Source {
    pub fn extract(&self, candle: &Candle) -> f64 {
        match self {
            Source::Close => candle.close,
            Source::Volume => candle.volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    /// All numbers carried by this value are finite.
    pub fn is_finite(&self) -> bool {
        match *self {
            IndicatorValue::Simple(v) => v.is_finite(),
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => line.is_finite() && signal.is_finite() && histogram.is_finite(),
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => upper.is_finite() && middle.is_finite() && lower.is_finite(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma { period: usize, source: Source },
    Ema(usize),
    Rsi(usize),
    Stddev(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The last two points (previous, current) when both are valid.
    pub fn last_two(&self) -> Option<(&IndicatorPoint, &IndicatorPoint)> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let prev = &self.values[n - 2];
        let curr = &self.values[n - 1];
        (prev.valid && curr.valid).then_some((prev, curr))
    }
}

/// Indicator series computed for one evaluation window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type.clone(), series);
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }
}

/// Extract the raw number of a `Simple` point.
pub fn simple_value(point: &IndicatorPoint) -> Option<f64> {
    match point.value {
        IndicatorValue::Simple(v) => Some(v),
        _ => None,
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma {
                period,
                source: Source::Close,
            } => write!(f, "SMA({})", period),
            IndicatorType::Sma {
                period,
                source: Source::Volume,
            } => write!(f, "SMA(VOLUME,{})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}
