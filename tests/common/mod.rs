#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
pub use tradesim::domain::candle::{Candle, Series};
use tradesim::domain::error::BacktestError;
use tradesim::domain::interval::Interval;
use tradesim::domain::strategy::MarketContext;
use tradesim::ports::candle_port::CandleSource;
use std::cell::Cell;

pub struct MockCandleSource {
    pub candles: Vec<Candle>,
    pub error: Option<BacktestError>,
    pub calls: Cell<usize>,
}

impl MockCandleSource {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            error: None,
            calls: Cell::new(0),
        }
    }

    pub fn unreachable(reason: &str) -> Self {
        Self {
            candles: Vec::new(),
            error: Some(BacktestError::Connectivity {
                reason: reason.to_string(),
            }),
            calls: Cell::new(0),
        }
    }

    pub fn malformed(reason: &str) -> Self {
        Self {
            candles: Vec::new(),
            error: Some(BacktestError::malformed(reason)),
            calls: Cell::new(0),
        }
    }
}

impl CandleSource for MockCandleSource {
    fn fetch_candles(
        &self,
        _symbol: &str,
        _interval: Interval,
        count: usize,
    ) -> Result<Vec<Candle>, BacktestError> {
        self.calls.set(self.calls.get() + 1);
        match &self.error {
            Some(BacktestError::Connectivity { reason }) => Err(BacktestError::Connectivity {
                reason: reason.clone(),
            }),
            Some(e) => Err(BacktestError::malformed(e.to_string())),
            None => {
                let skip = self.candles.len().saturating_sub(count);
                Ok(self.candles[skip..].to_vec())
            }
        }
    }
}

pub fn start_ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn make_candle(ts: NaiveDateTime, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp: ts,
        open: close,
        high: close * 1.005,
        low: close * 0.995,
        close,
        volume,
    }
}

/// Daily candles starting 2023-01-01 with the given closes.
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(start_ts() + Duration::days(i as i64), c, 100.0))
        .collect()
}

pub fn make_series(closes: &[f64]) -> Series {
    Series::new(make_candles(closes)).unwrap()
}

/// Closes oscillating around `base` so moving averages cross repeatedly.
pub fn wave_closes(n: usize, base: f64, amplitude: f64, period: f64) -> Vec<f64> {
    (0..n)
        .map(|i| base + amplitude * (i as f64 * std::f64::consts::TAU / period).sin())
        .collect()
}

pub fn daily_context() -> MarketContext {
    MarketContext {
        symbol: "KRW-BTC".into(),
        interval: Interval::Day,
    }
}
