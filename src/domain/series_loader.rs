//! Candle acquisition with synthetic fallback.
//!
//! The configured [`CandleSource`] is asked for the most recent
//! `candle_count` candles, which are then cut to the requested date range.
//! When the source is unreachable or returns nothing, a seeded mock series
//! covering the range is generated instead. Fetched candles that all fall
//! outside the range are an error: [`BacktestError::EmptyData`].

use std::fmt;

use tracing::{info, warn};

use crate::domain::candle::{DateRange, Series};
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;
use crate::domain::mock_data::{MockDataConfig, generate_seeded};
use crate::ports::candle_port::CandleSource;

pub const DEFAULT_CANDLE_COUNT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    pub symbol: String,
    pub interval: Interval,
    pub date_range: DateRange,
    pub candle_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrigin {
    Source,
    Mock,
}

impl fmt::Display for SeriesOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesOrigin::Source => write!(f, "source"),
            SeriesOrigin::Mock => write!(f, "mock"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSeries {
    pub series: Series,
    pub origin: SeriesOrigin,
}

pub fn load_series(
    source: Option<&dyn CandleSource>,
    request: &SeriesRequest,
    mock: &MockDataConfig,
) -> Result<LoadedSeries, BacktestError> {
    if let Some(source) = source {
        match source.fetch_candles(&request.symbol, request.interval, request.candle_count) {
            Ok(candles) if candles.is_empty() => {
                warn!(
                    symbol = %request.symbol,
                    interval = %request.interval,
                    "candle source returned nothing, using mock data"
                );
            }
            Ok(candles) => {
                let fetched = candles.len();
                let in_range: Vec<_> = candles
                    .into_iter()
                    .filter(|c| request.date_range.contains(c.timestamp))
                    .collect();
                if in_range.is_empty() {
                    return Err(BacktestError::EmptyData {
                        context: format!(
                            "none of {} fetched candles fall between {} and {}",
                            fetched, request.date_range.start, request.date_range.end
                        ),
                    });
                }
                let series = Series::new(in_range)?;
                info!(
                    symbol = %request.symbol,
                    interval = %request.interval,
                    fetched,
                    bars = series.len(),
                    "loaded candles from source"
                );
                return Ok(LoadedSeries {
                    series,
                    origin: SeriesOrigin::Source,
                });
            }
            Err(BacktestError::Connectivity { reason }) => {
                warn!(
                    symbol = %request.symbol,
                    %reason,
                    "candle source unavailable, using mock data"
                );
            }
            Err(e) => return Err(e),
        }
    }

    let series = generate_seeded(&request.date_range, request.interval, mock)?;
    info!(
        symbol = %request.symbol,
        interval = %request.interval,
        seed = mock.seed,
        bars = series.len(),
        "generated mock candles"
    );
    Ok(LoadedSeries {
        series,
        origin: SeriesOrigin::Mock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use chrono::{Duration, NaiveDate};

    enum Stub {
        Candles(Vec<Candle>),
        Down,
        Broken,
    }

    impl CandleSource for Stub {
        fn fetch_candles(
            &self,
            _symbol: &str,
            _interval: Interval,
            count: usize,
        ) -> Result<Vec<Candle>, BacktestError> {
            match self {
                Stub::Candles(c) => Ok(c[c.len().saturating_sub(count)..].to_vec()),
                Stub::Down => Err(BacktestError::Connectivity {
                    reason: "connection refused".into(),
                }),
                Stub::Broken => Err(BacktestError::malformed("bad row")),
            }
        }
    }

    fn daily_candles(start: NaiveDate, n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                timestamp: (start + Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + i as f64,
                volume: 10.0,
            })
            .collect()
    }

    fn request(start: (i32, u32, u32), end: (i32, u32, u32)) -> SeriesRequest {
        SeriesRequest {
            symbol: "KRW-BTC".into(),
            interval: Interval::Day,
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
                NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            ),
            candle_count: DEFAULT_CANDLE_COUNT,
        }
    }

    #[test]
    fn source_candles_filtered_to_range() {
        let source = Stub::Candles(daily_candles(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 60));
        let loaded = load_series(
            Some(&source),
            &request((2023, 1, 11), (2023, 1, 20)),
            &MockDataConfig::default(),
        )
        .unwrap();
        assert_eq!(loaded.origin, SeriesOrigin::Source);
        assert_eq!(loaded.series.len(), 10);
        assert!((loaded.series.first().close - 110.0).abs() < f64::EPSILON);
    }

    #[test]
    fn only_last_count_candles_are_fetched() {
        let source = Stub::Candles(daily_candles(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), 60));
        let req = SeriesRequest {
            candle_count: 5,
            ..request((2023, 1, 1), (2023, 12, 31))
        };
        let loaded = load_series(Some(&source), &req, &MockDataConfig::default()).unwrap();
        assert_eq!(loaded.series.len(), 5);
    }

    #[test]
    fn connectivity_failure_falls_back_to_mock() {
        let req = request((2023, 1, 1), (2023, 1, 31));
        let loaded = load_series(Some(&Stub::Down), &req, &MockDataConfig::default()).unwrap();
        assert_eq!(loaded.origin, SeriesOrigin::Mock);
        assert_eq!(loaded.series.len(), 31);
    }

    #[test]
    fn candles_outside_range_are_empty_data() {
        let source = Stub::Candles(daily_candles(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), 10));
        let err = load_series(
            Some(&source),
            &request((2023, 1, 1), (2023, 1, 10)),
            &MockDataConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BacktestError::EmptyData { .. }));
    }

    #[test]
    fn empty_fetch_falls_back_to_mock() {
        let source = Stub::Candles(Vec::new());
        let loaded = load_series(
            Some(&source),
            &request((2023, 1, 1), (2023, 1, 10)),
            &MockDataConfig::default(),
        )
        .unwrap();
        assert_eq!(loaded.origin, SeriesOrigin::Mock);
        assert_eq!(loaded.series.len(), 10);
    }

    #[test]
    fn malformed_source_data_propagates() {
        let err = load_series(
            Some(&Stub::Broken),
            &request((2023, 1, 1), (2023, 1, 10)),
            &MockDataConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BacktestError::MalformedData { .. }));
    }

    #[test]
    fn no_source_generates_directly() {
        let req = request((2023, 1, 1), (2023, 1, 10));
        let a = load_series(None, &req, &MockDataConfig::default()).unwrap();
        let b = load_series(None, &req, &MockDataConfig::default()).unwrap();
        assert_eq!(a.origin, SeriesOrigin::Mock);
        assert_eq!(a, b);
    }
}
