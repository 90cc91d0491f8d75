//! Candle and series representation.

use crate::domain::error::BacktestError;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    fn check(&self) -> Result<(), BacktestError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, v) in fields {
            if !v.is_finite() {
                return Err(BacktestError::malformed(format!(
                    "{} at {} is not finite",
                    name, self.timestamp
                )));
            }
        }
        for (name, v) in &fields[..4] {
            if *v <= 0.0 {
                return Err(BacktestError::malformed(format!(
                    "{} at {} must be positive, got {}",
                    name, self.timestamp, v
                )));
            }
        }
        if self.volume < 0.0 {
            return Err(BacktestError::malformed(format!(
                "volume at {} must be non-negative, got {}",
                self.timestamp, self.volume
            )));
        }
        Ok(())
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Calendar days between start and end (end - start).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let date = ts.date();
        date >= self.start && date <= self.end
    }
}

/// Time-ordered candles. Construction validates ordering and values.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    pub fn new(candles: Vec<Candle>) -> Result<Self, BacktestError> {
        if candles.is_empty() {
            return Err(BacktestError::EmptyData {
                context: "series has no candles".into(),
            });
        }
        for candle in &candles {
            candle.check()?;
        }
        for pair in candles.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(BacktestError::malformed(format!(
                    "timestamps not strictly increasing: {} then {}",
                    pair[0].timestamp, pair[1].timestamp
                )));
            }
        }
        Ok(Self { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// The prefix visible at bar `index`: candles[0..=index].
    pub fn window(&self, index: usize) -> &[Candle] {
        &self.candles[..=index]
    }

    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    /// Calendar days between the first and last candle.
    pub fn span_days(&self) -> i64 {
        (self.last().timestamp.date() - self.first().timestamp.date()).num_days()
    }

    /// Keep only candles whose date falls inside `range`.
    pub fn filter_range(self, range: &DateRange) -> Result<Self, BacktestError> {
        let candles: Vec<Candle> = self
            .candles
            .into_iter()
            .filter(|c| range.contains(c.timestamp))
            .collect();
        if candles.is_empty() {
            return Err(BacktestError::EmptyData {
                context: format!("no candles between {} and {}", range.start, range.end),
            });
        }
        Ok(Self { candles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn candle(day: u32, close: f64) -> Candle {
        Candle {
            timestamp: ts(day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn rejects_empty_series() {
        assert!(matches!(
            Series::new(vec![]),
            Err(BacktestError::EmptyData { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let result = Series::new(vec![candle(1, 10.0), candle(1, 11.0)]);
        assert!(matches!(result, Err(BacktestError::MalformedData { .. })));
    }

    #[test]
    fn rejects_out_of_order() {
        let result = Series::new(vec![candle(2, 10.0), candle(1, 11.0)]);
        assert!(matches!(result, Err(BacktestError::MalformedData { .. })));
    }

    #[test]
    fn rejects_non_positive_price() {
        let result = Series::new(vec![candle(1, 0.0)]);
        assert!(matches!(result, Err(BacktestError::MalformedData { .. })));
    }

    #[test]
    fn rejects_nan_and_negative_volume() {
        let nan = Candle {
            high: f64::NAN,
            ..candle(1, 10.0)
        };
        assert!(Series::new(vec![nan]).is_err());

        let negative = Candle {
            volume: -1.0,
            ..candle(1, 10.0)
        };
        assert!(Series::new(vec![negative]).is_err());
    }

    #[test]
    fn zero_volume_is_allowed() {
        let c = Candle {
            volume: 0.0,
            ..candle(1, 10.0)
        };
        assert!(Series::new(vec![c]).is_ok());
    }

    #[test]
    fn window_is_inclusive_prefix() {
        let series = Series::new(vec![candle(1, 1.0), candle(2, 2.0), candle(3, 3.0)]).unwrap();
        let w = series.window(1);
        assert_eq!(w.len(), 2);
        assert_eq!(w[1].close, 2.0);
    }

    #[test]
    fn filter_range_keeps_inclusive_bounds() {
        let series = Series::new((1..=5).map(|d| candle(d, d as f64)).collect()).unwrap();
        let range = DateRange::new(ts(2).date(), ts(4).date());
        let filtered = series.filter_range(&range).unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered.first().close, 2.0);
        assert_eq!(filtered.last().close, 4.0);
    }

    #[test]
    fn filter_range_to_nothing_is_empty_data() {
        let series = Series::new(vec![candle(1, 1.0)]).unwrap();
        let range = DateRange::new(ts(10).date(), ts(12).date());
        assert!(matches!(
            series.filter_range(&range),
            Err(BacktestError::EmptyData { .. })
        ));
    }

    #[test]
    fn span_and_range_days() {
        let series = Series::new(vec![candle(1, 1.0), candle(11, 2.0)]).unwrap();
        assert_eq!(series.span_days(), 10);
        assert_eq!(DateRange::new(ts(1).date(), ts(31).date()).days(), 30);
    }
}
