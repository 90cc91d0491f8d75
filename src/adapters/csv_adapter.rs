//! CSV file candle source.
//!
//! Reads `<base_path>/<symbol>_<interval>.csv` with the header
//! `timestamp,open,high,low,close,volume`.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;
use crate::ports::candle_port::CandleSource;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub struct CsvCandleSource {
    base_path: PathBuf,
}

impl CsvCandleSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, BacktestError> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| BacktestError::malformed(format!("invalid timestamp: {}", raw)))
}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, BacktestError> {
    record
        .get(index)
        .ok_or_else(|| BacktestError::malformed(format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| BacktestError::malformed(format!("invalid {} value: {}", name, e)))
}

impl CandleSource for CsvCandleSource {
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<Candle>, BacktestError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::Connectivity {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record =
                result.map_err(|e| BacktestError::malformed(format!("CSV parse error: {}", e)))?;

            let timestamp = parse_timestamp(
                record
                    .get(0)
                    .ok_or_else(|| BacktestError::malformed("missing timestamp column"))?,
            )?;

            candles.push(Candle {
                timestamp,
                open: parse_field(&record, 1, "open")?,
                high: parse_field(&record, 2, "high")?,
                low: parse_field(&record, 3, "low")?,
                close: parse_field(&record, 4, "close")?,
                volume: parse_field(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        let skip = candles.len().saturating_sub(count);
        debug!(
            path = %path.display(),
            rows = candles.len(),
            kept = candles.len() - skip,
            "loaded candles from CSV"
        );
        Ok(candles.split_off(skip))
    }
}
