//! Synthetic candle generator.
//!
//! Closes follow a log-return random walk from `base_price` with normally
//! distributed per-bar returns. Same seed, range and interval always produce
//! the same series.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::candle::{Candle, DateRange, Series};
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;

#[derive(Debug, Clone, PartialEq)]
pub struct MockDataConfig {
    pub seed: u64,
    pub base_price: f64,
    /// Mean per-bar log return.
    pub drift: f64,
    /// Standard deviation of the per-bar log return.
    pub volatility: f64,
    /// Intraday bars are kept when `market_open_hour <= hour < market_close_hour`.
    pub market_open_hour: u32,
    pub market_close_hour: u32,
}

impl Default for MockDataConfig {
    fn default() -> Self {
        MockDataConfig {
            seed: 42,
            base_price: 20_000_000.0,
            drift: 0.0005,
            volatility: 0.02,
            market_open_hour: 9,
            market_close_hour: 23,
        }
    }
}

impl MockDataConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.base_price.is_finite() || self.base_price <= 0.0 {
            return Err(BacktestError::invalid_parameter(
                "base_price",
                format!("must be positive, got {}", self.base_price),
            ));
        }
        if !self.drift.is_finite() {
            return Err(BacktestError::invalid_parameter("drift", "must be finite"));
        }
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(BacktestError::invalid_parameter(
                "volatility",
                format!("must be non-negative, got {}", self.volatility),
            ));
        }
        if self.market_open_hour >= self.market_close_hour || self.market_close_hour > 24 {
            return Err(BacktestError::invalid_parameter(
                "market_open_hour",
                format!(
                    "need market_open_hour < market_close_hour <= 24, got {} and {}",
                    self.market_open_hour, self.market_close_hour
                ),
            ));
        }
        Ok(())
    }
}

/// Bar timestamps for `range` at `interval`.
pub fn bar_timestamps(
    range: &DateRange,
    interval: Interval,
    config: &MockDataConfig,
) -> Vec<NaiveDateTime> {
    if range.start > range.end {
        return Vec::new();
    }
    match interval {
        Interval::Minutes(step) => {
            let start = range.start.and_time(NaiveTime::MIN);
            let end = range.end.and_time(NaiveTime::MIN) + Duration::minutes(24 * 60 - 1);
            let step = Duration::minutes(i64::from(step.max(1)));
            let mut out = Vec::new();
            let mut ts = start;
            while ts <= end {
                let hour = ts.hour();
                if hour >= config.market_open_hour && hour < config.market_close_hour {
                    out.push(ts);
                }
                ts += step;
            }
            out
        }
        Interval::Day => days(range).map(midnight).collect(),
        Interval::Week => days(range)
            .filter(|d| d.weekday() == Weekday::Sun)
            .map(midnight)
            .collect(),
        Interval::Month => days(range)
            .filter(|d| is_month_end(*d))
            .map(midnight)
            .collect(),
    }
}

fn days(range: &DateRange) -> impl Iterator<Item = NaiveDate> + '_ {
    range.start.iter_days().take_while(|d| *d <= range.end)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.month() != date.month())
}

/// Standard normal draw (Box-Muller).
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
    (-2.0 * u1.ln()).sqrt() * u2.cos()
}

pub fn generate_series<R: Rng>(
    range: &DateRange,
    interval: Interval,
    config: &MockDataConfig,
    rng: &mut R,
) -> Result<Series, BacktestError> {
    config.validate()?;
    let timestamps = bar_timestamps(range, interval, config);
    if timestamps.is_empty() {
        return Err(BacktestError::EmptyData {
            context: format!(
                "no {} bars between {} and {}",
                interval, range.start, range.end
            ),
        });
    }

    let mut close = config.base_price;
    let candles = timestamps
        .into_iter()
        .map(|timestamp| {
            let r = config.drift + config.volatility * standard_normal(&mut *rng);
            close *= r.exp();
            let high = close * (1.0 + rng.gen_range(0.0..0.01));
            let low = close * (1.0 - rng.gen_range(0.0..0.01));
            let open = close * (1.0 + rng.gen_range(-0.005..0.005));
            let volume = rng.gen_range(0.5..5.0) * 100.0;
            Candle {
                timestamp,
                open,
                high: high.max(open),
                low: low.min(open),
                close,
                volume,
            }
        })
        .collect();

    Series::new(candles)
}

/// [`generate_series`] with a `StdRng` seeded from `config.seed`.
pub fn generate_seeded(
    range: &DateRange,
    interval: Interval,
    config: &MockDataConfig,
) -> Result<Series, BacktestError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    generate_series(range, interval, config, &mut rng)
}
