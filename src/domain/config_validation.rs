//! Configuration loading and validation.
//!
//! Every key is optional; missing keys take the defaults of [`RunSettings`].
//! Present but unparsable values fail with `ConfigInvalid`.

use std::path::PathBuf;

use crate::domain::candle::DateRange;
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;
use crate::domain::mock_data::MockDataConfig;
use crate::domain::series_loader::DEFAULT_CANDLE_COUNT;
use crate::domain::sizing::SizingPolicy;
use crate::domain::strategy::{MarketContext, StrategyParams, create_strategy};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_STRATEGY: &str = "bollinger_rsi";
pub const DEFAULT_SYMBOL: &str = "KRW-BTC";
pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

/// Everything a backtest run needs, resolved from config and CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub strategy: String,
    pub symbol: String,
    pub interval: Interval,
    pub date_range: DateRange,
    pub initial_capital: f64,
    pub sizing: SizingPolicy,
    pub candle_count: usize,
    pub data_dir: Option<PathBuf>,
    pub mock: MockDataConfig,
    pub params: StrategyParams,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            strategy: DEFAULT_STRATEGY.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            interval: Interval::Minutes(60),
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            ),
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            sizing: SizingPolicy::default(),
            candle_count: DEFAULT_CANDLE_COUNT,
            data_dir: None,
            mock: MockDataConfig::default(),
            params: StrategyParams::new(),
        }
    }
}

impl RunSettings {
    pub fn market(&self) -> MarketContext {
        MarketContext {
            symbol: self.symbol.clone(),
            interval: self.interval,
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_string(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match read_string(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("expected a number, got '{}'", raw))),
    }
}

fn read_u64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: u64,
) -> Result<u64, BacktestError> {
    match read_string(config, section, key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            invalid(
                section,
                key,
                format!("expected a non-negative integer, got '{}'", raw),
            )
        }),
    }
}

fn read_date(
    config: &dyn ConfigPort,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, BacktestError> {
    match read_string(config, "backtest", key) {
        None => Ok(default),
        Some(raw) => parse_date(&raw)
            .ok_or_else(|| invalid("backtest", key, "invalid date format, expected YYYY-MM-DD")),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Read `[backtest]`, `[mock_data]` and `[strategy]` into settings.
pub fn settings_from_config(config: &dyn ConfigPort) -> Result<RunSettings, BacktestError> {
    let d = RunSettings::default();

    let interval = match read_string(config, "backtest", "interval") {
        None => d.interval,
        Some(raw) => raw
            .parse::<Interval>()
            .map_err(|e| invalid("backtest", "interval", e.to_string()))?,
    };

    let date_range = DateRange::new(
        read_date(config, "start_date", d.date_range.start)?,
        read_date(config, "end_date", d.date_range.end)?,
    );

    let sizing = SizingPolicy {
        buy_fraction: read_f64(config, "backtest", "buy_fraction", d.sizing.buy_fraction)?,
        partial_ratio: read_f64(config, "backtest", "partial_ratio", d.sizing.partial_ratio)?,
    };

    let mock = MockDataConfig {
        seed: read_u64(config, "mock_data", "seed", d.mock.seed)?,
        base_price: read_f64(config, "mock_data", "base_price", d.mock.base_price)?,
        drift: read_f64(config, "mock_data", "drift", d.mock.drift)?,
        volatility: read_f64(config, "mock_data", "volatility", d.mock.volatility)?,
        market_open_hour: read_hour(config, "market_open_hour", d.mock.market_open_hour)?,
        market_close_hour: read_hour(config, "market_close_hour", d.mock.market_close_hour)?,
    };

    let mut params = StrategyParams::new();
    for key in config.keys("strategy") {
        if read_string(config, "strategy", &key).is_some() {
            params.set(&key, read_f64(config, "strategy", &key, 0.0)?);
        }
    }

    Ok(RunSettings {
        strategy: read_string(config, "backtest", "strategy").unwrap_or(d.strategy),
        symbol: read_string(config, "backtest", "symbol").unwrap_or(d.symbol),
        interval,
        date_range,
        initial_capital: read_f64(config, "backtest", "initial_capital", d.initial_capital)?,
        sizing,
        candle_count: read_u64(config, "backtest", "candle_count", d.candle_count as u64)?
            as usize,
        data_dir: read_string(config, "backtest", "data_dir").map(PathBuf::from),
        mock,
        params,
    })
}

fn read_hour(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, BacktestError> {
    let hour = read_u64(config, "mock_data", key, u64::from(default))?;
    u32::try_from(hour)
        .ok()
        .filter(|h| *h <= 24)
        .ok_or_else(|| invalid("mock_data", key, format!("hour out of range: {}", hour)))
}

/// Check the resolved settings before any data is loaded.
pub fn validate_settings(settings: &RunSettings) -> Result<(), BacktestError> {
    if settings.symbol.trim().is_empty() {
        return Err(BacktestError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        });
    }
    if settings.date_range.start > settings.date_range.end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    if !settings.initial_capital.is_finite() || settings.initial_capital <= 0.0 {
        return Err(BacktestError::invalid_parameter(
            "initial_capital",
            format!("must be positive, got {}", settings.initial_capital),
        ));
    }
    if settings.candle_count == 0 {
        return Err(invalid("backtest", "candle_count", "must be at least 1"));
    }
    settings.sizing.validate()?;
    settings.mock.validate()?;
    create_strategy(&settings.strategy, settings.market(), &settings.params)?;
    Ok(())
}
