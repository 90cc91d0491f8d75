//! Strategy identifier to constructor mapping.

use std::collections::BTreeMap;

use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;
use crate::domain::strategy::{
    BollingerRsi, BollingerRsiParams, MaCrossover, MaCrossoverParams, StrategyKind,
};

/// Largest accepted period or bar count.
pub const MAX_PERIOD: usize = 100_000;

/// Market a strategy instance is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketContext {
    pub symbol: String,
    pub interval: Interval,
}

/// Numeric strategy parameter overrides keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyParams {
    values: BTreeMap<String, f64>,
}

impl StrategyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a `key=value` assignment.
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<(), BacktestError> {
        let (key, value) = assignment.split_once('=').ok_or_else(|| {
            BacktestError::invalid_parameter(assignment, "expected key=value")
        })?;
        let key = key.trim();
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| BacktestError::invalid_parameter(key, format!("not a number: {}", value)))?;
        self.set(key, value);
        Ok(())
    }

    /// Fail on any key not in `known`.
    pub fn check_keys(&self, known: &[&str]) -> Result<(), BacktestError> {
        match self.values.keys().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(BacktestError::invalid_parameter(
                key,
                format!("unknown parameter (expected one of: {})", known.join(", ")),
            )),
            None => Ok(()),
        }
    }

    /// A finite number, or `default` when absent.
    pub fn number(&self, key: &str, default: f64) -> Result<f64, BacktestError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(BacktestError::invalid_parameter(
                key,
                format!("must be finite, got {}", v),
            )),
        }
    }

    /// A positive whole number, or `default` when absent.
    pub fn period(&self, key: &str, default: usize) -> Result<usize, BacktestError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if (1.0..=MAX_PERIOD as f64).contains(&v) && v.fract() == 0.0 => Ok(v as usize),
            Some(v) => Err(BacktestError::invalid_parameter(
                key,
                format!("must be an integer in 1..={}, got {}", MAX_PERIOD, v),
            )),
        }
    }

    /// A non-negative whole number, or `default` when absent.
    pub fn count(&self, key: &str, default: usize) -> Result<usize, BacktestError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) if (0.0..=MAX_PERIOD as f64).contains(&v) && v.fract() == 0.0 => Ok(v as usize),
            Some(v) => Err(BacktestError::invalid_parameter(
                key,
                format!("must be an integer in 0..={}, got {}", MAX_PERIOD, v),
            )),
        }
    }
}

type Constructor = fn(MarketContext, &StrategyParams) -> Result<StrategyKind, BacktestError>;

struct Registration {
    name: &'static str,
    keys: &'static [&'static str],
    build: Constructor,
}

const REGISTRY: [Registration; 2] = [
    Registration {
        name: BollingerRsi::NAME,
        keys: &BollingerRsiParams::KEYS,
        build: build_bollinger_rsi,
    },
    Registration {
        name: MaCrossover::NAME,
        keys: &MaCrossoverParams::KEYS,
        build: build_ma_crossover,
    },
];

fn build_bollinger_rsi(
    context: MarketContext,
    params: &StrategyParams,
) -> Result<StrategyKind, BacktestError> {
    let params = BollingerRsiParams::from_params(params)?;
    Ok(StrategyKind::BollingerRsi(BollingerRsi::new(context, params)?))
}

fn build_ma_crossover(
    context: MarketContext,
    params: &StrategyParams,
) -> Result<StrategyKind, BacktestError> {
    let params = MaCrossoverParams::from_params(params)?;
    Ok(StrategyKind::MaCrossover(MaCrossover::new(context, params)?))
}

/// Registered identifiers, sorted.
pub fn supported_strategies() -> Vec<&'static str> {
    REGISTRY.iter().map(|r| r.name).collect()
}

/// Parameter names accepted by the strategy registered under `name`.
pub fn parameter_keys(name: &str) -> Option<&'static [&'static str]> {
    REGISTRY.iter().find(|r| r.name == name).map(|r| r.keys)
}

/// Build the strategy registered under `name`.
pub fn create_strategy(
    name: &str,
    context: MarketContext,
    params: &StrategyParams,
) -> Result<StrategyKind, BacktestError> {
    let registration = REGISTRY.iter().find(|r| r.name == name).ok_or_else(|| {
        BacktestError::UnsupportedStrategy {
            name: name.to_string(),
            supported: supported_strategies().join(", "),
        }
    })?;
    (registration.build)(context, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::Strategy;

    fn context() -> MarketContext {
        MarketContext {
            symbol: "KRW-ETH".into(),
            interval: Interval::Minutes(60),
        }
    }

    #[test]
    fn lists_both_strategies() {
        assert_eq!(supported_strategies(), vec!["bollinger_rsi", "ma_crossover"]);
    }

    #[test]
    fn creates_registered_strategies() {
        let s = create_strategy("ma_crossover", context(), &StrategyParams::new()).unwrap();
        assert_eq!(s.name(), "ma_crossover");
        let s = create_strategy("bollinger_rsi", context(), &StrategyParams::new()).unwrap();
        assert_eq!(s.name(), "bollinger_rsi");
        assert_eq!(s.context().interval, Interval::Minutes(60));
    }

    #[test]
    fn unknown_strategy_is_unsupported() {
        let err = create_strategy("turtle", context(), &StrategyParams::new()).unwrap_err();
        match err {
            BacktestError::UnsupportedStrategy { name, supported } => {
                assert_eq!(name, "turtle");
                assert_eq!(supported, "bollinger_rsi, ma_crossover");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn params_override_defaults() {
        let params = StrategyParams::new()
            .with("short_period", 5.0)
            .with("long_period", 20.0);
        let s = create_strategy("ma_crossover", context(), &params).unwrap();
        assert_eq!(s.minimum_lookback(), 25);
    }

    #[test]
    fn unknown_param_key_is_rejected() {
        let params = StrategyParams::new().with("rsi_period", 7.0);
        let err = create_strategy("ma_crossover", context(), &params).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidParameter { ref name, .. } if name == "rsi_period"));
    }

    #[test]
    fn parameter_keys_by_name() {
        let keys = parameter_keys("ma_crossover").unwrap();
        assert_eq!(keys, &["short_period", "long_period", "warmup_margin"]);
        assert_eq!(parameter_keys("bollinger_rsi").unwrap().len(), 13);
        assert!(parameter_keys("turtle").is_none());
    }

    #[test]
    fn parse_assignment() {
        let mut params = StrategyParams::new();
        params.parse_assignment("bb_std = 2.5").unwrap();
        assert_eq!(params.get("bb_std"), Some(2.5));
        assert!(params.parse_assignment("bb_std").is_err());
        assert!(params.parse_assignment("bb_std=wide").is_err());
    }

    #[test]
    fn period_must_be_whole() {
        let params = StrategyParams::new().with("p", 2.5).with("q", 0.0);
        assert!(params.period("p", 1).is_err());
        assert!(params.period("q", 1).is_err());
        assert_eq!(params.period("missing", 7).unwrap(), 7);
        assert_eq!(params.count("q", 3).unwrap(), 0);
    }

    #[test]
    fn period_and_count_are_bounded() {
        let params = StrategyParams::new()
            .with("at_max", MAX_PERIOD as f64)
            .with("over", MAX_PERIOD as f64 + 1.0)
            .with("huge", 1e30);
        assert_eq!(params.period("at_max", 1).unwrap(), MAX_PERIOD);
        assert!(params.period("over", 1).is_err());
        assert!(params.period("huge", 1).is_err());
        assert!(params.count("huge", 0).is_err());
    }

    #[test]
    fn oversized_periods_are_rejected_at_creation() {
        for (name, key) in [
            ("ma_crossover", "long_period"),
            ("ma_crossover", "warmup_margin"),
            ("bollinger_rsi", "macd_slow"),
            ("bollinger_rsi", "warmup_margin"),
        ] {
            let params = StrategyParams::new().with(key, 1e30);
            let err = create_strategy(name, context(), &params).unwrap_err();
            assert!(
                matches!(err, BacktestError::InvalidParameter { name: ref n, .. } if n == key),
                "{name}/{key}: {err:?}"
            );
        }
    }
}
