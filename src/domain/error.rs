//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unsupported strategy: {name} (supported: {supported})")]
    UnsupportedStrategy { name: String, supported: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("unsupported interval: {0}")]
    InvalidInterval(String),

    #[error("empty series: {context}")]
    EmptyData { context: String },

    #[error("malformed series: {reason}")]
    MalformedData { reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("data source unavailable: {reason}")]
    Connectivity { reason: String },

    #[error("strategy evaluation failed at bar {bar} ({timestamp}): {reason}")]
    StrategyEvaluation {
        bar: usize,
        timestamp: NaiveDateTime,
        reason: String,
    },

    #[error("backtest cancelled after bar {bar}")]
    Cancelled { bar: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        BacktestError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        BacktestError::MalformedData {
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::UnsupportedStrategy { .. }
            | BacktestError::InvalidParameter { .. }
            | BacktestError::InvalidInterval(_) => 3,
            BacktestError::EmptyData { .. }
            | BacktestError::MalformedData { .. }
            | BacktestError::InsufficientData { .. }
            | BacktestError::Connectivity { .. } => 4,
            BacktestError::StrategyEvaluation { .. } | BacktestError::Cancelled { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_strategy_message_lists_supported() {
        let err = BacktestError::UnsupportedStrategy {
            name: "turtle".into(),
            supported: "bollinger_rsi, ma_crossover".into(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported strategy: turtle (supported: bollinger_rsi, ma_crossover)"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = BacktestError::InsufficientData {
            bars: 10,
            minimum: 35,
        };
        assert_eq!(err.to_string(), "insufficient data: have 10 bars, need 35");
    }

    #[test]
    fn invalid_parameter_helper() {
        let err = BacktestError::invalid_parameter("buy_fraction", "must be in (0, 1]");
        assert!(matches!(err, BacktestError::InvalidParameter { ref name, .. } if name == "buy_fraction"));
    }
}
