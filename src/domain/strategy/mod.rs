//! Pluggable strategies.
//!
//! A strategy is a pure decision function: it derives an [`IndicatorFrame`]
//! from the visible candle window and turns that frame plus a copied
//! [`PositionView`] into one [`Signal`]. Strategies keep no state between
//! bars; the engine owns the position and entry context.

pub mod bollinger_rsi;
pub mod ma_crossover;
pub mod registry;

pub use bollinger_rsi::{BollingerRsi, BollingerRsiParams};
pub use ma_crossover::{MaCrossover, MaCrossoverParams};
pub use registry::{
    MAX_PERIOD, MarketContext, StrategyParams, create_strategy, parameter_keys,
    supported_strategies,
};

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorFrame;
use crate::domain::position::PositionView;
use crate::domain::signal::Signal;

pub trait Strategy {
    /// Registry identifier.
    fn name(&self) -> &'static str;

    /// Bars required before the first evaluation. Always > 0.
    fn minimum_lookback(&self) -> usize;

    /// Indicators for `window`. Empty when the window is shorter than
    /// [`Strategy::minimum_lookback`].
    fn compute_indicators(&self, window: &[Candle]) -> IndicatorFrame;

    /// Decide the signal for the last candle of `window`.
    ///
    /// Returns `Signal::None` when any required indicator is undefined on
    /// either of the two most recent rows. Fails only on non-finite values.
    fn compute_signal(
        &self,
        window: &[Candle],
        frame: &IndicatorFrame,
        view: &PositionView,
    ) -> Result<Signal, BacktestError>;
}

/// The registered strategy variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    MaCrossover(MaCrossover),
    BollingerRsi(BollingerRsi),
}

impl StrategyKind {
    pub fn context(&self) -> &MarketContext {
        match self {
            StrategyKind::MaCrossover(s) => &s.context,
            StrategyKind::BollingerRsi(s) => &s.context,
        }
    }

    fn inner(&self) -> &dyn Strategy {
        match self {
            StrategyKind::MaCrossover(s) => s,
            StrategyKind::BollingerRsi(s) => s,
        }
    }
}

impl Strategy for StrategyKind {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn minimum_lookback(&self) -> usize {
        self.inner().minimum_lookback()
    }

    fn compute_indicators(&self, window: &[Candle]) -> IndicatorFrame {
        self.inner().compute_indicators(window)
    }

    fn compute_signal(
        &self,
        window: &[Candle],
        frame: &IndicatorFrame,
        view: &PositionView,
    ) -> Result<Signal, BacktestError> {
        self.inner().compute_signal(window, frame, view)
    }
}

/// Reject a non-finite indicator reading for the last bar of `window`.
pub(crate) fn require_finite(
    window: &[Candle],
    label: &str,
    value: f64,
) -> Result<f64, BacktestError> {
    if value.is_finite() {
        return Ok(value);
    }
    let bar = window.len().saturating_sub(1);
    Err(BacktestError::StrategyEvaluation {
        bar,
        timestamp: window.get(bar).map(|c| c.timestamp).unwrap_or_default(),
        reason: format!("{} is not finite ({})", label, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interval::Interval;
    use chrono::NaiveDate;

    fn context() -> MarketContext {
        MarketContext {
            symbol: "KRW-BTC".into(),
            interval: Interval::Day,
        }
    }

    #[test]
    fn kind_delegates_to_variant() {
        let ma = StrategyKind::MaCrossover(
            MaCrossover::new(context(), MaCrossoverParams::default()).unwrap(),
        );
        assert_eq!(ma.name(), "ma_crossover");
        assert_eq!(ma.minimum_lookback(), 35);

        let bb = StrategyKind::BollingerRsi(
            BollingerRsi::new(context(), BollingerRsiParams::default()).unwrap(),
        );
        assert_eq!(bb.name(), "bollinger_rsi");
        assert_eq!(bb.minimum_lookback(), 45);
        assert_eq!(bb.context().symbol, "KRW-BTC");
    }

    #[test]
    fn kind_is_object_safe() {
        let s: Box<dyn Strategy> = Box::new(StrategyKind::MaCrossover(
            MaCrossover::new(context(), MaCrossoverParams::default()).unwrap(),
        ));
        assert!(s.compute_indicators(&[]).is_empty());
    }

    #[test]
    fn non_finite_reading_names_the_bar() {
        let window = vec![Candle {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        }];
        let err = require_finite(&window, "RSI(14)", f64::NAN).unwrap_err();
        assert!(matches!(err, BacktestError::StrategyEvaluation { bar: 0, .. }));
        assert!(require_finite(&window, "RSI(14)", 50.0).is_ok());
    }
}
