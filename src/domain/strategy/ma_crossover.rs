//! Moving-average crossover.
//!
//! Buy on a golden cross (short SMA moves from at-or-below to above the long
//! SMA), sell on a dead cross (from at-or-above to below). No partial exits.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::indicator::{
    IndicatorFrame, IndicatorPoint, IndicatorType, Source, calculate_sma, simple_value,
};
use crate::domain::position::PositionView;
use crate::domain::signal::Signal;
use crate::domain::strategy::{MarketContext, Strategy, StrategyParams, require_finite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaCrossoverParams {
    pub short_period: usize,
    pub long_period: usize,
    pub warmup_margin: usize,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        MaCrossoverParams {
            short_period: 10,
            long_period: 30,
            warmup_margin: 5,
        }
    }
}

impl MaCrossoverParams {
    pub const KEYS: [&'static str; 3] = ["short_period", "long_period", "warmup_margin"];

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        params.check_keys(&Self::KEYS)?;
        let defaults = Self::default();
        Ok(MaCrossoverParams {
            short_period: params.period("short_period", defaults.short_period)?,
            long_period: params.period("long_period", defaults.long_period)?,
            warmup_margin: params.count("warmup_margin", defaults.warmup_margin)?,
        })
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.short_period == 0 {
            return Err(BacktestError::invalid_parameter(
                "short_period",
                "must be at least 1",
            ));
        }
        if self.short_period >= self.long_period {
            return Err(BacktestError::invalid_parameter(
                "short_period",
                format!(
                    "must be less than long_period ({} >= {})",
                    self.short_period, self.long_period
                ),
            ));
        }
        Ok(())
    }

    fn short_sma(&self) -> IndicatorType {
        IndicatorType::Sma {
            period: self.short_period,
            source: Source::Close,
        }
    }

    fn long_sma(&self) -> IndicatorType {
        IndicatorType::Sma {
            period: self.long_period,
            source: Source::Close,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaCrossover {
    pub context: MarketContext,
    pub params: MaCrossoverParams,
}

impl MaCrossover {
    pub const NAME: &'static str = "ma_crossover";

    pub fn new(context: MarketContext, params: MaCrossoverParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(MaCrossover { context, params })
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn minimum_lookback(&self) -> usize {
        self.params
            .long_period
            .saturating_add(self.params.warmup_margin)
    }

    fn compute_indicators(&self, window: &[Candle]) -> IndicatorFrame {
        let mut frame = IndicatorFrame::new();
        if window.len() < self.minimum_lookback() {
            return frame;
        }
        frame.insert(calculate_sma(window, self.params.short_period, Source::Close));
        frame.insert(calculate_sma(window, self.params.long_period, Source::Close));
        frame
    }

    fn compute_signal(
        &self,
        window: &[Candle],
        frame: &IndicatorFrame,
        _view: &PositionView,
    ) -> Result<Signal, BacktestError> {
        let short_type = self.params.short_sma();
        let long_type = self.params.long_sma();
        let (Some((short_prev, short_curr)), Some((long_prev, long_curr))) = (
            frame.get(&short_type).and_then(|s| s.last_two()),
            frame.get(&long_type).and_then(|s| s.last_two()),
        ) else {
            return Ok(Signal::None);
        };

        let short_label = short_type.to_string();
        let long_label = long_type.to_string();
        let read = |label: &str, point: &IndicatorPoint| {
            require_finite(window, label, simple_value(point).unwrap_or(f64::NAN))
        };
        let short_prev = read(&short_label, short_prev)?;
        let short_curr = read(&short_label, short_curr)?;
        let long_prev = read(&long_label, long_prev)?;
        let long_curr = read(&long_label, long_curr)?;

        if short_prev <= long_prev && short_curr > long_curr {
            Ok(Signal::Buy)
        } else if short_prev >= long_prev && short_curr < long_curr {
            Ok(Signal::Sell)
        } else {
            Ok(Signal::None)
        }
    }
}
