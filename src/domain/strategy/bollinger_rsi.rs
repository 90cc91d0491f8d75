//! Bollinger Bands + RSI mean reversion with staged exits.
//!
//! Entry: RSI oversold, close at or below the lower band, MACD histogram
//! turning up and volume above its average.
//!
//! Exits, checked in order while long:
//! - stop loss: close at least `stop_loss` below the entry price;
//! - second target: `take_profit2` reached after the partial exit;
//! - first target: `take_profit1` reached, sell part of the position;
//! - overbought: RSI overbought and close at the upper band or the band
//!   starting to narrow.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::indicator::bollinger::band_width;
use crate::domain::indicator::{
    IndicatorFrame, IndicatorType, IndicatorValue, Source, calculate_bollinger, calculate_macd,
    calculate_rsi, calculate_sma, simple_value,
};
use crate::domain::position::PositionView;
use crate::domain::signal::Signal;
use crate::domain::strategy::{MarketContext, Strategy, StrategyParams, require_finite};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerRsiParams {
    pub bb_period: usize,
    pub bb_std: f64,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stop_loss: f64,
    pub take_profit1: f64,
    pub take_profit2: f64,
    pub warmup_margin: usize,
}

impl Default for BollingerRsiParams {
    fn default() -> Self {
        BollingerRsiParams {
            bb_period: 20,
            bb_std: 2.0,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_period: 20,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            stop_loss: 0.05,
            take_profit1: 0.10,
            take_profit2: 0.20,
            warmup_margin: 10,
        }
    }
}

impl BollingerRsiParams {
    pub const KEYS: [&'static str; 13] = [
        "bb_period",
        "bb_std",
        "rsi_period",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "volume_period",
        "rsi_oversold",
        "rsi_overbought",
        "stop_loss",
        "take_profit1",
        "take_profit2",
        "warmup_margin",
    ];

    pub fn from_params(params: &StrategyParams) -> Result<Self, BacktestError> {
        params.check_keys(&Self::KEYS)?;
        let d = Self::default();
        Ok(BollingerRsiParams {
            bb_period: params.period("bb_period", d.bb_period)?,
            bb_std: params.number("bb_std", d.bb_std)?,
            rsi_period: params.period("rsi_period", d.rsi_period)?,
            macd_fast: params.period("macd_fast", d.macd_fast)?,
            macd_slow: params.period("macd_slow", d.macd_slow)?,
            macd_signal: params.period("macd_signal", d.macd_signal)?,
            volume_period: params.period("volume_period", d.volume_period)?,
            rsi_oversold: params.number("rsi_oversold", d.rsi_oversold)?,
            rsi_overbought: params.number("rsi_overbought", d.rsi_overbought)?,
            stop_loss: params.number("stop_loss", d.stop_loss)?,
            take_profit1: params.number("take_profit1", d.take_profit1)?,
            take_profit2: params.number("take_profit2", d.take_profit2)?,
            warmup_margin: params.count("warmup_margin", d.warmup_margin)?,
        })
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        let periods = [
            ("bb_period", self.bb_period),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("volume_period", self.volume_period),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(BacktestError::invalid_parameter(name, "must be at least 1"));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(BacktestError::invalid_parameter(
                "macd_fast",
                format!(
                    "must be less than macd_slow ({} >= {})",
                    self.macd_fast, self.macd_slow
                ),
            ));
        }
        if !(self.bb_std > 0.0) {
            return Err(BacktestError::invalid_parameter(
                "bb_std",
                format!("must be positive, got {}", self.bb_std),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(BacktestError::invalid_parameter(
                "rsi_oversold",
                format!(
                    "need 0 <= rsi_oversold < rsi_overbought <= 100, got {} and {}",
                    self.rsi_oversold, self.rsi_overbought
                ),
            ));
        }
        if !(self.stop_loss > 0.0 && self.stop_loss < 1.0) {
            return Err(BacktestError::invalid_parameter(
                "stop_loss",
                format!("must be in (0, 1), got {}", self.stop_loss),
            ));
        }
        if !(self.take_profit1 > 0.0) {
            return Err(BacktestError::invalid_parameter(
                "take_profit1",
                format!("must be positive, got {}", self.take_profit1),
            ));
        }
        if self.take_profit2 < self.take_profit1 {
            return Err(BacktestError::invalid_parameter(
                "take_profit2",
                format!(
                    "must be at least take_profit1 ({} < {})",
                    self.take_profit2, self.take_profit1
                ),
            ));
        }
        Ok(())
    }

    fn bollinger(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.bb_period,
            stddev_mult_x100: (self.bb_std * 100.0).round() as u32,
        }
    }

    fn rsi(&self) -> IndicatorType {
        IndicatorType::Rsi(self.rsi_period)
    }

    fn macd(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.macd_fast,
            slow: self.macd_slow,
            signal: self.macd_signal,
        }
    }

    fn volume_sma(&self) -> IndicatorType {
        IndicatorType::Sma {
            period: self.volume_period,
            source: Source::Volume,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerRsi {
    pub context: MarketContext,
    pub params: BollingerRsiParams,
}

/// Indicator readings for the last bar, all finite.
#[derive(Debug, Clone, Copy)]
struct Readings {
    close: f64,
    volume: f64,
    rsi: f64,
    upper: f64,
    lower: f64,
    width: f64,
    width_prev: f64,
    histogram: f64,
    histogram_prev: f64,
    volume_sma: f64,
}

impl BollingerRsi {
    pub const NAME: &'static str = "bollinger_rsi";

    pub fn new(context: MarketContext, params: BollingerRsiParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(BollingerRsi { context, params })
    }

    fn readings(
        &self,
        window: &[Candle],
        frame: &IndicatorFrame,
    ) -> Result<Option<Readings>, BacktestError> {
        let p = &self.params;
        let (boll_type, rsi_type, macd_type, vol_type) =
            (p.bollinger(), p.rsi(), p.macd(), p.volume_sma());
        let lookup = |t: &IndicatorType| frame.get(t).and_then(|s| s.last_two());

        let (
            Some((boll_prev, boll_curr)),
            Some((_, rsi_curr)),
            Some((macd_prev, macd_curr)),
            Some((_, vol_curr)),
            Some(last),
        ) = (
            lookup(&boll_type),
            lookup(&rsi_type),
            lookup(&macd_type),
            lookup(&vol_type),
            window.last(),
        )
        else {
            return Ok(None);
        };

        let (upper, lower) = match boll_curr.value {
            IndicatorValue::Bollinger { upper, lower, .. } => (upper, lower),
            _ => (f64::NAN, f64::NAN),
        };
        let histogram_of = |v: &IndicatorValue| match *v {
            IndicatorValue::Macd { histogram, .. } => histogram,
            _ => f64::NAN,
        };
        let boll_label = boll_type.to_string();
        let macd_label = macd_type.to_string();

        Ok(Some(Readings {
            close: last.close,
            volume: last.volume,
            rsi: require_finite(
                window,
                &rsi_type.to_string(),
                simple_value(rsi_curr).unwrap_or(f64::NAN),
            )?,
            upper: require_finite(window, &boll_label, upper)?,
            lower: require_finite(window, &boll_label, lower)?,
            width: require_finite(
                window,
                &boll_label,
                band_width(&boll_curr.value).unwrap_or(f64::NAN),
            )?,
            width_prev: require_finite(
                window,
                &boll_label,
                band_width(&boll_prev.value).unwrap_or(f64::NAN),
            )?,
            histogram: require_finite(window, &macd_label, histogram_of(&macd_curr.value))?,
            histogram_prev: require_finite(window, &macd_label, histogram_of(&macd_prev.value))?,
            volume_sma: require_finite(
                window,
                &vol_type.to_string(),
                simple_value(vol_curr).unwrap_or(f64::NAN),
            )?,
        }))
    }
}

impl Strategy for BollingerRsi {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn minimum_lookback(&self) -> usize {
        let p = &self.params;
        p.bb_period
            .max(p.rsi_period)
            .max(p.macd_slow.saturating_add(p.macd_signal))
            .saturating_add(p.warmup_margin)
    }

    fn compute_indicators(&self, window: &[Candle]) -> IndicatorFrame {
        let mut frame = IndicatorFrame::new();
        if window.len() < self.minimum_lookback() {
            return frame;
        }
        let p = &self.params;
        frame.insert(calculate_bollinger(
            window,
            p.bb_period,
            (p.bb_std * 100.0).round() as u32,
        ));
        frame.insert(calculate_rsi(window, p.rsi_period));
        frame.insert(calculate_macd(window, p.macd_fast, p.macd_slow, p.macd_signal));
        frame.insert(calculate_sma(window, p.volume_period, Source::Volume));
        frame
    }

    fn compute_signal(
        &self,
        window: &[Candle],
        frame: &IndicatorFrame,
        view: &PositionView,
    ) -> Result<Signal, BacktestError> {
        if window.len() < self.minimum_lookback() {
            return Ok(Signal::None);
        }
        let Some(r) = self.readings(window, frame)? else {
            return Ok(Signal::None);
        };
        let p = &self.params;

        if view.is_long() {
            if let Some(change) = view.entry.return_at(r.close) {
                let exit = if -change >= p.stop_loss {
                    Some((Signal::Sell, "stop loss"))
                } else if view.entry.partial_exit_done && change >= p.take_profit2 {
                    Some((Signal::Sell, "second take profit"))
                } else if !view.entry.partial_exit_done && change >= p.take_profit1 {
                    Some((Signal::PartialSell, "first take profit"))
                } else {
                    None
                };
                if let Some((signal, reason)) = exit {
                    debug!(
                        symbol = %self.context.symbol,
                        close = r.close,
                        change,
                        reason,
                        "exit triggered"
                    );
                    return Ok(signal);
                }
            }
        }

        let volume_confirmed = r.volume_sma > 0.0 && r.volume / r.volume_sma > 1.0;
        if r.rsi <= p.rsi_oversold
            && r.close <= r.lower
            && r.histogram > r.histogram_prev
            && volume_confirmed
        {
            return Ok(Signal::Buy);
        }

        if view.is_long()
            && r.rsi >= p.rsi_overbought
            && (r.close >= r.upper || r.width < r.width_prev)
        {
            return Ok(Signal::Sell);
        }

        Ok(Signal::None)
    }
}
