//! Candle source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;

pub trait CandleSource {
    /// The most recent `count` candles for `symbol`, oldest first.
    ///
    /// A source that cannot be reached returns [`BacktestError::Connectivity`].
    fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<Candle>, BacktestError>;
}
