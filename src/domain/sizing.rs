//! Position sizing and partial-exit policy.

use crate::domain::error::BacktestError;

pub const DEFAULT_BUY_FRACTION: f64 = 0.3;
pub const DEFAULT_PARTIAL_RATIO: f64 = 0.5;

/// Fraction of available capital spent per buy, and fraction of the held
/// position sold on a partial exit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingPolicy {
    pub buy_fraction: f64,
    pub partial_ratio: f64,
}

impl Default for SizingPolicy {
    fn default() -> Self {
        SizingPolicy {
            buy_fraction: DEFAULT_BUY_FRACTION,
            partial_ratio: DEFAULT_PARTIAL_RATIO,
        }
    }
}

impl SizingPolicy {
    pub fn validate(&self) -> Result<(), BacktestError> {
        check_fraction("buy_fraction", self.buy_fraction)?;
        check_fraction("partial_ratio", self.partial_ratio)
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), BacktestError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(BacktestError::invalid_parameter(
            name,
            format!("must be in (0, 1], got {}", value),
        ))
    }
}
