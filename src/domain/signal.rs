//! Strategy output for one evaluated bar.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Buy,
    Sell,
    PartialSell,
    #[default]
    None,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Buy => "buy",
            Signal::Sell => "sell",
            Signal::PartialSell => "partial_sell",
            Signal::None => "none",
        }
    }

    /// True for the two exit signals.
    pub fn is_exit(&self) -> bool {
        matches!(self, Signal::Sell | Signal::PartialSell)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
