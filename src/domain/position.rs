//! Position state and the read-only view handed to strategies.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

impl PositionState {
    /// Derive the state from a scalar asset quantity.
    pub fn from_quantity(quantity: f64) -> Self {
        if quantity > 0.0 {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }
}

/// Per-position state kept while a position is open.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EntryContext {
    pub buy_price: Option<f64>,
    pub partial_exit_done: bool,
}

impl EntryContext {
    pub fn opened_at(price: f64) -> Self {
        EntryContext {
            buy_price: Some(price),
            partial_exit_done: false,
        }
    }

    /// Fractional change of `price` relative to the entry price.
    pub fn return_at(&self, price: f64) -> Option<f64> {
        self.buy_price
            .filter(|&bp| bp > 0.0)
            .map(|bp| (price - bp) / bp)
    }
}

/// Copy of the engine's position handed to a strategy for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionView {
    pub state: PositionState,
    pub entry: EntryContext,
}

impl PositionView {
    pub fn flat() -> Self {
        PositionView {
            state: PositionState::Flat,
            entry: EntryContext::default(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.state == PositionState::Long
    }
}
