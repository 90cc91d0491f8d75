//! Performance metrics reduced from the ledger and trade log.

use super::backtest::{LedgerEntry, TradeRecord, TradeType};

const DAYS_PER_YEAR: f64 = 365.0;

/// Ceiling for the annualized return. Compounding a large gain over a few
/// days overflows `f64`; the result is clamped here instead.
pub const MAX_ANNUALIZED_RETURN_PCT: f64 = 1e12;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
}

/// One buy and every exit that followed it before the next buy.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePairing {
    pub entry_value: f64,
    pub exit_value: f64,
    pub exits: usize,
}

impl TradePairing {
    pub fn profit(&self) -> f64 {
        self.exit_value - self.entry_value
    }

    pub fn is_win(&self) -> bool {
        self.profit() > 0.0
    }
}

impl Metrics {
    pub fn compute(
        ledger: &[LedgerEntry],
        trades: &[TradeRecord],
        initial_capital: f64,
        elapsed_days: i64,
    ) -> Self {
        let final_value = ledger
            .last()
            .map(|e| e.portfolio_value)
            .unwrap_or(initial_capital);

        let total_return_pct = if initial_capital > 0.0 {
            (final_value / initial_capital - 1.0) * 100.0
        } else {
            0.0
        };

        let annualized_return_pct = annualized_return_pct(total_return_pct, elapsed_days);
        let max_drawdown_pct = max_drawdown_pct(ledger.iter().map(|e| e.portfolio_value));

        let pairings = pair_trades(trades);
        let winning_trades = pairings.iter().filter(|p| p.is_win()).count();
        let losing_trades = pairings.len() - winning_trades;
        let total_trades = winning_trades + losing_trades;
        let win_rate_pct = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        Metrics {
            final_value,
            total_return_pct,
            annualized_return_pct,
            max_drawdown_pct,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate_pct,
        }
    }
}

/// Compound `total_return_pct` over a 365-day year. Zero when no time
/// elapsed or the return is not a number; capped at
/// [`MAX_ANNUALIZED_RETURN_PCT`].
pub fn annualized_return_pct(total_return_pct: f64, elapsed_days: i64) -> f64 {
    if elapsed_days <= 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return_pct / 100.0;
    let annualized = (growth.powf(DAYS_PER_YEAR / elapsed_days as f64) - 1.0) * 100.0;
    if annualized.is_nan() {
        0.0
    } else {
        annualized.min(MAX_ANNUALIZED_RETURN_PCT)
    }
}

/// Largest peak-to-trough decline in percent of the running peak.
pub fn max_drawdown_pct(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut values = values.into_iter();
    let Some(mut peak) = values.next() else {
        return 0.0;
    };

    let mut max_dd = 0.0_f64;
    for value in values {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            let dd = (peak - value) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Group each buy with the exits that follow it up to the next buy.
/// A buy with no exits is not scored.
pub fn pair_trades(trades: &[TradeRecord]) -> Vec<TradePairing> {
    let mut pairings = Vec::new();
    let mut open: Option<TradePairing> = None;

    for trade in trades {
        match trade.trade_type {
            TradeType::Buy => {
                if let Some(done) = open.take().filter(|p| p.exits > 0) {
                    pairings.push(done);
                }
                open = Some(TradePairing {
                    entry_value: trade.value,
                    exit_value: 0.0,
                    exits: 0,
                });
            }
            TradeType::Sell | TradeType::PartialSell => {
                if let Some(pairing) = open.as_mut() {
                    pairing.exit_value += trade.value;
                    pairing.exits += 1;
                }
            }
        }
    }
    if let Some(done) = open.filter(|p| p.exits > 0) {
        pairings.push(done);
    }
    pairings
}
