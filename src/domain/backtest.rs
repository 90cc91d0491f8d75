//! Backtest engine and step loop.
//!
//! The engine replays a [`Series`] bar by bar. At each bar from the
//! strategy's minimum lookback onward it hands the strategy the visible
//! prefix and a copy of the current position, applies the returned signal to
//! the [`Account`], and appends one [`LedgerEntry`]. Executed signals also
//! append a [`TradeRecord`]. After the loop the ledger and trade log are
//! reduced into [`Metrics`].

use std::fmt;
use std::ops::ControlFlow;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::candle::{DateRange, Series};
use super::error::BacktestError;
use super::metrics::Metrics;
use super::position::{EntryContext, PositionState, PositionView};
use super::signal::Signal;
use super::sizing::SizingPolicy;
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub sizing: SizingPolicy,
    /// Requested range; its length drives the annualized return.
    pub date_range: Option<DateRange>,
}

impl BacktestConfig {
    pub fn new(initial_capital: f64) -> Self {
        BacktestConfig {
            initial_capital,
            sizing: SizingPolicy::default(),
            date_range: None,
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::invalid_parameter(
                "initial_capital",
                format!("must be positive and finite, got {}", self.initial_capital),
            ));
        }
        self.sizing.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
    PartialSell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
            TradeType::PartialSell => "partial_sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub trade_type: TradeType,
    pub price: f64,
    /// Asset units.
    pub amount: f64,
    /// Cash units.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub capital: f64,
    pub position: f64,
    pub signal: Signal,
    pub portfolio_value: f64,
}

/// Cash, asset quantity and entry context at one point of the replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Account {
    pub capital: f64,
    pub position: f64,
    pub entry: EntryContext,
}

impl Account {
    pub fn new(capital: f64) -> Self {
        Account {
            capital,
            position: 0.0,
            entry: EntryContext::default(),
        }
    }

    pub fn view(&self) -> PositionView {
        PositionView {
            state: PositionState::from_quantity(self.position),
            entry: self.entry,
        }
    }

    pub fn value_at(&self, price: f64) -> f64 {
        self.capital + self.position * price
    }
}

/// Apply `signal` at `price` and return the new account plus the executed
/// trade, if any. Signals that cannot act (buy without cash, exits while
/// flat, `None`) leave the account untouched.
pub fn apply_signal(
    account: Account,
    signal: Signal,
    price: f64,
    timestamp: NaiveDateTime,
    sizing: &SizingPolicy,
) -> (Account, Option<TradeRecord>) {
    let record = |trade_type, amount: f64, value: f64| TradeRecord {
        timestamp,
        trade_type,
        price,
        amount,
        value,
    };

    match signal {
        Signal::Buy if account.capital > 0.0 => {
            let spent = sizing.buy_fraction * account.capital;
            let amount = spent / price;
            let next = Account {
                capital: account.capital - spent,
                position: account.position + amount,
                entry: EntryContext::opened_at(price),
            };
            (next, Some(record(TradeType::Buy, amount, spent)))
        }
        Signal::Sell if account.position > 0.0 => {
            let amount = account.position;
            let value = amount * price;
            let next = Account {
                capital: account.capital + value,
                position: 0.0,
                entry: EntryContext::default(),
            };
            (next, Some(record(TradeType::Sell, amount, value)))
        }
        Signal::PartialSell if account.position > 0.0 => {
            let amount = sizing.partial_ratio * account.position;
            let value = amount * price;
            let position = account.position - amount;
            let entry = if position > 0.0 {
                EntryContext {
                    partial_exit_done: true,
                    ..account.entry
                }
            } else {
                EntryContext::default()
            };
            let next = Account {
                capital: account.capital + value,
                position: position.max(0.0),
                entry,
            };
            (next, Some(record(TradeType::PartialSell, amount, value)))
        }
        _ => (account, None),
    }
}

/// Checkpoint called after every ledger append.
pub trait BarObserver {
    /// `ControlFlow::Break` stops the run with [`BacktestError::Cancelled`].
    fn on_bar(&mut self, bar: usize, entry: &LedgerEntry) -> ControlFlow<()>;
}

/// Observer that never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BarObserver for NoopObserver {
    fn on_bar(&mut self, _bar: usize, _entry: &LedgerEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

impl<F> BarObserver for F
where
    F: FnMut(usize, &LedgerEntry) -> ControlFlow<()>,
{
    fn on_bar(&mut self, bar: usize, entry: &LedgerEntry) -> ControlFlow<()> {
        self(bar, entry)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub strategy: String,
    pub initial_capital: f64,
    pub final_portfolio_value: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub win_rate_pct: f64,
    pub metrics: Metrics,
    pub trades: Vec<TradeRecord>,
    pub ledger: Vec<LedgerEntry>,
}

pub fn run_backtest(
    series: &Series,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    run_backtest_observed(series, strategy, config, &mut NoopObserver)
}

pub fn run_backtest_observed(
    series: &Series,
    strategy: &dyn Strategy,
    config: &BacktestConfig,
    observer: &mut dyn BarObserver,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let min_lookback = strategy.minimum_lookback();
    if series.len() < min_lookback {
        return Err(BacktestError::InsufficientData {
            bars: series.len(),
            minimum: min_lookback,
        });
    }

    debug!(
        strategy = strategy.name(),
        bars = series.len(),
        min_lookback,
        initial_capital = config.initial_capital,
        "starting backtest"
    );

    let mut account = Account::new(config.initial_capital);
    let mut ledger = Vec::with_capacity(series.len() - min_lookback);
    let mut trades = Vec::new();

    for bar in min_lookback..series.len() {
        let window = series.window(bar);
        let candle = &window[bar];
        let view = account.view();

        let frame = strategy.compute_indicators(window);
        let signal = strategy.compute_signal(window, &frame, &view)?;

        let (next, trade) = apply_signal(
            account,
            signal,
            candle.close,
            candle.timestamp,
            &config.sizing,
        );
        account = next;
        if let Some(trade) = trade {
            info!(
                bar,
                timestamp = %trade.timestamp,
                side = %trade.trade_type,
                price = trade.price,
                amount = trade.amount,
                value = trade.value,
                capital = account.capital,
                "trade executed"
            );
            trades.push(trade);
        }

        let entry = LedgerEntry {
            timestamp: candle.timestamp,
            price: candle.close,
            capital: account.capital,
            position: account.position,
            signal,
            portfolio_value: account.value_at(candle.close),
        };
        let flow = observer.on_bar(bar, &entry);
        ledger.push(entry);
        if flow.is_break() {
            return Err(BacktestError::Cancelled { bar });
        }
    }

    let elapsed_days = config
        .date_range
        .map(|r| r.days())
        .unwrap_or_else(|| series.span_days());
    let metrics = Metrics::compute(&ledger, &trades, config.initial_capital, elapsed_days);

    info!(
        strategy = strategy.name(),
        bars = ledger.len(),
        trades = trades.len(),
        final_value = metrics.final_value,
        total_return_pct = metrics.total_return_pct,
        "backtest complete"
    );

    Ok(BacktestResult {
        strategy: strategy.name().to_string(),
        initial_capital: config.initial_capital,
        final_portfolio_value: metrics.final_value,
        total_return_pct: metrics.total_return_pct,
        annualized_return_pct: metrics.annualized_return_pct,
        max_drawdown_pct: metrics.max_drawdown_pct,
        total_trades: metrics.total_trades,
        win_rate_pct: metrics.win_rate_pct,
        metrics,
        trades,
        ledger,
    })
}
