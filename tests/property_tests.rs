//! Property tests for ledger and metric invariants.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tradesim::domain::backtest::{Account, TradeType, apply_signal};
use tradesim::domain::candle::DateRange;
use tradesim::domain::interval::Interval;
use tradesim::domain::metrics::{max_drawdown_pct, pair_trades};
use tradesim::domain::mock_data::{MockDataConfig, generate_seeded};
use tradesim::domain::signal::Signal;
use tradesim::domain::sizing::SizingPolicy;

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![
        Just(Signal::Buy),
        Just(Signal::Sell),
        Just(Signal::PartialSell),
        Just(Signal::None),
    ]
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..100_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_sizing() -> impl Strategy<Value = SizingPolicy> {
    (0.05..=1.0_f64, 0.05..=1.0_f64).prop_map(|(buy_fraction, partial_ratio)| SizingPolicy {
        buy_fraction,
        partial_ratio,
    })
}

fn day(offset: usize) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(offset as i64)
}

proptest! {
    /// Capital and position never go negative and cash is conserved.
    #[test]
    fn account_stays_consistent(
        steps in prop::collection::vec((arb_signal(), arb_price()), 1..60),
        sizing in arb_sizing(),
        initial in 1_000.0..10_000_000.0_f64,
    ) {
        let mut account = Account::new(initial);
        let mut spent = 0.0;
        let mut received = 0.0;

        for (i, (signal, price)) in steps.iter().enumerate() {
            let (next, trade) = apply_signal(account, *signal, *price, day(i), &sizing);
            account = next;
            if let Some(t) = trade {
                prop_assert!(t.amount >= 0.0);
                match t.trade_type {
                    TradeType::Buy => spent += t.value,
                    TradeType::Sell | TradeType::PartialSell => received += t.value,
                }
            }
            prop_assert!(account.capital >= 0.0);
            prop_assert!(account.position >= 0.0);
            let value = account.value_at(*price);
            prop_assert!((value - (account.capital + account.position * price)).abs() < 1e-6);
        }

        let expected = initial - spent + received;
        prop_assert!((account.capital - expected).abs() <= 1e-6 * initial.max(1.0));
    }

    /// A full sell always leaves the account flat.
    #[test]
    fn sell_flattens(price in arb_price(), sizing in arb_sizing()) {
        let (long, _) = apply_signal(Account::new(1_000.0), Signal::Buy, price, day(0), &sizing);
        let (flat, trade) = apply_signal(long, Signal::Sell, price, day(1), &sizing);
        prop_assert!(trade.is_some());
        prop_assert_eq!(flat.position, 0.0);
        prop_assert!(!flat.view().is_long());
    }

    #[test]
    fn drawdown_is_a_percentage(values in prop::collection::vec(1.0..1_000_000.0_f64, 1..200)) {
        let dd = max_drawdown_pct(values.iter().copied());
        prop_assert!((0.0..=100.0).contains(&dd));
    }

    #[test]
    fn rising_values_have_no_drawdown(start in 1.0..1_000.0_f64, n in 1usize..100) {
        let values = (0..n).map(|i| start + i as f64);
        prop_assert_eq!(max_drawdown_pct(values), 0.0);
    }

    /// Wins plus losses never exceed the number of completed round trips.
    #[test]
    fn pairing_counts_are_bounded(
        steps in prop::collection::vec((arb_signal(), arb_price()), 1..80),
    ) {
        let sizing = SizingPolicy::default();
        let mut account = Account::new(100_000.0);
        let mut trades = Vec::new();
        for (i, (signal, price)) in steps.iter().enumerate() {
            let (next, trade) = apply_signal(account, *signal, *price, day(i), &sizing);
            account = next;
            trades.extend(trade);
        }
        let buys = trades.iter().filter(|t| t.trade_type == TradeType::Buy).count();
        let pairs = pair_trades(&trades);
        prop_assert!(pairs.len() <= buys);
        for p in &pairs {
            prop_assert!(p.exits > 0);
        }
    }

    /// Same seed, same candles; every candle is well formed.
    #[test]
    fn mock_series_is_deterministic(seed in any::<u64>(), days in 1i64..120) {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let range = DateRange::new(start, start + Duration::days(days - 1));
        let config = MockDataConfig { seed, ..MockDataConfig::default() };

        let a = generate_seeded(&range, Interval::Day, &config).unwrap();
        let b = generate_seeded(&range, Interval::Day, &config).unwrap();
        prop_assert_eq!(a.len(), days as usize);
        prop_assert_eq!(&a, &b);
        for c in a.candles() {
            prop_assert!(c.close > 0.0);
            prop_assert!(c.low <= c.open.min(c.close));
            prop_assert!(c.high >= c.open.max(c.close));
            prop_assert!(c.volume >= 0.0);
        }
    }
}
