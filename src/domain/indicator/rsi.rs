//! RSI (Relative Strength Index) indicator implementation.
//!
//! Uses Wilder's smoothing for average gain/loss calculation:
//! - First average: simple mean of gains/losses over first n bars
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes to compute initial average).

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let invalid = |c: &Candle| IndicatorPoint {
        timestamp: c.timestamp,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    };

    if period == 0 || candles.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: candles.iter().map(invalid).collect(),
        };
    }

    let mut values = Vec::with_capacity(candles.len());
    values.push(invalid(&candles[0]));

    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for (i, candle) in candles.iter().enumerate().skip(1) {
        let change = candle.close - candles[i - 1].close;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i < period {
            gain_sum += gain;
            loss_sum += loss;
            values.push(invalid(candle));
            continue;
        }

        if i == period {
            avg_gain = (gain_sum + gain) / period as f64;
            avg_loss = (loss_sum + loss) / period as f64;
        } else {
            avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        }

        values.push(IndicatorPoint {
            timestamp: candle.timestamp,
            valid: true,
            value: IndicatorValue::Simple(rsi_from(avg_gain, avg_loss)),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn make_candles(prices: &[f64]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn rsi_at(series: &IndicatorSeries, i: usize) -> f64 {
        match series.values[i].value {
            IndicatorValue::Simple(v) => v,
            _ => panic!("Expected Simple value"),
        }
    }

    #[test]
    fn rsi_empty_and_single() {
        assert!(calculate_rsi(&[], 14).values.is_empty());

        let series = calculate_rsi(&make_candles(&[100.0]), 14);
        assert_eq!(series.values.len(), 1);
        assert!(!series.values[0].valid);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_candles(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_no_losses() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_candles(&prices), 14);
        assert!((rsi_at(&series, 14) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_no_gains() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_candles(&prices), 14);
        assert!(rsi_at(&series, 14).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_matches_wilder_smoothing() {
        // period 2: changes +2, -1, +3
        let series = calculate_rsi(&make_candles(&[10.0, 12.0, 11.0, 14.0]), 2);

        let (g1, l1) = (1.0, 0.5);
        assert!((rsi_at(&series, 2) - (100.0 - 100.0 / (1.0 + g1 / l1))).abs() < 1e-12);

        let (g2, l2) = ((g1 + 3.0) / 2.0, (l1 + 0.0) / 2.0);
        assert!((rsi_at(&series, 3) - (100.0 - 100.0 / (1.0 + g2 / l2))).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_candles(&prices), 14);

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Simple(rsi) = point.value {
                assert!((0.0..=100.0).contains(&rsi), "RSI {} out of range", rsi);
            }
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_candles(&[100.0, 101.0]), 0);
        assert_eq!(series.values.len(), 2);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
