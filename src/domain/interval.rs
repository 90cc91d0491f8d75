//! Candle interval identifiers.
//!
//! Intervals use the exchange naming: `minute1` .. `minute240`, `day`,
//! `week`, `month`.

use crate::domain::error::BacktestError;
use std::fmt;
use std::str::FromStr;

pub const MINUTE_STEPS: [u32; 8] = [1, 3, 5, 10, 15, 30, 60, 240];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Minutes(u32),
    Day,
    Week,
    Month,
}

impl FromStr for Interval {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "day" => Ok(Interval::Day),
            "week" => Ok(Interval::Week),
            "month" => Ok(Interval::Month),
            other => {
                let minutes = other
                    .strip_prefix("minute")
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|n| MINUTE_STEPS.contains(n))
                    .ok_or_else(|| BacktestError::InvalidInterval(s.to_string()))?;
                Ok(Interval::Minutes(minutes))
            }
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Minutes(n) => write!(f, "minute{}", n),
            Interval::Day => write!(f, "day"),
            Interval::Week => write!(f, "week"),
            Interval::Month => write!(f, "month"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_calendar_intervals() {
        assert_eq!("day".parse::<Interval>().unwrap(), Interval::Day);
        assert_eq!("Week".parse::<Interval>().unwrap(), Interval::Week);
        assert_eq!("month".parse::<Interval>().unwrap(), Interval::Month);
    }

    #[test]
    fn parse_minute_intervals() {
        assert_eq!(
            "minute60".parse::<Interval>().unwrap(),
            Interval::Minutes(60)
        );
        assert_eq!(
            "minute240".parse::<Interval>().unwrap(),
            Interval::Minutes(240)
        );
    }

    #[test]
    fn reject_unknown_minute_step() {
        assert!(matches!(
            "minute7".parse::<Interval>(),
            Err(BacktestError::InvalidInterval(_))
        ));
        assert!("hour".parse::<Interval>().is_err());
        assert!("minute".parse::<Interval>().is_err());
    }

    #[test]
    fn display_matches_parse() {
        for name in ["minute1", "minute15", "day", "week", "month"] {
            let interval: Interval = name.parse().unwrap();
            assert_eq!(interval.to_string(), name);
        }
    }
}
