//! Core domain types and logic.

pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod interval;
pub mod metrics;
pub mod mock_data;
pub mod position;
pub mod series_loader;
pub mod signal;
pub mod sizing;
pub mod strategy;
