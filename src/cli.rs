//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvCandleSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, run_backtest};
use crate::domain::candle::DateRange;
use crate::domain::config_validation::{
    RunSettings, parse_date, settings_from_config, validate_settings,
};
use crate::domain::error::BacktestError;
use crate::domain::interval::Interval;
use crate::domain::series_loader::{LoadedSeries, SeriesRequest, load_series};
use crate::domain::strategy::{
    MarketContext, Strategy, StrategyParams, create_strategy, parameter_keys,
    supported_strategies,
};
use crate::ports::candle_port::CandleSource;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Backtest trading strategies over candle series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest(BacktestArgs),
    /// List registered strategies and their parameters
    Strategies,
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct BacktestArgs {
    /// INI configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Strategy identifier
    #[arg(short, long)]
    pub strategy: Option<String>,
    #[arg(long)]
    pub symbol: Option<String>,
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,
    /// Candle interval: minute1..minute240, day, week, month
    #[arg(short, long)]
    pub interval: Option<String>,
    /// Initial capital
    #[arg(short, long)]
    pub amount: Option<f64>,
    /// Directory holding <symbol>_<interval>.csv files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Seed for synthetic candles
    #[arg(long)]
    pub seed: Option<u64>,
    /// Strategy parameter override
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
    /// Print every executed trade
    #[arg(long)]
    pub show_trades: bool,
}

/// A finished run and where its candles came from.
#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub loaded: LoadedSeries,
    pub result: BacktestResult,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest(args) => run_backtest_command(&args),
        Command::Strategies => run_strategies(),
        Command::Validate { config } => run_validate(&config),
    }
}

fn report(err: &BacktestError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Merge the optional config file with command-line overrides.
pub fn resolve_settings(args: &BacktestArgs) -> Result<RunSettings, BacktestError> {
    let mut settings = match &args.config {
        Some(path) => settings_from_config(&FileConfigAdapter::from_file(path)?)?,
        None => RunSettings::default(),
    };

    if let Some(strategy) = &args.strategy {
        settings.strategy = strategy.clone();
    }
    if let Some(symbol) = &args.symbol {
        settings.symbol = symbol.clone();
    }
    let start = match &args.start {
        Some(raw) => parse_cli_date("start", raw)?,
        None => settings.date_range.start,
    };
    let end = match &args.end {
        Some(raw) => parse_cli_date("end", raw)?,
        None => settings.date_range.end,
    };
    settings.date_range = DateRange::new(start, end);
    if let Some(interval) = &args.interval {
        settings.interval = interval.parse::<Interval>()?;
    }
    if let Some(amount) = args.amount {
        settings.initial_capital = amount;
    }
    if let Some(dir) = &args.data_dir {
        settings.data_dir = Some(dir.clone());
    }
    if let Some(seed) = args.seed {
        settings.mock.seed = seed;
    }
    for assignment in &args.params {
        settings.params.parse_assignment(assignment)?;
    }

    validate_settings(&settings)?;
    Ok(settings)
}

fn parse_cli_date(name: &str, raw: &str) -> Result<chrono::NaiveDate, BacktestError> {
    parse_date(raw).ok_or_else(|| {
        BacktestError::invalid_parameter(name, format!("expected YYYY-MM-DD, got '{}'", raw))
    })
}

/// Resolve the strategy, load candles and replay them.
pub fn execute(settings: &RunSettings) -> Result<BacktestRun, BacktestError> {
    let strategy = create_strategy(&settings.strategy, settings.market(), &settings.params)?;

    let source = settings.data_dir.clone().map(CsvCandleSource::new);
    let request = SeriesRequest {
        symbol: settings.symbol.clone(),
        interval: settings.interval,
        date_range: settings.date_range,
        candle_count: settings.candle_count,
    };
    let loaded = load_series(
        source.as_ref().map(|s| s as &dyn CandleSource),
        &request,
        &settings.mock,
    )?;

    let config = BacktestConfig {
        initial_capital: settings.initial_capital,
        sizing: settings.sizing,
        date_range: Some(settings.date_range),
    };
    let result = run_backtest(&loaded.series, &strategy, &config)?;
    Ok(BacktestRun { loaded, result })
}

pub fn format_summary(settings: &RunSettings, run: &BacktestRun, show_trades: bool) -> String {
    let r = &run.result;
    let mut out = String::new();
    let _ = writeln!(out, "=== Backtest Results ===");
    let _ = writeln!(out, "Strategy:         {}", r.strategy);
    let _ = writeln!(
        out,
        "Market:           {} ({})",
        settings.symbol, settings.interval
    );
    let _ = writeln!(
        out,
        "Period:           {} to {}",
        settings.date_range.start, settings.date_range.end
    );
    let _ = writeln!(
        out,
        "Data:             {} bars ({})",
        run.loaded.series.len(),
        run.loaded.origin
    );
    let _ = writeln!(out, "Initial Capital:  {:.2}", r.initial_capital);
    let _ = writeln!(out, "Final Value:      {:.2}", r.final_portfolio_value);
    let _ = writeln!(out, "Total Return:     {:.2}%", r.total_return_pct);
    let _ = writeln!(out, "Annualized:       {:.2}%", r.annualized_return_pct);
    let _ = writeln!(out, "Max Drawdown:     -{:.2}%", r.max_drawdown_pct);
    let _ = writeln!(
        out,
        "Total Trades:     {} ({} won, {} lost)",
        r.total_trades, r.metrics.winning_trades, r.metrics.losing_trades
    );
    let _ = writeln!(out, "Win Rate:         {:.2}%", r.win_rate_pct);

    if show_trades && !r.trades.is_empty() {
        let _ = writeln!(out, "\n=== Trades ===");
        for t in &r.trades {
            let _ = writeln!(
                out,
                "  {}  {:<12}  price {:.2}  amount {:.8}  value {:.2}",
                t.timestamp, t.trade_type, t.price, t.amount, t.value
            );
        }
    }
    out
}

fn run_backtest_command(args: &BacktestArgs) -> ExitCode {
    let settings = match resolve_settings(args) {
        Ok(s) => s,
        Err(e) => return report(&e),
    };
    match execute(&settings) {
        Ok(run) => {
            print!("{}", format_summary(&settings, &run, args.show_trades));
            ExitCode::SUCCESS
        }
        Err(e) => report(&e),
    }
}

fn run_strategies() -> ExitCode {
    let context = MarketContext {
        symbol: String::new(),
        interval: Interval::Day,
    };
    for name in supported_strategies() {
        let lookback = match create_strategy(name, context.clone(), &StrategyParams::new()) {
            Ok(s) => s.minimum_lookback(),
            Err(e) => return report(&e),
        };
        let keys = parameter_keys(name).unwrap_or_default();
        println!("{name}");
        println!("  minimum lookback: {lookback} bars");
        println!("  parameters:       {}", keys.join(", "));
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let settings = match FileConfigAdapter::from_file(config_path)
        .and_then(|adapter| settings_from_config(&adapter))
    {
        Ok(s) => s,
        Err(e) => return report(&e),
    };
    if let Err(e) = validate_settings(&settings) {
        return report(&e);
    }
    println!(
        "Configuration is valid: {} on {} ({}), {} to {}",
        settings.strategy,
        settings.symbol,
        settings.interval,
        settings.date_range.start,
        settings.date_range.end
    );
    ExitCode::SUCCESS
}
