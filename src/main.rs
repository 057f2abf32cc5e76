use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use findata::core::log::init_logging;
use findata::core::{DataSource, Frequency};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct QueryArgs {
    /// Ticker symbols, one output column each
    #[arg(required = true)]
    tickers: Vec<String>,

    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Resample frequency, e.g. B, D, W, M, Q, A
    #[arg(long)]
    freq: Option<Frequency>,

    /// Read prices from this CSV file instead of the provider
    #[arg(long, conflicts_with = "filters")]
    csv: Option<PathBuf>,

    /// Extra provider query parameter, as KEY=VALUE
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

impl From<QueryArgs> for findata::TableQuery {
    fn from(args: QueryArgs) -> findata::TableQuery {
        let source = match args.csv {
            Some(root) => DataSource::File { root },
            None => DataSource::Provider {
                filters: args.filters.into_iter().collect::<BTreeMap<_, _>>(),
            },
        };
        findata::TableQuery {
            tickers: args.tickers,
            start_date: args.start,
            end_date: args.end,
            freq: args.freq,
            source,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the aligned price table
    Prices(QueryArgs),
    /// Display period-over-period returns
    Returns(QueryArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config_path = cli.config_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => findata::cli::setup::setup(),
        Some(Commands::Prices(args)) => {
            findata::run_command(findata::AppCommand::Prices(args.into()), config_path).await
        }
        Some(Commands::Returns(args)) => {
            findata::run_command(findata::AppCommand::Returns(args.into()), config_path).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
