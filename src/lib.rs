pub mod cli;
pub mod core;
pub mod providers;

use crate::cli::tables::TableKind;
use crate::core::config::AppConfig;
use crate::core::{DataSource, Finance, Frequency, PriceRequest};
use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

/// Arguments shared by the table commands. A missing `freq` falls back to the config.
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub freq: Option<Frequency>,
    pub source: DataSource,
}

impl TableQuery {
    pub fn into_request(self, default_freq: Frequency) -> PriceRequest {
        PriceRequest {
            tickers: self.tickers,
            start_date: self.start_date,
            end_date: self.end_date,
            freq: self.freq.unwrap_or(default_freq),
            source: self.source,
        }
    }
}

pub enum AppCommand {
    Prices(TableQuery),
    Returns(TableQuery),
}

/// Builds the accessor described by `config`.
///
/// The API key is resolved here, once, and handed to the provider.
pub fn build_finance(config: &AppConfig) -> Finance {
    let quandl = &config.providers.quandl;
    let provider = providers::quandl::QuandlProvider::new(
        &quandl.base_url,
        &quandl.database,
        quandl.resolve_api_key(),
    );
    Finance::new(Arc::new(provider)).with_price_column(&config.price_column)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("findata starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.providers.quandl.base_url,
        database = %config.providers.quandl.database,
        price_column = %config.price_column,
        frequency = %config.frequency,
        "Loaded config"
    );

    let finance = build_finance(&config);

    let (query, kind) = match command {
        AppCommand::Prices(query) => (query, TableKind::Prices),
        AppCommand::Returns(query) => (query, TableKind::Returns),
    };
    let request = query.into_request(config.frequency);
    cli::tables::run(&finance, &request, kind).await
}
