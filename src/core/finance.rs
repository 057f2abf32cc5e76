//! Price and return tables for a list of tickers.

use crate::core::frame::{Frame, PriceTable, ReturnTable};
use crate::core::frequency::Frequency;
use crate::core::price::{ADJUSTED_CLOSE, DatasetQuery, MarketDataProvider};
use crate::providers::csv_file::PriceFile;
use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the prices of a request come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Query the market data provider once per ticker, forwarding `filters`.
    Provider { filters: BTreeMap<String, String> },
    /// Read every ticker as a column of the CSV file at `root`.
    File { root: PathBuf },
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Provider {
            filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub freq: Frequency,
    pub source: DataSource,
}

impl PriceRequest {
    pub fn new<S: AsRef<str>>(tickers: &[S]) -> Self {
        PriceRequest {
            tickers: tickers.iter().map(|t| t.as_ref().to_string()).collect(),
            start_date: None,
            end_date: None,
            freq: Frequency::default(),
            source: DataSource::default(),
        }
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    pub fn freq(mut self, freq: Frequency) -> Self {
        self.freq = freq;
        self
    }

    pub fn source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    fn query(&self, filters: &BTreeMap<String, String>) -> DatasetQuery {
        DatasetQuery {
            start_date: self.start_date,
            end_date: self.end_date,
            filters: filters.clone(),
        }
    }
}

/// Builds aligned price and return tables from a provider or a CSV file.
///
/// Tables are built from scratch on every call. Tickers are fetched one at a
/// time in request order, and the first failure aborts the call.
pub struct Finance {
    provider: Option<Arc<dyn MarketDataProvider>>,
    price_column: String,
}

impl Finance {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Finance {
            provider: Some(provider),
            price_column: ADJUSTED_CLOSE.to_string(),
        }
    }

    /// An accessor without a provider; only `DataSource::File` requests succeed.
    pub fn offline() -> Self {
        Finance {
            provider: None,
            price_column: ADJUSTED_CLOSE.to_string(),
        }
    }

    /// Overrides the provider column read as the price.
    pub fn with_price_column(mut self, column: &str) -> Self {
        self.price_column = column.to_string();
        self
    }

    /// Fetches the full provider record for one ticker.
    pub async fn fetch(&self, ticker: &str, query: &DatasetQuery) -> Result<Frame> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| anyhow!("No market data provider configured"))?;
        provider
            .fetch_dataset(ticker, query)
            .await
            .with_context(|| format!("Failed to fetch prices for {ticker}"))
    }

    /// Builds the price table for `request`.
    pub async fn prices(&self, request: &PriceRequest) -> Result<PriceTable> {
        self.prices_with_progress(request, &|| ()).await
    }

    /// Same as [`Finance::prices`], calling `update_callback` after each ticker is loaded.
    pub async fn prices_with_progress(
        &self,
        request: &PriceRequest,
        update_callback: &(dyn Fn() + Send + Sync),
    ) -> Result<PriceTable> {
        info!(
            tickers = request.tickers.len(),
            freq = %request.freq,
            "Building price table"
        );

        let table = match &request.source {
            DataSource::Provider { filters } => {
                let query = request.query(filters);
                let mut series = Vec::with_capacity(request.tickers.len());
                for ticker in &request.tickers {
                    let mut column = self
                        .fetch(ticker, &query)
                        .await?
                        .series(&self.price_column)
                        .with_context(|| format!("No price column for {ticker}"))?;
                    column.name = ticker.clone();
                    series.push(column);
                    update_callback();
                }
                Frame::from_series(series)
            }
            DataSource::File { root } => {
                let file = PriceFile::open(root)?;
                let mut series = Vec::with_capacity(request.tickers.len());
                for ticker in &request.tickers {
                    series.push(file.series(ticker)?);
                    update_callback();
                }
                Frame::from_series(series).truncate(request.start_date, request.end_date)
            }
        };

        debug!(rows = table.len(), "Assembled price table");
        table.sort_index().resample_last(request.freq)
    }

    /// Builds the return table for `request`: one fewer row than its price table.
    pub async fn returns(&self, request: &PriceRequest) -> Result<ReturnTable> {
        Ok(self.prices(request).await?.returns())
    }
}
