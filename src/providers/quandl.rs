use crate::core::frame::Frame;
use crate::core::price::{DatasetQuery, MarketDataProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://www.quandl.com";
pub const DEFAULT_DATABASE: &str = "WIKI";

/// Dataset provider backed by the Quandl time-series API.
///
/// Each ticker maps to `{database}/{ticker}`. The API key is sent with every
/// request when present; without it requests go out unauthenticated.
pub struct QuandlProvider {
    base_url: String,
    database: String,
    api_key: Option<String>,
}

impl QuandlProvider {
    pub fn new(base_url: &str, database: &str, api_key: Option<String>) -> Self {
        QuandlProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            database: database.to_string(),
            api_key,
        }
    }
}

#[derive(Deserialize, Debug)]
struct DatasetResponse {
    dataset: Dataset,
}

#[derive(Deserialize, Debug)]
struct Dataset {
    column_names: Vec<String>,
    data: Vec<Vec<Value>>,
}

#[derive(Deserialize, Debug)]
struct ErrorResponse {
    quandl_error: QuandlError,
}

#[derive(Deserialize, Debug)]
struct QuandlError {
    code: String,
    message: String,
}

fn into_frame(ticker: &str, dataset: Dataset) -> Result<Frame> {
    let columns: Vec<String> = dataset.column_names.into_iter().skip(1).collect();
    let mut index = Vec::with_capacity(dataset.data.len());
    let mut rows = Vec::with_capacity(dataset.data.len());

    for record in dataset.data {
        let mut cells = record.into_iter();
        let date = cells
            .next()
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| anyhow!("Invalid date in dataset for ticker: {}", ticker))?;
        index.push(date);
        rows.push(cells.map(|v| v.as_f64()).collect());
    }

    Frame::new(columns, index, rows)
        .with_context(|| format!("Malformed dataset for ticker: {}", ticker))
}

#[async_trait]
impl MarketDataProvider for QuandlProvider {
    #[instrument(
        name = "QuandlDatasetFetch",
        skip(self, query),
        fields(ticker = %ticker)
    )]
    async fn fetch_dataset(&self, ticker: &str, query: &DatasetQuery) -> Result<Frame> {
        let url = format!(
            "{}/api/v3/datasets/{}/{}.json",
            self.base_url, self.database, ticker
        );
        debug!("Requesting dataset from {}", url);

        let mut params = query.params();
        if let Some(key) = &self.api_key {
            params.insert(0, ("api_key".to_string(), key.clone()));
        }

        let client = reqwest::Client::builder().user_agent("findata/0.1").build()?;
        let response = client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for ticker: {} URL: {}", e, ticker, url))?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => anyhow!(
                    "Provider error {}: {} for ticker: {}",
                    err.quandl_error.code,
                    err.quandl_error.message,
                    ticker
                ),
                Err(_) => anyhow!("HTTP error: {} for ticker: {}", status, ticker),
            });
        }

        let data: DatasetResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        let frame = into_frame(ticker, data.dataset)?;
        debug!(rows = frame.len(), "Received dataset");
        Ok(frame)
    }
}
