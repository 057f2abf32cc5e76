//! Market data provider abstractions

use crate::core::frame::Frame;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Column holding closing prices adjusted for splits and dividends.
pub const ADJUSTED_CLOSE: &str = "Adj. Close";

/// Parameters of a single dataset query.
///
/// `filters` are provider specific and forwarded verbatim, after the date bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub filters: BTreeMap<String, String>,
}

impl DatasetQuery {
    /// Query parameters in the order they are sent.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_date {
            params.push(("start_date".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        params.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches the full dataset for `ticker`, one column per provider field.
    async fn fetch_dataset(&self, ticker: &str, query: &DatasetQuery) -> Result<Frame>;
}
