//! Core price and return abstractions

pub mod config;
pub mod finance;
pub mod frame;
pub mod frequency;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use finance::{DataSource, Finance, PriceRequest};
pub use frame::{Frame, PriceTable, ReturnTable, Series};
pub use frequency::Frequency;
pub use price::{ADJUSTED_CLOSE, DatasetQuery, MarketDataProvider};
