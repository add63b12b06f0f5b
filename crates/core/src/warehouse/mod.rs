pub mod memory;
pub mod postgres;

use crate::domain::prediction::{DateBounds, PricePoint};
use chrono::NaiveDate;
use std::fmt;

/// Read-only access to the predicted-prices table.
#[async_trait::async_trait]
pub trait PredictionSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Rows for `symbol` with `start <= date <= end`, ascending by date.
    async fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PricePoint>>;

    async fn distinct_symbols(&self) -> anyhow::Result<Vec<String>>;

    /// `None` when the table is empty.
    async fn date_extent(&self) -> anyhow::Result<Option<DateBounds>>;
}

/// Rejected query input. Carried inside `anyhow::Error`; callers branch on it via
/// `downcast_ref`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    EmptySymbol,
    UnknownSymbol(String),
    InvertedRange { start: NaiveDate, end: NaiveDate },
    InvalidDate(String),
    NoData,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::EmptySymbol => write!(f, "symbol must be non-empty"),
            QueryError::UnknownSymbol(symbol) => write!(f, "unknown symbol: {symbol}"),
            QueryError::InvertedRange { start, end } => {
                write!(f, "start date {start} is after end date {end}")
            }
            QueryError::InvalidDate(raw) => write!(f, "invalid date: {raw}"),
            QueryError::NoData => write!(f, "the predictions table has no rows"),
        }
    }
}

impl std::error::Error for QueryError {}
