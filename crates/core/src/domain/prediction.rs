use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const COL_DATE: &str = "DATE";
pub const COL_SYMBOL: &str = "SYMBOL";
pub const COL_ACTUAL_CLOSE: &str = "NEXT_DAY_CLOSE";
pub const COL_PREDICTED_CLOSE: &str = "PREDICTED_CLOSE";

/// Column order of the raw table, matching the warehouse projection.
pub const COLUMNS: [&str; 4] = [COL_DATE, COL_SYMBOL, COL_ACTUAL_CLOSE, COL_PREDICTED_CLOSE];

/// One row of `PREDICTED_PRICES`. Serialized with the warehouse column names so the raw table
/// handed to a front end carries the same headers the warehouse does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(rename = "DATE")]
    pub date: NaiveDate,
    #[serde(rename = "SYMBOL")]
    pub symbol: String,
    /// Realized next-day close. Unknown for the most recent date until the market settles it.
    #[serde(rename = "NEXT_DAY_CLOSE", default)]
    pub actual_close: Option<f64>,
    #[serde(rename = "PREDICTED_CLOSE")]
    pub predicted_close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateBounds {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

impl DateBounds {
    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.min_date, self.max_date)
    }
}

/// Current state of the dashboard controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
