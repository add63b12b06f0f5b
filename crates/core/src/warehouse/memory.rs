use crate::domain::prediction::{DateBounds, PricePoint};
use crate::warehouse::PredictionSource;
use anyhow::Context;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Predictions held in memory: a JSON dump of the table for offline runs, or fixed rows in tests.
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: Vec<PricePoint>,
    range_calls: AtomicUsize,
}

impl InMemorySource {
    pub fn new(rows: Vec<PricePoint>) -> Self {
        Self {
            rows,
            range_calls: AtomicUsize::new(0),
        }
    }

    /// Reads a JSON array of rows keyed by the warehouse column names.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {}", path.display()))?;
        let rows = serde_json::from_str::<Vec<PricePoint>>(&text)
            .with_context(|| format!("fixture {} is not a JSON array of rows", path.display()))?;
        for row in &rows {
            anyhow::ensure!(
                !row.symbol.trim().is_empty(),
                "fixture row on {} has an empty symbol",
                row.date
            );
        }
        Ok(Self::new(rows))
    }

    /// Number of `fetch_range` calls served so far.
    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl PredictionSource for InMemorySource {
    fn source_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch_range(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<PricePoint>> {
        self.range_calls.fetch_add(1, Ordering::Relaxed);
        let mut out: Vec<PricePoint> = self
            .rows
            .iter()
            .filter(|p| p.symbol == symbol && start <= p.date && p.date <= end)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.date);
        Ok(out)
    }

    async fn distinct_symbols(&self) -> anyhow::Result<Vec<String>> {
        let set: BTreeSet<&str> = self.rows.iter().map(|p| p.symbol.as_str()).collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    async fn date_extent(&self) -> anyhow::Result<Option<DateBounds>> {
        let min_date = self.rows.iter().map(|p| p.date).min();
        let max_date = self.rows.iter().map(|p| p.date).max();
        Ok(min_date
            .zip(max_date)
            .map(|(min_date, max_date)| DateBounds { min_date, max_date }))
    }
}
