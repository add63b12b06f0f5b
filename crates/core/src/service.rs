use crate::cache::TtlCache;
use crate::domain::prediction::{DateBounds, PricePoint};
use crate::time::calendar::IntoCalendarDate;
use crate::warehouse::{PredictionSource, QueryError};
use chrono::NaiveDate;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RangeKey {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
}

/// Validated, cached access to the predictions table.
pub struct PredictionService<S> {
    source: S,
    predictions: TtlCache<RangeKey, Vec<PricePoint>>,
    symbols: TtlCache<(), BTreeSet<String>>,
    bounds: TtlCache<(), Option<DateBounds>>,
}

impl<S: PredictionSource> PredictionService<S> {
    pub fn new(source: S, ttl: chrono::Duration) -> Self {
        Self {
            source,
            predictions: TtlCache::new(ttl),
            symbols: TtlCache::new(ttl),
            bounds: TtlCache::new(ttl),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Rows for `symbol` with `start <= date <= end` (dates truncated from timestamps),
    /// ascending by date with one row per date. An empty result is not an error.
    pub async fn fetch_predictions(
        &self,
        symbol: &str,
        start: impl IntoCalendarDate,
        end: impl IntoCalendarDate,
    ) -> anyhow::Result<Vec<PricePoint>> {
        let start = start.into_calendar_date();
        let end = end.into_calendar_date();

        // Matched exactly against SYMBOL; no case folding or trimming.
        if symbol.trim().is_empty() {
            return Err(QueryError::EmptySymbol.into());
        }
        if start > end {
            return Err(QueryError::InvertedRange { start, end }.into());
        }
        if !self.list_known_symbols().await?.contains(symbol) {
            return Err(QueryError::UnknownSymbol(symbol.to_string()).into());
        }

        let key = RangeKey {
            symbol: symbol.to_string(),
            start,
            end,
        };
        if let Some(rows) = self.predictions.get(&key).await {
            tracing::debug!(%symbol, %start, %end, rows = rows.len(), "predictions cache hit");
            return Ok(rows);
        }

        let t0 = std::time::Instant::now();
        let fetched = self.source.fetch_range(symbol, start, end).await?;
        let fetched_len = fetched.len();
        let rows = conform(fetched, symbol, start, end);
        if rows.len() != fetched_len {
            tracing::warn!(
                %symbol,
                %start,
                %end,
                dropped = fetched_len - rows.len(),
                source = self.source.source_name(),
                "source returned rows outside the requested symbol/range or duplicate dates"
            );
        }

        tracing::info!(
            %symbol,
            %start,
            %end,
            rows = rows.len(),
            source = self.source.source_name(),
            elapsed_ms = t0.elapsed().as_millis(),
            "fetched predictions"
        );

        self.predictions.insert(key, rows.clone()).await;
        let cached_ranges = self.predictions.len().await;
        tracing::debug!(cached_ranges, "predictions cached");
        Ok(rows)
    }

    pub async fn list_known_symbols(&self) -> anyhow::Result<BTreeSet<String>> {
        if let Some(symbols) = self.symbols.get(&()).await {
            return Ok(symbols);
        }
        let symbols: BTreeSet<String> = self
            .source
            .distinct_symbols()
            .await?
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        tracing::debug!(count = symbols.len(), "loaded known symbols");
        self.symbols.insert((), symbols.clone()).await;
        Ok(symbols)
    }

    /// `None` when the table has no rows.
    pub async fn date_bounds(&self) -> anyhow::Result<Option<DateBounds>> {
        if let Some(bounds) = self.bounds.get(&()).await {
            return Ok(bounds);
        }
        let bounds = self.source.date_extent().await?;
        self.bounds.insert((), bounds).await;
        Ok(bounds)
    }

    pub async fn invalidate_cache(&self) {
        self.predictions.clear().await;
        self.symbols.clear().await;
        self.bounds.clear().await;
        tracing::info!("prediction caches cleared");
    }
}

/// Keeps only rows for `symbol` inside `[start, end]`, sorted by date, first row per date.
fn conform(
    mut rows: Vec<PricePoint>,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PricePoint> {
    rows.retain(|p| p.symbol == symbol && start <= p.date && p.date <= end);
    // Stable sort so the first row the source gave for a date wins.
    rows.sort_by_key(|p| p.date);
    rows.dedup_by_key(|p| p.date);
    rows
}
