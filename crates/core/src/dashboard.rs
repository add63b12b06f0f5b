use crate::domain::prediction::{DateBounds, Selection};
use crate::metrics::compute_metrics;
use crate::service::PredictionService;
use crate::time::calendar::IntoCalendarDate;
use crate::view::DashboardView;
use crate::warehouse::{PredictionSource, QueryError};
use chrono::NaiveDate;

/// Controller for one dashboard session. Each control has its own handler; every handler
/// refetches for the new selection and returns the full view.
pub struct Dashboard<'a, S> {
    service: &'a PredictionService<S>,
    symbols: Vec<String>,
    bounds: DateBounds,
    selection: Selection,
}

impl<'a, S: PredictionSource> Dashboard<'a, S> {
    /// Loads the symbol list and date bounds and picks the initial selection: the first symbol,
    /// from `default_start` (clamped into the table's range) to the latest date.
    pub async fn open(
        service: &'a PredictionService<S>,
        default_start: NaiveDate,
    ) -> anyhow::Result<Self> {
        let symbols: Vec<String> = service.list_known_symbols().await?.into_iter().collect();
        let bounds = service.date_bounds().await?.ok_or(QueryError::NoData)?;
        let symbol = symbols.first().cloned().ok_or(QueryError::NoData)?;

        let selection = initial_selection(symbol, &bounds, default_start);
        tracing::debug!(
            symbols = symbols.len(),
            min_date = %bounds.min_date,
            max_date = %bounds.max_date,
            ?selection,
            "dashboard opened"
        );

        Ok(Self {
            service,
            symbols,
            bounds,
            selection,
        })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn bounds(&self) -> DateBounds {
        self.bounds
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub async fn render(&self) -> anyhow::Result<DashboardView> {
        let Selection {
            symbol,
            start_date,
            end_date,
        } = &self.selection;
        let rows = self
            .service
            .fetch_predictions(symbol, *start_date, *end_date)
            .await?;
        let metrics = compute_metrics(&rows);
        Ok(DashboardView::build(self.selection.clone(), rows, metrics))
    }

    pub async fn on_symbol_selected(&mut self, symbol: &str) -> anyhow::Result<DashboardView> {
        if symbol.trim().is_empty() {
            return Err(QueryError::EmptySymbol.into());
        }
        if !self.symbols.iter().any(|s| s == symbol) {
            return Err(QueryError::UnknownSymbol(symbol.to_string()).into());
        }
        self.selection.symbol = symbol.to_string();
        self.render().await
    }

    /// Dates outside the table's range are clamped to it, as a bounded date picker would.
    pub async fn on_date_range_changed(
        &mut self,
        start: impl IntoCalendarDate,
        end: impl IntoCalendarDate,
    ) -> anyhow::Result<DashboardView> {
        let start = start.into_calendar_date();
        let end = end.into_calendar_date();
        if start > end {
            return Err(QueryError::InvertedRange { start, end }.into());
        }
        self.selection.start_date = self.bounds.clamp(start);
        self.selection.end_date = self.bounds.clamp(end);
        self.render().await
    }
}

pub fn initial_selection(symbol: String, bounds: &DateBounds, default_start: NaiveDate) -> Selection {
    Selection {
        symbol,
        start_date: bounds.clamp(default_start),
        end_date: bounds.max_date,
    }
}
