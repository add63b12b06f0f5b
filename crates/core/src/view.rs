//! Presentation model handed to a front end: page headings, line chart data, raw table and
//! metric cards. Rendering itself happens elsewhere.

use crate::domain::prediction::{
    PricePoint, Selection, COLUMNS, COL_ACTUAL_CLOSE, COL_PREDICTED_CLOSE,
};
use crate::metrics::MetricsSummary;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub caption: String,
    pub selection: Selection,
    pub chart: LineChart,
    pub table: PriceTable,
    /// `None` renders as "no data".
    pub metrics: Option<MetricsPanel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineChart {
    pub title: String,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub legend_label: &'static str,
    pub x: Vec<NaiveDate>,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub name: &'static str,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceTable {
    pub heading: &'static str,
    pub columns: [&'static str; 4],
    pub rows: Vec<PricePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsPanel {
    pub heading: &'static str,
    pub summary: MetricsSummary,
    pub cards: Vec<MetricCard>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
}

impl DashboardView {
    pub fn build(
        selection: Selection,
        rows: Vec<PricePoint>,
        metrics: Option<MetricsSummary>,
    ) -> Self {
        let title = format!("Price Prediction Dashboard: {}", selection.symbol);
        let caption = format!(
            "Showing data from {} to {}",
            selection.start_date, selection.end_date
        );
        let chart = LineChart::from_rows(&selection.symbol, &rows);

        Self {
            title,
            caption,
            selection,
            chart,
            table: PriceTable {
                heading: "Underlying Data",
                columns: COLUMNS,
                rows,
            },
            metrics: metrics.map(MetricsPanel::from_summary),
        }
    }
}

impl LineChart {
    fn from_rows(symbol: &str, rows: &[PricePoint]) -> Self {
        Self {
            title: format!("Actual vs Predicted Close Price for {symbol}"),
            x_label: "Date",
            y_label: "Price",
            legend_label: "Legend",
            x: rows.iter().map(|p| p.date).collect(),
            series: vec![
                ChartSeries {
                    name: COL_ACTUAL_CLOSE,
                    values: rows.iter().map(|p| p.actual_close).collect(),
                },
                ChartSeries {
                    name: COL_PREDICTED_CLOSE,
                    values: rows.iter().map(|p| Some(p.predicted_close)).collect(),
                },
            ],
        }
    }
}

impl MetricsPanel {
    fn from_summary(summary: MetricsSummary) -> Self {
        Self {
            heading: "Model Performance Metrics",
            cards: vec![
                MetricCard {
                    label: "RMSE",
                    value: format_metric(Some(summary.rmse)),
                },
                MetricCard {
                    label: "MAE",
                    value: format_metric(Some(summary.mae)),
                },
                MetricCard {
                    label: "R²",
                    value: format_metric(summary.r2),
                },
            ],
            summary,
        }
    }
}

pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3}"),
        None => "n/a".to_string(),
    }
}
