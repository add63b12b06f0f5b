use signalboard_core::view::{format_metric, DashboardView};
use std::fmt::Write;

/// Plain-text rendering of the dashboard: headings, the raw table and the metric cards.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", view.caption);
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", view.table.heading);
    let header: Vec<String> = view.table.columns.iter().map(|c| c.to_string()).collect();
    let body: Vec<[String; 4]> = view
        .table
        .rows
        .iter()
        .map(|p| {
            [
                p.date.to_string(),
                p.symbol.clone(),
                format_metric(p.actual_close),
                format_metric(Some(p.predicted_close)),
            ]
        })
        .collect();

    let mut widths = [0usize; 4];
    for (i, h) in header.iter().enumerate() {
        widths[i] = h.chars().count();
    }
    for cells in &body {
        for (i, cell) in cells.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let _ = writeln!(
        out,
        "{:<w0$}  {:<w1$}  {:>w2$}  {:>w3$}",
        header[0],
        header[1],
        header[2],
        header[3],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3],
    );
    if body.is_empty() {
        let _ = writeln!(out, "(no rows)");
    }
    for cells in &body {
        let _ = writeln!(
            out,
            "{:<w0$}  {:<w1$}  {:>w2$}  {:>w3$}",
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Model Performance Metrics");
    match &view.metrics {
        Some(panel) => {
            for card in &panel.cards {
                let _ = writeln!(out, "{:<5} {}", card.label, card.value);
            }
        }
        None => {
            let _ = writeln!(out, "no data");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use signalboard_core::{compute_metrics, PricePoint, Selection};

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn selection() -> Selection {
        Selection {
            symbol: "AAPL".to_string(),
            start_date: ymd(1),
            end_date: ymd(6),
        }
    }

    #[test]
    fn renders_table_and_metrics() {
        let rows = vec![
            PricePoint {
                date: ymd(2),
                symbol: "AAPL".to_string(),
                actual_close: Some(10.0),
                predicted_close: 12.0,
            },
            PricePoint {
                date: ymd(3),
                symbol: "AAPL".to_string(),
                actual_close: Some(20.0),
                predicted_close: 18.0,
            },
            PricePoint {
                date: ymd(6),
                symbol: "AAPL".to_string(),
                actual_close: None,
                predicted_close: 19.5,
            },
        ];
        let metrics = compute_metrics(&rows);
        let text = render_text(&DashboardView::build(selection(), rows, metrics));

        let expected = "\
Price Prediction Dashboard: AAPL
Showing data from 2025-01-01 to 2025-01-06

Underlying Data
DATE        SYMBOL  NEXT_DAY_CLOSE  PREDICTED_CLOSE
2025-01-02  AAPL            10.000           12.000
2025-01-03  AAPL            20.000           18.000
2025-01-06  AAPL               n/a           19.500

Model Performance Metrics
RMSE  2.000
MAE   2.000
R²    0.840
";
        assert_eq!(text, expected);
    }

    #[test]
    fn renders_no_data_for_empty_selection() {
        let text = render_text(&DashboardView::build(selection(), Vec::new(), None));
        assert!(text.contains("(no rows)"));
        assert!(text.ends_with("Model Performance Metrics\nno data\n"));
    }
}
