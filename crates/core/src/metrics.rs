use crate::domain::prediction::PricePoint;
use serde::{Deserialize, Serialize};

/// Error metrics of predicted vs. actual close over the rows with a known actual close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub n: usize,
    pub rmse: f64,
    pub mae: f64,
    /// `None` when every actual close is identical: the total sum of squares is zero and R² is
    /// undefined.
    pub r2: Option<f64>,
}

/// Returns `None` when no row has a usable actual close. A row counts only when both closes
/// are finite.
pub fn compute_metrics(rows: &[PricePoint]) -> Option<MetricsSummary> {
    let mut pairs: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|p| match p.actual_close {
            Some(actual) if actual.is_finite() && p.predicted_close.is_finite() => {
                Some((actual, p.predicted_close))
            }
            _ => None,
        })
        .collect();

    if pairs.is_empty() {
        return None;
    }

    // Canonical order makes the float sums independent of row order.
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let n = pairs.len();
    let nf = n as f64;

    let ss_res: f64 = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum();
    let abs_err: f64 = pairs.iter().map(|(a, p)| (a - p).abs()).sum();

    let mean_actual = pairs.iter().map(|(a, _)| a).sum::<f64>() / nf;
    let ss_tot: f64 = pairs.iter().map(|(a, _)| (a - mean_actual).powi(2)).sum();

    // Constancy is checked on the inputs; the rounded mean can leave a tiny nonzero ss_tot.
    let first_actual = pairs[0].0;
    let r2 = if pairs.iter().all(|(a, _)| *a == first_actual) || ss_tot <= 0.0 {
        None
    } else {
        Some(1.0 - ss_res / ss_tot)
    };

    Some(MetricsSummary {
        n,
        rmse: (ss_res / nf).sqrt(),
        mae: abs_err / nf,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, actual: Option<f64>, predicted: f64) -> PricePoint {
        PricePoint {
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            symbol: "AAPL".to_string(),
            actual_close: actual,
            predicted_close: predicted,
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn two_row_example() {
        let rows = vec![row(1, Some(10.0), 12.0), row(2, Some(20.0), 18.0)];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.n, 2);
        assert_close(m.rmse, 2.0);
        assert_close(m.mae, 2.0);
        assert_close(m.r2.unwrap(), 0.84);
    }

    #[test]
    fn empty_input_has_no_metrics() {
        assert_eq!(compute_metrics(&[]), None);
    }

    #[test]
    fn rows_without_actual_close_are_excluded() {
        let all_missing = vec![row(1, None, 12.0), row(2, None, 18.0)];
        assert_eq!(compute_metrics(&all_missing), None);

        // The trailing unsettled row must not count as zero.
        let rows = vec![
            row(1, Some(10.0), 12.0),
            row(2, Some(20.0), 18.0),
            row(3, None, 25.0),
        ];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.n, 2);
        assert_close(m.mae, 2.0);
    }

    #[test]
    fn non_finite_actuals_count_as_missing() {
        let rows = vec![row(1, Some(f64::NAN), 12.0), row(2, Some(20.0), 18.0)];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.n, 1);
        assert_close(m.rmse, 2.0);
    }

    #[test]
    fn non_finite_predictions_are_excluded() {
        let rows = vec![
            row(1, Some(10.0), f64::INFINITY),
            row(2, Some(10.0), 12.0),
            row(3, Some(20.0), 18.0),
        ];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.n, 2);
        assert_close(m.rmse, 2.0);
        assert_close(m.r2.unwrap(), 0.84);
    }

    #[test]
    fn constant_actuals_leave_r2_undefined() {
        let rows = vec![row(1, Some(5.0), 4.0), row(2, Some(5.0), 7.0)];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.r2, None);
        assert_close(m.mae, 1.5);
        assert_close(m.rmse, (5.0f64 / 2.0).sqrt());
    }

    #[test]
    fn repeated_inexact_prices_leave_r2_undefined() {
        // Neither 0.1 nor 10.02 is exact in binary, so the computed mean drifts off the price.
        let tenths: Vec<_> = (1..=3).map(|d| row(d, Some(0.1), 0.2)).collect();
        let m = compute_metrics(&tenths).unwrap();
        assert_eq!(m.n, 3);
        assert_eq!(m.r2, None);
        assert_close(m.mae, 0.1);

        let closes: Vec<_> = (1..=6)
            .map(|d| row(d, Some(10.02), 10.02 + d as f64))
            .collect();
        let m = compute_metrics(&closes).unwrap();
        assert_eq!(m.n, 6);
        assert_eq!(m.r2, None);
        assert_close(m.mae, 3.5);
    }

    #[test]
    fn r2_goes_negative_for_worse_than_mean_predictions() {
        let rows = vec![row(1, Some(10.0), 20.0), row(2, Some(20.0), 10.0)];
        let m = compute_metrics(&rows).unwrap();
        // ss_res = 200, ss_tot = 50
        assert_close(m.r2.unwrap(), -3.0);
    }

    #[test]
    fn perfect_predictions() {
        let rows = vec![
            row(1, Some(101.25), 101.25),
            row(2, Some(99.5), 99.5),
            row(3, Some(103.0), 103.0),
        ];
        let m = compute_metrics(&rows).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, Some(1.0));
    }

    #[test]
    fn invariant_to_row_order() {
        let rows = vec![
            row(1, Some(187.13), 186.02),
            row(2, Some(185.64), 188.91),
            row(3, Some(184.25), 183.77),
            row(4, Some(181.91), 185.10),
            row(5, Some(185.14), 182.36),
            row(6, None, 184.00),
        ];
        let expected = compute_metrics(&rows).unwrap();

        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(compute_metrics(&reversed).unwrap(), expected);

        let mut rotated = rows.clone();
        rotated.rotate_left(2);
        assert_eq!(compute_metrics(&rotated).unwrap(), expected);

        let shuffled = vec![
            rows[3].clone(),
            rows[0].clone(),
            rows[5].clone(),
            rows[2].clone(),
            rows[4].clone(),
            rows[1].clone(),
        ];
        assert_eq!(compute_metrics(&shuffled).unwrap(), expected);
    }
}
