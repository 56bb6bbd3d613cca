//! Descriptive statistics
//!
//! This module computes per-column summary statistics over the numeric columns
//! of a table:
//! - Mean over present values
//! - Sample standard deviation (Bessel-corrected)
//! - Pearson correlation for every ordered column pair
//!
//! Degenerate inputs never fail; they produce NaN.

use crate::schema::{NumericColumn, Table};
use crate::types::{ColumnMap, CorrelationMatrix, StatsResult};

/// Statistics engine for lab panels
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Compute mean, standard deviation and correlations for a table
    pub fn compute(table: &Table) -> StatsResult {
        let numeric = table.numeric_columns();

        let mean = numeric
            .columns
            .iter()
            .map(|c| (c.name.clone(), mean(&c.present().collect::<Vec<_>>())))
            .collect();

        let stddev = numeric
            .columns
            .iter()
            .map(|c| (c.name.clone(), sample_std(&c.present().collect::<Vec<_>>())))
            .collect();

        let mut correlation = CorrelationMatrix::new();
        for a in &numeric.columns {
            let row: ColumnMap = numeric
                .columns
                .iter()
                .map(|b| (b.name.clone(), pearson(a, b)))
                .collect();
            correlation.insert_row(a.name.clone(), row);
        }

        StatsResult {
            mean,
            stddev,
            correlation,
        }
    }
}

/// Arithmetic mean; NaN for no values
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); NaN for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sq_diff: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sq_diff / (values.len() - 1) as f64).sqrt()
}

/// Pearson correlation over rows where both columns are present
fn pearson(a: &NumericColumn, b: &NumericColumn) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    if a.name == b.name {
        return 1.0;
    }

    (cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldValue, Record, TableAdapter};

    fn lab_panel() -> Table {
        TableAdapter::to_table(&[
            Record::new().with("glucose", 95.0).with("hb1ac", 5.2).with("cholesterol", 180.0),
            Record::new().with("glucose", 110.0).with("hb1ac", 6.1).with("cholesterol", 220.0),
            Record::new().with("glucose", 88.0).with("hb1ac", 4.9).with("cholesterol", 160.0),
        ])
    }

    #[test]
    fn test_mean_and_std() {
        let stats = StatisticsEngine::compute(&lab_panel());

        assert!((stats.mean.get("glucose").unwrap() - 97.666_666).abs() < 1e-4);
        // Sample std of 95, 110, 88
        assert!((stats.stddev.get("glucose").unwrap() - 11.239_810).abs() < 1e-4);
        assert!((stats.mean.get("cholesterol").unwrap() - 186.666_666).abs() < 1e-4);
    }

    #[test]
    fn test_correlation_matrix_shape() {
        let stats = StatisticsEngine::compute(&lab_panel());
        let columns: Vec<&str> = stats.correlation.columns().collect();
        assert_eq!(columns, vec!["glucose", "hb1ac", "cholesterol"]);

        for a in &columns {
            assert_eq!(stats.correlation.get(a, a), Some(1.0));
            for b in &columns {
                assert_eq!(stats.correlation.get(a, b), stats.correlation.get(b, a));
            }
        }
        assert!(stats.correlation.get("glucose", "hb1ac").unwrap() > 0.9);
    }

    #[test]
    fn test_single_value_std_is_nan() {
        let table = TableAdapter::to_table(&[Record::new().with("glucose", 95.0)]);
        let stats = StatisticsEngine::compute(&table);

        assert_eq!(stats.mean.get("glucose"), Some(95.0));
        assert!(stats.stddev.get("glucose").unwrap().is_nan());
        assert!(stats.correlation.get("glucose", "glucose").unwrap().is_nan());
    }

    #[test]
    fn test_zero_variance_correlation_is_nan() {
        let table = TableAdapter::to_table(&[
            Record::new().with("flat", 1.0).with("rising", 1.0),
            Record::new().with("flat", 1.0).with("rising", 2.0),
            Record::new().with("flat", 1.0).with("rising", 3.0),
        ]);
        let stats = StatisticsEngine::compute(&table);

        assert!(stats.correlation.get("flat", "rising").unwrap().is_nan());
        assert!(stats.correlation.get("rising", "flat").unwrap().is_nan());
        assert!(stats.correlation.get("flat", "flat").unwrap().is_nan());
        assert_eq!(stats.correlation.get("rising", "rising"), Some(1.0));
        assert_eq!(stats.stddev.get("flat"), Some(0.0));
    }

    #[test]
    fn test_absent_values_are_skipped() {
        let table = TableAdapter::to_table(&[
            Record::new().with("a", 1.0).with("b", 2.0),
            Record::new().with("a", FieldValue::Absent).with("b", 4.0),
            Record::new().with("a", 3.0).with("b", 6.0),
            Record::new().with("a", 5.0).with("b", 10.0),
        ]);
        let stats = StatisticsEngine::compute(&table);

        assert_eq!(stats.mean.get("a"), Some(3.0));
        assert_eq!(stats.mean.get("b"), Some(5.5));
        // Pairwise-complete rows: (1,2), (3,6), (5,10) are perfectly linear
        assert!((stats.correlation.get("a", "b").unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_absent_column_reports_nan() {
        let table = TableAdapter::to_table(&[
            Record::new().with("a", 1.0).with("b", FieldValue::Absent),
            Record::new().with("a", 3.0).with("b", FieldValue::Absent),
            Record::new().with("a", 4.0).with("b", FieldValue::Absent),
        ]);
        let stats = StatisticsEngine::compute(&table);

        assert_eq!(stats.mean.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(stats.mean.get("b").unwrap().is_nan());
        assert!(stats.stddev.get("b").unwrap().is_nan());
        assert!(stats.correlation.get("a", "b").unwrap().is_nan());
        assert!(stats.correlation.get("b", "b").unwrap().is_nan());
        assert_eq!(stats.correlation.get("a", "a"), Some(1.0));
    }

    #[test]
    fn test_text_columns_are_excluded() {
        let table = TableAdapter::to_table(&[
            Record::new().with("patient", "p1").with("glucose", 95.0),
            Record::new().with("patient", "p2").with("glucose", 99.0),
        ]);
        let stats = StatisticsEngine::compute(&table);

        assert_eq!(stats.mean.len(), 1);
        assert!(stats.mean.get("patient").is_none());
        assert!(stats.correlation.row("patient").is_none());
    }

    #[test]
    fn test_empty_table() {
        let stats = StatisticsEngine::compute(&Table::default());
        assert!(stats.mean.is_empty());
        assert!(stats.correlation.is_empty());
    }
}
