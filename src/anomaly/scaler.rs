//! Imputation and feature scaling
//!
//! Both steps are fit on the batch they transform and keep no state afterwards.

use crate::error::AnalysisError;
use crate::schema::NumericColumnSet;

/// Replace absent cells with the column mean of the present cells.
///
/// Returns a row-major matrix with one row per input row.
pub fn impute_with_mean(set: &NumericColumnSet) -> Result<Vec<Vec<f64>>, AnalysisError> {
    let mut matrix = vec![Vec::with_capacity(set.columns.len()); set.row_count];

    for column in &set.columns {
        if column.values.len() != set.row_count {
            return Err(AnalysisError::InvalidInput(format!(
                "column '{}' has {} values, expected {}",
                column.name,
                column.values.len(),
                set.row_count
            )));
        }

        let present: Vec<f64> = column.present().collect();
        if present.is_empty() {
            return Err(AnalysisError::DegenerateInput(format!(
                "column '{}' has no values to impute from",
                column.name
            )));
        }
        let fill = present.iter().sum::<f64>() / present.len() as f64;

        for (row, value) in matrix.iter_mut().zip(&column.values) {
            row.push(value.unwrap_or(fill));
        }
    }

    Ok(matrix)
}

/// Standardizes each feature to zero mean and unit (population) variance
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-feature mean and standard deviation
    pub fn fit(&mut self, matrix: &[Vec<f64>]) -> Result<(), AnalysisError> {
        let Some(first) = matrix.first() else {
            return Err(AnalysisError::DegenerateInput(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        };
        let n_features = first.len();
        if matrix.iter().any(|row| row.len() != n_features) {
            return Err(AnalysisError::InvalidInput(
                "matrix rows have inconsistent lengths".to_string(),
            ));
        }

        let n = matrix.len() as f64;
        self.means = (0..n_features)
            .map(|j| matrix.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        self.scales = (0..n_features)
            .map(|j| {
                let m = self.means[j];
                let var = matrix.iter().map(|row| (row[j] - m).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();

        if self.means.iter().chain(&self.scales).any(|v| !v.is_finite()) {
            return Err(AnalysisError::DegenerateInput(
                "non-finite values in feature matrix".to_string(),
            ));
        }
        Ok(())
    }

    /// Center and scale; constant features stay at 0
    pub fn transform(&self, matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
        matrix
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(v, (m, s))| if *s > 0.0 { (v - m) / s } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(&mut self, matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, AnalysisError> {
        self.fit(matrix)?;
        Ok(self.transform(matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NumericColumn;

    #[test]
    fn test_impute_with_mean() {
        let set = NumericColumnSet {
            columns: vec![
                NumericColumn {
                    name: "a".to_string(),
                    values: vec![Some(1.0), None, Some(3.0)],
                },
                NumericColumn {
                    name: "b".to_string(),
                    values: vec![Some(10.0), Some(20.0), None],
                },
            ],
            row_count: 3,
        };

        let matrix = impute_with_mean(&set).unwrap();
        assert_eq!(matrix, vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 15.0]]);
    }

    #[test]
    fn test_impute_keeps_row_count() {
        let set = NumericColumnSet {
            columns: vec![NumericColumn {
                name: "a".to_string(),
                values: vec![None, None, Some(4.0), None],
            }],
            row_count: 4,
        };
        assert_eq!(impute_with_mean(&set).unwrap().len(), 4);
    }

    #[test]
    fn test_scaler_standardizes() {
        let matrix = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0]];
        let scaled = StandardScaler::new().fit_transform(&matrix).unwrap();

        let col0: Vec<f64> = scaled.iter().map(|r| r[0]).collect();
        let mean: f64 = col0.iter().sum::<f64>() / 3.0;
        let var: f64 = col0.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);

        // Constant column is centred to zero without dividing by zero
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_scaler_rejects_empty() {
        let result = StandardScaler::new().fit(&[]);
        assert!(matches!(result, Err(AnalysisError::DegenerateInput(_))));
    }
}
