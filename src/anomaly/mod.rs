//! Anomaly detection
//!
//! This module labels each row of a numeric table as normal or outlier:
//! 1. Absent cells are imputed with the column mean
//! 2. Columns are standardized
//! 3. An unsupervised detector is fit on the scaled matrix and labels every row
//!
//! Every step is fit on the batch at hand. A new detector is built for each
//! call, so no fitted state carries over between batches.

mod isolation_forest;
mod scaler;

pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use scaler::{impute_with_mean, StandardScaler};

use crate::error::AnalysisError;
use crate::schema::NumericColumnSet;
use crate::types::AnomalyResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-row verdict of an outlier detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowLabel {
    Normal,
    Outlier,
}

/// Trait for unsupervised outlier detectors
pub trait OutlierDetector {
    /// Fit on `matrix` (rows x features) and label each of its rows
    fn fit_predict(&mut self, matrix: &[Vec<f64>]) -> Result<Vec<RowLabel>, AnalysisError>;
}

/// Labels and summary produced for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyOutcome {
    pub labels: Vec<RowLabel>,
    pub result: AnomalyResult,
}

/// Imputes, scales and scores a numeric column set
pub struct AnomalyDetector {
    params: IsolationForestParams,
}

impl AnomalyDetector {
    pub fn new(params: IsolationForestParams) -> Self {
        Self { params }
    }

    /// Run the full detection on a fresh isolation forest.
    ///
    /// Columns without a single present value are left out. Returns `Ok(None)`
    /// when no column remains to score.
    pub fn detect(&self, set: &NumericColumnSet) -> Result<Option<AnomalyOutcome>, AnalysisError> {
        let mut forest = IsolationForest::new(self.params);
        Self::detect_with(set, &mut forest)
    }

    /// Run the full detection with a caller-supplied detector
    pub fn detect_with(
        set: &NumericColumnSet,
        detector: &mut dyn OutlierDetector,
    ) -> Result<Option<AnomalyOutcome>, AnalysisError> {
        let set = set.scorable();
        if set.is_empty() {
            debug!("no scorable numeric columns, skipping anomaly detection");
            return Ok(None);
        }

        let imputed = impute_with_mean(&set)?;
        let scaled = StandardScaler::new().fit_transform(&imputed)?;
        let labels = detector.fit_predict(&scaled)?;

        if labels.len() != set.row_count {
            return Err(AnalysisError::DegenerateInput(format!(
                "detector labeled {} rows, expected {}",
                labels.len(),
                set.row_count
            )));
        }

        let outliers = labels.iter().filter(|l| **l == RowLabel::Outlier).count();
        let result = AnomalyResult::from_counts(outliers, labels.len());
        debug!(
            rows = labels.len(),
            outliers,
            percentage = result.anomaly_percentage,
            "anomaly detection complete"
        );

        Ok(Some(AnomalyOutcome { labels, result }))
    }
}
