//! Insight generation
//!
//! Turns analysis results into short sentences using fixed thresholds. Rules
//! run in a fixed order: the anomaly-rate finding first, then one finding per
//! strongly correlated ordered column pair. Both (A, B) and (B, A) are
//! reported. Generation never fails; missing inputs just yield fewer insights.

use crate::config::{AnalyzerConfig, DEFAULT_HIGH_ANOMALY_RATE_PCT, DEFAULT_STRONG_CORRELATION};
use crate::types::{AnalysisReport, CorrelationMatrix, Insight};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// The fields of an analysis result that insight rules look at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightInput {
    pub anomaly_percentage: Option<f64>,
    pub correlation: Option<CorrelationMatrix>,
}

impl InsightInput {
    /// Read each field on its own, so one malformed field only costs its own rule
    pub fn from_value(value: &Value) -> Self {
        let anomaly_percentage = value.get("anomaly_percentage").and_then(Value::as_f64);

        let correlation = value.get("correlations").and_then(|v| {
            CorrelationMatrix::deserialize(v)
                .map_err(|e| warn!(error = %e, "ignoring unreadable correlations"))
                .ok()
        });

        Self {
            anomaly_percentage,
            correlation,
        }
    }
}

impl From<&AnalysisReport> for InsightInput {
    fn from(report: &AnalysisReport) -> Self {
        match report {
            AnalysisReport::Lab(lab) => InsightInput {
                anomaly_percentage: lab.anomalies.map(|a| a.anomaly_percentage),
                correlation: Some(lab.stats.correlation.clone()),
            },
            AnalysisReport::Wearable(_) | AnalysisReport::Error { .. } => InsightInput::default(),
        }
    }
}

/// Rule-based insight generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsightGenerator {
    high_anomaly_rate_pct: f64,
    strong_correlation: f64,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self {
            high_anomaly_rate_pct: DEFAULT_HIGH_ANOMALY_RATE_PCT,
            strong_correlation: DEFAULT_STRONG_CORRELATION,
        }
    }
}

impl From<&AnalyzerConfig> for InsightGenerator {
    fn from(config: &AnalyzerConfig) -> Self {
        Self {
            high_anomaly_rate_pct: config.high_anomaly_rate_pct,
            strong_correlation: config.strong_correlation,
        }
    }
}

impl InsightGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate insights for an analysis report
    pub fn generate(&self, report: &AnalysisReport) -> Vec<Insight> {
        self.generate_from(&InsightInput::from(report))
    }

    /// Generate insights from report JSON; unparseable input yields none
    pub fn generate_json(&self, json: &str) -> Vec<Insight> {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => self.generate_from(&InsightInput::from_value(&value)),
            Err(e) => {
                warn!(error = %e, "could not read analysis result, no insights generated");
                Vec::new()
            }
        }
    }

    pub fn generate_from(&self, input: &InsightInput) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(pct) = input.anomaly_percentage {
            insights.push(self.anomaly_rate_insight(pct));
        }

        if let Some(correlation) = &input.correlation {
            insights.extend(self.correlation_insights(correlation));
        }

        insights
    }

    fn anomaly_rate_insight(&self, pct: f64) -> Insight {
        if pct > self.high_anomaly_rate_pct {
            Insight::new(format!(
                "High anomaly rate detected: {pct:.1}% of data points"
            ))
        } else {
            Insight::new("Data appears consistent with low anomaly rate")
        }
    }

    fn correlation_insights<'a>(
        &'a self,
        correlation: &'a CorrelationMatrix,
    ) -> impl Iterator<Item = Insight> + 'a {
        correlation
            .cells()
            // NaN fails the comparison, so degenerate pairs never qualify
            .filter(move |(a, b, r)| a != b && r.abs() > self.strong_correlation)
            .map(|(a, b, r)| Insight::new(format!("Strong correlation between {a} and {b}: {r:.2}")))
    }
}
