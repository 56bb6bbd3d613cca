//! Pipeline orchestration
//!
//! This module provides the public API for MedSynapse Insight. Every analysis
//! call returns an `AnalysisReport`, on success and on failure alike: errors are
//! converted to `{"error": "..."}` here, at the boundary, and never escape.

use crate::anomaly::{AnomalyDetector, IsolationForestParams};
use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::insights::InsightGenerator;
use crate::schema::{Record, TableAdapter};
use crate::statistics::StatisticsEngine;
use crate::temporal::TemporalAggregator;
use crate::types::{AnalysisReport, Insight, LabAnalysis, WearableAnalysis};
use tracing::{info, warn};

/// Analyze lab panel records with the default configuration.
///
/// # Arguments
/// * `records` - One record per panel, e.g. `{glucose, hb1ac, cholesterol}`
///
/// # Returns
/// Statistics plus anomaly fields, or `{error}`
///
/// # Example
/// ```ignore
/// let report = analyze_lab_results(&records);
/// let insights = generate_insights(&report);
/// ```
pub fn analyze_lab_results(records: &[Record]) -> AnalysisReport {
    HealthAnalyzer::default().analyze_lab_results(records)
}

/// Analyze wearable records with the default configuration.
///
/// # Arguments
/// * `records` - Readings carrying `timestamp`, `heart_rate`, `steps`, `sleep_hours`
///
/// # Returns
/// Daily aggregates, total record count and date range, or `{error}`
pub fn analyze_wearable_data(records: &[Record]) -> AnalysisReport {
    HealthAnalyzer::default().analyze_wearable_data(records)
}

/// Generate insights for a report with the default thresholds.
pub fn generate_insights(report: &AnalysisReport) -> Vec<Insight> {
    HealthAnalyzer::default().generate_insights(report)
}

/// Analyzer holding only immutable configuration.
///
/// Each call fits its own scaler and detector, so one analyzer can be shared
/// freely, including across threads.
#[derive(Debug, Clone, Default)]
pub struct HealthAnalyzer {
    config: AnalyzerConfig,
}

impl HealthAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with a specific configuration
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Create an analyzer from configuration JSON
    pub fn from_config_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(Self::with_config(AnalyzerConfig::from_json(json)?))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Lab-results analysis: statistics, then anomaly detection
    pub fn analyze_lab_results(&self, records: &[Record]) -> AnalysisReport {
        into_report(self.try_analyze_lab_results(records).map(AnalysisReport::Lab))
    }

    /// Lab-results analysis on a JSON array of records
    pub fn analyze_lab_results_json(&self, json: &str) -> AnalysisReport {
        match TableAdapter::parse_array(json) {
            Ok(records) => self.analyze_lab_results(&records),
            Err(e) => into_report(Err(e)),
        }
    }

    /// Wearable analysis: per-date aggregates
    pub fn analyze_wearable_data(&self, records: &[Record]) -> AnalysisReport {
        into_report(self.try_analyze_wearable_data(records).map(AnalysisReport::Wearable))
    }

    /// Wearable analysis on a JSON array of records
    pub fn analyze_wearable_data_json(&self, json: &str) -> AnalysisReport {
        match TableAdapter::parse_array(json) {
            Ok(records) => self.analyze_wearable_data(&records),
            Err(e) => into_report(Err(e)),
        }
    }

    /// Insights for any report; never fails
    pub fn generate_insights(&self, report: &AnalysisReport) -> Vec<Insight> {
        InsightGenerator::from(&self.config).generate(report)
    }

    /// Insights for report JSON; unreadable input yields none
    pub fn generate_insights_json(&self, json: &str) -> Vec<Insight> {
        InsightGenerator::from(&self.config).generate_json(json)
    }

    /// Fallible lab-results analysis, for callers that want the typed error
    pub fn try_analyze_lab_results(&self, records: &[Record]) -> Result<LabAnalysis, AnalysisError> {
        self.config.validate()?;

        let table = TableAdapter::to_table(records);
        let stats = StatisticsEngine::compute(&table);

        let detector = AnomalyDetector::new(IsolationForestParams::from(&self.config));
        let anomalies = detector
            .detect(&table.numeric_columns())?
            .map(|outcome| outcome.result);

        info!(
            rows = table.row_count(),
            columns = stats.mean.len(),
            anomalies = anomalies.map(|a| a.anomaly_count),
            "lab results analyzed"
        );

        Ok(LabAnalysis { stats, anomalies })
    }

    /// Fallible wearable analysis, for callers that want the typed error
    pub fn try_analyze_wearable_data(
        &self,
        records: &[Record],
    ) -> Result<WearableAnalysis, AnalysisError> {
        self.config.validate()?;

        let table = TableAdapter::to_table(records);
        let analysis = TemporalAggregator::aggregate(&table, &self.config.timestamp_column)?;

        info!(
            rows = analysis.total_records,
            days = analysis.daily_stats.len(),
            "wearable data analyzed"
        );

        Ok(analysis)
    }
}

fn into_report(result: Result<AnalysisReport, AnalysisError>) -> AnalysisReport {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "analysis failed");
        AnalysisReport::error(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnomalyResult;

    fn sample_lab_records() -> Vec<Record> {
        vec![
            Record::new().with("glucose", 95).with("hb1ac", 5.2).with("cholesterol", 180),
            Record::new().with("glucose", 110).with("hb1ac", 6.1).with("cholesterol", 220),
            Record::new().with("glucose", 88).with("hb1ac", 4.9).with("cholesterol", 160),
        ]
    }

    fn sample_wearable_json() -> &'static str {
        r#"[
            {"timestamp": "2024-01-15T07:00:00Z", "heart_rate": 58, "steps": 0, "sleep_hours": 7.5},
            {"timestamp": "2024-01-15T12:00:00Z", "heart_rate": 92, "steps": 5400, "sleep_hours": null},
            {"timestamp": "2024-01-16T07:00:00Z", "heart_rate": 61, "steps": 300, "sleep_hours": 6.25},
            {"timestamp": "2024-01-17T18:00:00Z", "heart_rate": 110, "steps": 9100}
        ]"#
    }

    #[test]
    fn test_lab_scenario() {
        let report = analyze_lab_results(&sample_lab_records());
        let lab = report.as_lab().expect("lab report");

        assert_eq!(lab.stats.mean.len(), 3);
        assert_eq!(lab.stats.correlation.len(), 3);
        for column in ["glucose", "hb1ac", "cholesterol"] {
            assert_eq!(lab.stats.correlation.get(column, column), Some(1.0));
        }

        let anomalies = lab.anomalies.expect("anomaly fields");
        assert!(anomalies.anomaly_count <= 3);
        assert_eq!(
            anomalies.anomaly_percentage,
            100.0 * anomalies.anomaly_count as f64 / 3.0
        );
    }

    #[test]
    fn test_lab_json_shape() {
        let report = HealthAnalyzer::new().analyze_lab_results_json(
            r#"[{"glucose":95,"hb1ac":5.2,"cholesterol":180},
                {"glucose":110,"hb1ac":6.1,"cholesterol":220},
                {"glucose":88,"hb1ac":4.9,"cholesterol":160}]"#,
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        for key in ["mean_values", "std_values", "correlations", "anomaly_count", "anomaly_percentage"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let columns: Vec<&String> = value["mean_values"].as_object().unwrap().keys().collect();
        assert_eq!(columns.len(), 3);
    }

    #[test]
    fn test_lab_is_reproducible() {
        let records: Vec<Record> = (0..40)
            .map(|i| {
                let spike = if i == 17 { 300.0 } else { 0.0 };
                Record::new()
                    .with("glucose", 90.0 + (i % 7) as f64 + spike)
                    .with("cholesterol", 170.0 + (i % 11) as f64)
            })
            .collect();

        let analyzer = HealthAnalyzer::new();
        let first = analyzer.analyze_lab_results(&records);
        let second = analyzer.analyze_lab_results(&records);
        assert_eq!(first, second);

        let anomalies: AnomalyResult = first.as_lab().unwrap().anomalies.unwrap();
        assert!(anomalies.anomaly_count >= 1);
        assert!(anomalies.anomaly_percentage <= 100.0);
    }

    #[test]
    fn test_lab_without_numeric_columns() {
        let records = vec![
            Record::new().with("patient", "a").with("note", "fasting"),
            Record::new().with("patient", "b").with("note", "post-meal"),
        ];
        let report = analyze_lab_results(&records);
        let lab = report.as_lab().unwrap();
        assert!(lab.anomalies.is_none());
        assert!(lab.stats.mean.is_empty());

        let json = report.to_json().unwrap();
        assert!(!json.contains("anomaly_count"));
    }

    #[test]
    fn test_lab_all_null_column_is_reported() {
        let report = HealthAnalyzer::new().analyze_lab_results_json(
            r#"[{"a": 1, "b": null}, {"a": 3, "b": null}, {"a": 4, "b": null}]"#,
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert!(value["mean_values"].as_object().unwrap().contains_key("b"));
        assert!(value["mean_values"]["b"].is_null());
        assert!(value["std_values"]["b"].is_null());
        assert!(value["correlations"]["a"]["b"].is_null());
        assert_eq!(value["anomaly_count"].as_u64().map(|c| c <= 3), Some(true));
    }

    #[test]
    fn test_lab_single_row_is_error() {
        let report = analyze_lab_results(&[Record::new().with("glucose", 95)]);
        assert!(report.is_error());
        assert!(report.error_message().unwrap().contains("at least 2 rows"));
    }

    #[test]
    fn test_lab_nested_json_is_error() {
        let report = HealthAnalyzer::new()
            .analyze_lab_results_json(r#"[{"glucose": 95}, {"glucose": {"value": 110}}]"#);
        assert!(report.is_error());
    }

    #[test]
    fn test_lab_invalid_config_is_error() {
        let analyzer = HealthAnalyzer::with_config(AnalyzerConfig {
            n_estimators: 0,
            ..Default::default()
        });
        let report = analyzer.analyze_lab_results(&sample_lab_records());
        assert!(report.error_message().unwrap().contains("n_estimators"));
    }

    #[test]
    fn test_wearable_scenario() {
        let report = HealthAnalyzer::new().analyze_wearable_data_json(sample_wearable_json());
        let wearable = report.as_wearable().expect("wearable report");

        assert_eq!(wearable.total_records, 4);
        assert_eq!(wearable.date_range.start.as_deref(), Some("2024-01-15"));
        assert_eq!(wearable.date_range.end.as_deref(), Some("2024-01-17"));

        let first = &wearable.daily_stats["2024-01-15"];
        assert_eq!(first.heart_rate_mean, Some(75.0));
        assert_eq!(first.heart_rate_min, Some(58.0));
        assert_eq!(first.heart_rate_max, Some(92.0));
        assert_eq!(first.steps_sum, Some(5400.0));
        assert_eq!(first.sleep_hours_mean, Some(7.5));

        assert_eq!(wearable.daily_stats["2024-01-17"].sleep_hours_mean, None);
    }

    #[test]
    fn test_wearable_without_timestamp() {
        let report = HealthAnalyzer::new()
            .analyze_wearable_data_json(r#"[{"heart_rate": 70, "steps": 100}]"#);
        assert_eq!(report.to_json().unwrap(), r#"{"error":"No timestamp column found"}"#);

        // An empty batch has no columns at all
        let report = analyze_wearable_data(&[]);
        assert_eq!(report.error_message(), Some("No timestamp column found"));
    }

    #[test]
    fn test_insights_from_lab_report() {
        let report = analyze_lab_results(&sample_lab_records());
        let insights = generate_insights(&report);

        // The anomaly insight always leads when anomaly fields are present
        let pct = report.as_lab().unwrap().anomalies.unwrap().anomaly_percentage;
        let expected_first = if pct > 5.0 {
            format!("High anomaly rate detected: {pct:.1}% of data points")
        } else {
            "Data appears consistent with low anomaly rate".to_string()
        };
        assert_eq!(insights[0].as_str(), expected_first);

        // glucose, hb1ac and cholesterol all move together in the sample
        assert!(insights
            .iter()
            .any(|i| i.as_str().starts_with("Strong correlation between glucose and hb1ac")));
        assert!(insights
            .iter()
            .any(|i| i.as_str().starts_with("Strong correlation between hb1ac and glucose")));
    }

    #[test]
    fn test_insights_from_wearable_and_error_reports() {
        let wearable = HealthAnalyzer::new().analyze_wearable_data_json(sample_wearable_json());
        assert!(generate_insights(&wearable).is_empty());
        assert!(generate_insights(&AnalysisReport::error("bad input")).is_empty());
    }

    #[test]
    fn test_insights_from_report_json() {
        let analyzer = HealthAnalyzer::new();
        let report = analyzer.analyze_lab_results(&sample_lab_records());
        let json = report.to_json().unwrap();
        assert_eq!(
            analyzer.generate_insights_json(&json),
            analyzer.generate_insights(&report)
        );
    }

    #[test]
    fn test_analyzer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HealthAnalyzer>();
    }
}
