//! Analyzer configuration
//!
//! All tunables of the pipeline live here so that a run is fully described by
//! its input batch plus one `AnalyzerConfig`. The detector seed in particular is
//! explicit: identical input and config always produce identical labels.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};

/// Default expected fraction of anomalous rows
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Default number of isolation trees
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Default per-tree subsample size
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Default detector seed
pub const DEFAULT_SEED: u64 = 42;

/// Anomaly percentage above which the high-rate insight fires
pub const DEFAULT_HIGH_ANOMALY_RATE_PCT: f64 = 5.0;

/// Absolute correlation above which a pair is reported as strong
pub const DEFAULT_STRONG_CORRELATION: f64 = 0.7;

/// Column holding timestamps for wearable analysis
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "timestamp";

/// Configuration shared by every analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Expected proportion of outliers, in (0, 0.5]
    pub contamination: f64,
    /// Number of trees in the isolation ensemble
    pub n_estimators: usize,
    /// Rows drawn (without replacement) for each tree
    pub max_samples: usize,
    /// Seed for the detector's random number generator
    pub seed: u64,
    /// Insight threshold for the anomaly percentage
    pub high_anomaly_rate_pct: f64,
    /// Insight threshold for |r|
    pub strong_correlation: f64,
    /// Name of the timestamp column for wearable analysis
    pub timestamp_column: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: DEFAULT_SEED,
            high_anomaly_rate_pct: DEFAULT_HIGH_ANOMALY_RATE_PCT,
            strong_correlation: DEFAULT_STRONG_CORRELATION,
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
        }
    }
}

impl AnalyzerConfig {
    /// Return a copy of this config with a different detector seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check that every field is within its accepted range
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(AnalysisError::Config(format!(
                "contamination must be in (0, 0.5], got {}",
                self.contamination
            )));
        }
        if self.n_estimators == 0 {
            return Err(AnalysisError::Config(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_samples == 0 {
            return Err(AnalysisError::Config(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if !self.high_anomaly_rate_pct.is_finite() || !self.strong_correlation.is_finite() {
            return Err(AnalysisError::Config(
                "insight thresholds must be finite".to_string(),
            ));
        }
        if self.timestamp_column.is_empty() {
            return Err(AnalysisError::Config(
                "timestamp_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed, 42);
        assert!((config.contamination - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AnalyzerConfig::from_json(r#"{"seed": 7, "n_estimators": 25}"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.n_estimators, 25);
        assert_eq!(config.max_samples, DEFAULT_MAX_SAMPLES);
        assert_eq!(config.timestamp_column, "timestamp");
    }

    #[test]
    fn test_rejects_bad_contamination() {
        let result = AnalyzerConfig::from_json(r#"{"contamination": 0.9}"#);
        assert!(matches!(result, Err(AnalysisError::Config(_))));

        let result = AnalyzerConfig::from_json(r#"{"contamination": 0.0}"#);
        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let config = AnalyzerConfig::default().with_seed(1234);
        let json = config.to_json().unwrap();
        let loaded = AnalyzerConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }
}
