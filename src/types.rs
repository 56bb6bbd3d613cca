//! Core types for the MedSynapse Insight pipeline
//!
//! This module defines the result structures produced by each analysis stage:
//! descriptive statistics, anomaly counts, daily wearable aggregates, and the
//! report object returned by every public call.
//!
//! Not-a-number values are legitimate results (e.g. the standard deviation of a
//! single value). They serialize as JSON `null` and read back as NaN.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered mapping from column name to a float
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    entries: Vec<(String, f64)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) {
        let column = column.into();
        match self.entries.iter_mut().find(|(k, _)| *k == column) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, f64)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for ColumnMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ColumnMapVisitor;

impl<'de> Visitor<'de> for ColumnMapVisitor {
    type Value = ColumnMap;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of column name to number or null")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ColumnMap, A::Error> {
        let mut map = ColumnMap::new();
        while let Some((key, value)) = access.next_entry::<String, Option<f64>>()? {
            map.insert(key, value.unwrap_or(f64::NAN));
        }
        Ok(map)
    }
}

impl<'de> Deserialize<'de> for ColumnMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ColumnMapVisitor)
    }
}

/// Pairwise correlation coefficients, row by row in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    rows: Vec<(String, ColumnMap)>,
}

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append (or replace) the row for `column`
    pub fn insert_row(&mut self, column: impl Into<String>, row: ColumnMap) {
        let column = column.into();
        match self.rows.iter_mut().find(|(k, _)| *k == column) {
            Some((_, existing)) => *existing = row,
            None => self.rows.push((column, row)),
        }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.row(a).and_then(|row| row.get(b))
    }

    pub fn row(&self, column: &str) -> Option<&ColumnMap> {
        self.rows.iter().find(|(k, _)| k == column).map(|(_, r)| r)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(k, _)| k.as_str())
    }

    /// Every (row, column, value) cell in iteration order
    pub fn cells(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.rows
            .iter()
            .flat_map(|(a, row)| row.iter().map(move |(b, v)| (a.as_str(), b, v)))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (k, row) in &self.rows {
            map.serialize_entry(k, row)?;
        }
        map.end()
    }
}

struct CorrelationMatrixVisitor;

impl<'de> Visitor<'de> for CorrelationMatrixVisitor {
    type Value = CorrelationMatrix;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object of column name to correlation row")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CorrelationMatrix, A::Error> {
        let mut matrix = CorrelationMatrix::new();
        while let Some((key, row)) = access.next_entry::<String, ColumnMap>()? {
            matrix.insert_row(key, row);
        }
        Ok(matrix)
    }
}

impl<'de> Deserialize<'de> for CorrelationMatrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CorrelationMatrixVisitor)
    }
}

/// Descriptive statistics over the numeric columns of a table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    /// Per-column mean
    #[serde(rename = "mean_values")]
    pub mean: ColumnMap,
    /// Per-column sample standard deviation (n - 1)
    #[serde(rename = "std_values")]
    pub stddev: ColumnMap,
    /// Pearson correlation for every ordered column pair
    #[serde(rename = "correlations")]
    pub correlation: CorrelationMatrix,
}

/// Outlier summary for one batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Rows labeled as outliers
    pub anomaly_count: usize,
    /// anomaly_count / rows * 100
    pub anomaly_percentage: f64,
}

impl AnomalyResult {
    pub fn from_counts(outliers: usize, rows: usize) -> Self {
        let anomaly_percentage = if rows == 0 {
            0.0
        } else {
            100.0 * outliers as f64 / rows as f64
        };
        Self {
            anomaly_count: outliers,
            anomaly_percentage,
        }
    }
}

/// Result of a lab-results analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabAnalysis {
    #[serde(flatten)]
    pub stats: StatsResult,
    /// Absent when the batch has no numeric columns
    #[serde(flatten)]
    pub anomalies: Option<AnomalyResult>,
}

/// Per-date wearable aggregate; `None` means no values on that date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Rows that fell on this date
    pub record_count: usize,
    pub heart_rate_mean: Option<f64>,
    pub heart_rate_min: Option<f64>,
    pub heart_rate_max: Option<f64>,
    pub steps_sum: Option<f64>,
    pub sleep_hours_mean: Option<f64>,
}

/// Earliest and latest calendar date in a batch (`YYYY-MM-DD`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Result of a wearable-data analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearableAnalysis {
    /// Keyed by ISO date, so iteration is chronological
    pub daily_stats: BTreeMap<String, DailyAggregate>,
    pub total_records: usize,
    pub date_range: DateRange,
}

/// The single result object returned by every public analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisReport {
    Error { error: String },
    Lab(LabAnalysis),
    Wearable(WearableAnalysis),
}

impl AnalysisReport {
    pub fn error(message: impl Into<String>) -> Self {
        AnalysisReport::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisReport::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AnalysisReport::Error { error } => Some(error),
            _ => None,
        }
    }

    pub fn as_lab(&self) -> Option<&LabAnalysis> {
        match self {
            AnalysisReport::Lab(lab) => Some(lab),
            _ => None,
        }
    }

    pub fn as_wearable(&self) -> Option<&WearableAnalysis> {
        match self {
            AnalysisReport::Wearable(wearable) => Some(wearable),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One human-readable finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Insight(String);

impl Insight {
    pub fn new(text: impl Into<String>) -> Self {
        Insight(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for Insight {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
