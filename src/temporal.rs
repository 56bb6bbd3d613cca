//! Daily aggregation of wearable time series
//!
//! Rows are bucketed by calendar date (the timestamp truncated to a day, in the
//! timestamp's own offset) and each bucket is summarized:
//! - heart rate: mean, min, max
//! - steps: sum
//! - sleep hours: mean
//!
//! Missing values are excluded from a day's aggregate rather than counted as zero.

use crate::error::AnalysisError;
use crate::schema::{Column, FieldValue, Table};
use crate::types::{DailyAggregate, DateRange, WearableAnalysis};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

/// Heart rate signal column (bpm)
pub const HEART_RATE_COLUMN: &str = "heart_rate";
/// Step count signal column
pub const STEPS_COLUMN: &str = "steps";
/// Sleep duration signal column (hours)
pub const SLEEP_HOURS_COLUMN: &str = "sleep_hours";

/// Error message when the batch carries no timestamp column
pub const NO_TIMESTAMP_MESSAGE: &str = "No timestamp column found";

/// Aggregator for per-date wearable summaries
pub struct TemporalAggregator;

impl TemporalAggregator {
    /// Group rows by calendar date and summarize each day
    pub fn aggregate(
        table: &Table,
        timestamp_column: &str,
    ) -> Result<WearableAnalysis, AnalysisError> {
        let timestamps = table
            .column(timestamp_column)
            .ok_or_else(|| AnalysisError::MissingField(NO_TIMESTAMP_MESSAGE.to_string()))?;

        let heart_rate = table.column(HEART_RATE_COLUMN);
        let steps = table.column(STEPS_COLUMN);
        let sleep_hours = table.column(SLEEP_HOURS_COLUMN);

        let mut by_date: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

        for (row, value) in timestamps.values.iter().enumerate() {
            let Some(date) = extract_date(value)? else {
                continue;
            };

            let accumulator = by_date.entry(date).or_default();
            accumulator.record_count += 1;

            if let Some(v) = signal_value(heart_rate, row)? {
                accumulator.heart_rates.push(v);
            }
            if let Some(v) = signal_value(steps, row)? {
                accumulator.steps.push(v);
            }
            if let Some(v) = signal_value(sleep_hours, row)? {
                accumulator.sleep_hours.push(v);
            }
        }

        let date_range = DateRange {
            start: by_date.keys().next().map(format_date),
            end: by_date.keys().next_back().map(format_date),
        };

        let daily_stats: BTreeMap<String, DailyAggregate> = by_date
            .into_iter()
            .map(|(date, acc)| (format_date(&date), acc.into_aggregate()))
            .collect();

        debug!(
            rows = table.row_count(),
            days = daily_stats.len(),
            "wearable data aggregated"
        );

        Ok(WearableAnalysis {
            daily_stats,
            total_records: table.row_count(),
            date_range,
        })
    }
}

/// Accumulator for the readings that fall on a single day
#[derive(Default)]
struct DayAccumulator {
    record_count: usize,
    heart_rates: Vec<f64>,
    steps: Vec<f64>,
    sleep_hours: Vec<f64>,
}

impl DayAccumulator {
    fn into_aggregate(self) -> DailyAggregate {
        DailyAggregate {
            record_count: self.record_count,
            heart_rate_mean: average(&self.heart_rates),
            heart_rate_min: self.heart_rates.iter().copied().reduce(f64::min),
            heart_rate_max: self.heart_rates.iter().copied().reduce(f64::max),
            steps_sum: (!self.steps.is_empty()).then(|| self.steps.iter().sum()),
            sleep_hours_mean: average(&self.sleep_hours),
        }
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Numeric reading of a signal column at `row`; a missing column reads as absent
fn signal_value(column: Option<&Column>, row: usize) -> Result<Option<f64>, AnalysisError> {
    let Some(column) = column else {
        return Ok(None);
    };
    match column.values.get(row) {
        None => Ok(None),
        Some(value) if value.is_absent() => Ok(None),
        Some(FieldValue::Number(v)) => Ok(Some(*v)),
        Some(other) => Err(AnalysisError::InvalidInput(format!(
            "column '{}' has a non-numeric {} value at row {}",
            column.name,
            other.kind(),
            row
        ))),
    }
}

/// Calendar date of a timestamp cell; `None` for an absent cell
fn extract_date(value: &FieldValue) -> Result<Option<NaiveDate>, AnalysisError> {
    if value.is_absent() {
        return Ok(None);
    }
    match value {
        FieldValue::Timestamp(ts) => Ok(Some(ts.date_naive())),
        FieldValue::Number(v) => epoch_to_date(*v).map(Some),
        FieldValue::Text(s) => parse_date(s).map(Some),
        FieldValue::Absent => Ok(None),
    }
}

/// Unix epoch seconds to a UTC calendar date.
///
/// Bare numbers are taken as seconds, not nanoseconds, so
/// `1705320000` is 2024-01-15 rather than a moment in 1970.
fn epoch_to_date(seconds: f64) -> Result<NaiveDate, AnalysisError> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9) as u32;
    if !whole.is_finite() || whole.abs() > i64::MAX as f64 {
        return Err(AnalysisError::TimestampParse(format!(
            "epoch value {seconds} is out of range"
        )));
    }
    DateTime::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| {
            AnalysisError::TimestampParse(format!("epoch value {seconds} is out of range"))
        })
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_date(text: &str) -> Result<NaiveDate, AnalysisError> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(dt.date_naive());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.date());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    Err(AnalysisError::TimestampParse(format!(
        "unrecognized timestamp '{text}'"
    )))
}
