//! MedSynapse Insight - Analysis core for personal health data
//!
//! Turns tabular health records into summary statistics, anomaly flags,
//! per-day wearable aggregates and short human-readable insights through a
//! deterministic pipeline: table adaptation → statistics → imputation and
//! scaling → isolation-forest scoring → insight rules.
//!
//! ## Modules
//!
//! - **Lab analysis**: per-column mean, standard deviation and correlation plus anomaly rate
//! - **Wearable analysis**: daily heart rate, steps and sleep aggregates
//! - **Insights**: threshold rules over an analysis report
//!
//! ```ignore
//! use medsynapse_insight::{analyze_lab_results, generate_insights, Record};
//!
//! let records = vec![
//!     Record::new().with("glucose", 95).with("hb1ac", 5.2),
//!     Record::new().with("glucose", 110).with("hb1ac", 6.1),
//! ];
//! let report = analyze_lab_results(&records);
//! for insight in generate_insights(&report) {
//!     println!("{insight}");
//! }
//! ```

pub mod anomaly;
pub mod config;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod schema;
pub mod statistics;
pub mod temporal;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::AnalyzerConfig;
pub use error::AnalysisError;
pub use pipeline::{analyze_lab_results, analyze_wearable_data, generate_insights, HealthAnalyzer};

// Schema exports
pub use schema::{FieldValue, Record, Table, TableAdapter};

pub use types::{AnalysisReport, Insight, LabAnalysis, WearableAnalysis};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "medsynapse-insight";
