//! Caller input schema
//!
//! This module defines the flat record type callers hand to the analyzer and
//! the adapter that turns a batch of records into a column-oriented table.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
