//! Adapter for converting record batches into a column-oriented table
//!
//! Columns appear in the order they are first seen across the batch. A key
//! missing from some record becomes an explicit `Absent` cell in that row, so
//! every column always has exactly one value per input row.

use crate::error::AnalysisError;
use crate::schema::record::{FieldValue, Record};
use std::collections::HashMap;

/// Adapter for turning caller input into a `Table`
pub struct TableAdapter;

impl TableAdapter {
    /// Parse a JSON string containing an array of flat records
    pub fn parse_array(json: &str) -> Result<Vec<Record>, AnalysisError> {
        serde_json::from_str(json).map_err(shape_error)
    }

    /// Parse NDJSON (newline-delimited JSON) containing one record per line
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<Record>, AnalysisError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(AnalysisError::InvalidInput(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Build the column-oriented view of a batch
    pub fn to_table(records: &[Record]) -> Table {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut columns: Vec<Column> = Vec::new();

        for (row, record) in records.iter().enumerate() {
            for (key, value) in record.iter() {
                let idx = *index.entry(key).or_insert_with(|| {
                    columns.push(Column {
                        name: key.to_string(),
                        values: vec![FieldValue::Absent; row],
                    });
                    columns.len() - 1
                });
                columns[idx].values.push(value.clone());
            }

            // Pad columns this record did not mention
            for column in columns.iter_mut() {
                if column.values.len() < row + 1 {
                    column.values.push(FieldValue::Absent);
                }
            }
        }

        Table {
            columns,
            row_count: records.len(),
        }
    }
}

/// Data-level serde errors are shape problems with the records themselves;
/// syntax errors stay JSON errors.
fn shape_error(e: serde_json::Error) -> AnalysisError {
    if e.is_data() {
        AnalysisError::InvalidInput(e.to_string())
    } else {
        AnalysisError::JsonError(e)
    }
}

/// A named column of cells aligned by row index
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<FieldValue>,
}

impl Column {
    /// Numeric view if every cell is a number or absent
    ///
    /// A column of only absent cells still counts; its statistics come out NaN.
    pub fn as_numeric(&self) -> Option<Vec<Option<f64>>> {
        self.values
            .iter()
            .map(|value| match value {
                FieldValue::Number(v) => Some((!v.is_nan()).then_some(*v)),
                FieldValue::Absent => Some(None),
                FieldValue::Text(_) | FieldValue::Timestamp(_) => None,
            })
            .collect()
    }
}

/// Column-oriented view of one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// The subset of columns that are entirely numeric or absent
    pub fn numeric_columns(&self) -> NumericColumnSet {
        let columns = self
            .columns
            .iter()
            .filter_map(|c| {
                c.as_numeric().map(|values| NumericColumn {
                    name: c.name.clone(),
                    values,
                })
            })
            .collect();

        NumericColumnSet {
            columns,
            row_count: self.row_count,
        }
    }
}

/// A numeric column; `None` marks an absent cell
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl NumericColumn {
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }
}

/// Numeric columns of a table, all with `row_count` cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericColumnSet {
    pub columns: Vec<NumericColumn>,
    pub row_count: usize,
}

impl NumericColumnSet {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns with at least one present value; the rest cannot be imputed
    pub fn scorable(&self) -> NumericColumnSet {
        NumericColumnSet {
            columns: self
                .columns
                .iter()
                .filter(|c| c.present().next().is_some())
                .cloned()
                .collect(),
            row_count: self.row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_rectangular() {
        let records = vec![
            Record::new().with("glucose", 95.0).with("hb1ac", 5.2),
            Record::new().with("hb1ac", 6.1).with("cholesterol", 220.0),
            Record::new(),
        ];
        let table = TableAdapter::to_table(&records);

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["glucose", "hb1ac", "cholesterol"]);
        for column in table.columns() {
            assert_eq!(column.values.len(), 3);
        }
        let cholesterol = table.column("cholesterol").unwrap();
        assert_eq!(cholesterol.values[0], FieldValue::Absent);
        assert_eq!(cholesterol.values[1], FieldValue::Number(220.0));
        assert_eq!(cholesterol.values[2], FieldValue::Absent);
    }

    #[test]
    fn test_numeric_columns_exclude_text() {
        let records = vec![
            Record::new().with("glucose", 95.0).with("patient", "a").with("note", FieldValue::Absent),
            Record::new().with("glucose", FieldValue::Absent).with("patient", "b"),
        ];
        let numeric = TableAdapter::to_table(&records).numeric_columns();

        assert_eq!(numeric.names(), vec!["glucose", "note"]);
        assert_eq!(numeric.columns[0].values, vec![Some(95.0), None]);
        assert_eq!(numeric.columns[1].values, vec![None, None]);
        assert_eq!(numeric.row_count, 2);

        assert_eq!(numeric.scorable().names(), vec!["glucose"]);
    }

    #[test]
    fn test_mixed_column_is_not_numeric() {
        let records = vec![
            Record::new().with("value", 1.0),
            Record::new().with("value", "high"),
        ];
        let numeric = TableAdapter::to_table(&records).numeric_columns();
        assert!(numeric.is_empty());
    }

    #[test]
    fn test_parse_array_nested_is_shape_error() {
        let result = TableAdapter::parse_array(r#"[{"a": 1}, {"a": [1, 2]}]"#);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_array_syntax_is_json_error() {
        let result = TableAdapter::parse_array("not json");
        assert!(matches!(result, Err(AnalysisError::JsonError(_))));
    }

    #[test]
    fn test_parse_ndjson() {
        let input = "{\"a\": 1}\n\n{\"a\": 2, \"b\": \"x\"}\n";
        let records = TableAdapter::parse_ndjson(input).unwrap();
        assert_eq!(records.len(), 2);

        let err = TableAdapter::parse_ndjson("{\"a\": 1}\n{oops").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
