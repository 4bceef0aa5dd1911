//! In-memory table with ordered columns and nullable string cells.

use receiptflow_core::PipelineError;
use serde_json::{Map, Value};

use crate::accessor::is_na;

/// A single cell. `None` is a null (an empty field on disk).
pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from string literals; empty strings become nulls.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Result<Self, PipelineError> {
        let mut table = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|v| non_empty(v)).collect())?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the values of one column, or `None` if it doesn't exist.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), PipelineError> {
        if row.len() != self.columns.len() {
            return Err(PipelineError::Format(format!(
                "row has {} fields but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append all rows of `other` after the existing rows.
    ///
    /// Columns must match exactly, in order.
    pub fn append(&mut self, other: Table) -> Result<(), PipelineError> {
        if self.columns != other.columns {
            return Err(PipelineError::SchemaMismatch {
                expected: self.columns.clone(),
                found: other.columns,
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Convert an extractor mapping into rows.
    ///
    /// Accepts an object of scalars (one row), an object holding
    /// equal-length arrays (scalars are broadcast), or an array of objects.
    pub fn from_json(value: &Value) -> Result<Self, PipelineError> {
        let table = match value {
            Value::Null => Self::default(),
            Value::Object(map) => Self::from_object(map)?,
            Value::Array(items) => Self::from_records(items)?,
            other => {
                return Err(PipelineError::Extraction(format!(
                    "expected an object or array of records, got {}",
                    json_type(other)
                )))
            }
        };
        if table.is_empty() {
            return Err(PipelineError::Extraction("extractor returned no data".into()));
        }
        Ok(table)
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self, PipelineError> {
        let mut height: Option<usize> = None;
        for (key, value) in map {
            if let Value::Array(values) = value {
                match height {
                    None => height = Some(values.len()),
                    Some(h) if h != values.len() => {
                        return Err(PipelineError::Extraction(format!(
                            "column '{key}' has {} values, expected {h}",
                            values.len()
                        )))
                    }
                    Some(_) => {}
                }
            }
        }

        let mut table = Self::new(map.keys().cloned().collect());
        if map.is_empty() {
            return Ok(table);
        }
        for i in 0..height.unwrap_or(1) {
            let mut row = Vec::with_capacity(map.len());
            for (key, value) in map {
                let cell = match value {
                    Value::Array(values) => &values[i],
                    scalar => scalar,
                };
                row.push(scalar_cell(key, cell)?);
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    fn from_records(items: &[Value]) -> Result<Self, PipelineError> {
        let mut records = Vec::with_capacity(items.len());
        let mut columns: Vec<String> = Vec::new();
        for item in items {
            let Value::Object(record) = item else {
                return Err(PipelineError::Extraction(format!(
                    "expected every record to be an object, got {}",
                    json_type(item)
                )));
            };
            for key in record.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
            records.push(record);
        }

        let mut table = Self::new(columns);
        for record in records {
            let mut row = Vec::with_capacity(table.columns.len());
            for column in &table.columns {
                row.push(match record.get(column) {
                    Some(value) => scalar_cell(column, value)?,
                    None => None,
                });
            }
            table.rows.push(row);
        }
        Ok(table)
    }
}

fn scalar_cell(column: &str, value: &Value) -> Result<Cell, PipelineError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if is_na(s) => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        nested => Err(PipelineError::Extraction(format!(
            "column '{column}' holds a nested {}",
            json_type(nested)
        ))),
    }
}

fn non_empty(s: &str) -> Cell {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
