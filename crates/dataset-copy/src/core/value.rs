//! Row values and chunks.
//!
//! A row is a fixed-order tuple aligned to the resolved schema's column list.
//! Values coming back from the query endpoint are projected onto that order
//! by a [`RowLayout`]; a response column the schema does not know about is
//! rejected instead of being carried along as an ad hoc field.

use std::borrow::Cow;

use crate::error::{CopyError, Result};

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl Value {
    /// Convert a JSON cell from the query endpoint.
    ///
    /// Numbers keep the exact token the endpoint sent.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Text(n.to_string()),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }

    /// Convert a delimited-text field. Empty fields are null.
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Value::Null
        } else {
            Value::Text(field.to_string())
        }
    }

    /// Render as a delimited-text field.
    pub fn to_field(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text view of the value, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One row, ordered like the schema.
pub type Row = Vec<Value>;

/// A bounded batch of rows in transit between read and stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Column names, in schema order.
    pub columns: Vec<String>,
    /// Rows, each aligned to `columns`.
    pub rows: Vec<Row>,
}

impl Chunk {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Projection of response columns onto schema positions.
#[derive(Debug, Clone)]
pub struct RowLayout {
    /// For each response column, its position in the schema.
    positions: Vec<usize>,
    width: usize,
}

impl RowLayout {
    /// Build a layout, rejecting response columns absent from the schema.
    ///
    /// Matching is exact first, then case-insensitive. Schema columns the
    /// response does not mention are filled with nulls.
    pub fn new(schema: &[String], response: &[String]) -> Result<Self> {
        let mut positions = Vec::with_capacity(response.len());
        for name in response {
            let pos = schema
                .iter()
                .position(|c| c == name)
                .or_else(|| schema.iter().position(|c| c.eq_ignore_ascii_case(name)))
                .ok_or_else(|| {
                    CopyError::Schema(format!(
                        "column '{}' returned by the source is not in the dataset schema",
                        name
                    ))
                })?;
            if positions.contains(&pos) {
                return Err(CopyError::Schema(format!(
                    "column '{}' appears more than once in the response",
                    name
                )));
            }
            positions.push(pos);
        }
        Ok(Self {
            positions,
            width: schema.len(),
        })
    }

    /// Whether response order already equals schema order.
    pub fn is_identity(&self) -> bool {
        self.positions.len() == self.width && self.positions.iter().enumerate().all(|(i, &p)| i == p)
    }

    /// Place one response row into schema order.
    pub fn project(&self, cells: Vec<Value>) -> Result<Row> {
        if cells.len() != self.positions.len() {
            return Err(CopyError::Schema(format!(
                "row has {} values but the response declared {} columns",
                cells.len(),
                self.positions.len()
            )));
        }
        if self.is_identity() {
            return Ok(cells);
        }
        let mut row = vec![Value::Null; self.width];
        for (cell, &pos) in cells.into_iter().zip(self.positions.iter()) {
            row[pos] = cell;
        }
        Ok(row)
    }
}
