//! Date range predicate builder.
//!
//! Turns a caller's (column, start, end) selection into a filter that is
//! pushed down to the source query. Only date/time columns qualify. A column
//! that cannot be resolved against the schema degrades to "no filter" with a
//! warning rather than failing the transfer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::identifier::{date_literal, datetime_literal, quote_ident, validate_identifier};
use crate::core::{ColumnType, Dataset};
use crate::error::{CopyError, Result};

/// Caller-supplied date range selection, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFilter {
    pub column: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateFilter {
    pub fn new(column: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            column: column.into(),
            start,
            end,
        }
    }
}

/// A validated inclusive range filter on a date/time column.
///
/// Only [`build_predicate`] creates one, so the column is always a known,
/// temporal schema column with a valid identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    column: String,
    column_type: ColumnType,
    start: NaiveDate,
    end: NaiveDate,
}

impl Predicate {
    /// Schema name of the filtered column.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Render as `col >= start AND col <= end` for DATE columns.
    ///
    /// Columns with a time component get an exclusive bound at midnight after
    /// the end day.
    pub fn to_sql(&self) -> Result<String> {
        let col = quote_ident(&self.column)?;
        if !self.column_type.has_time() {
            let (lower, upper) = (date_literal(self.start), date_literal(self.end));
            return Ok(format!("{col} >= {lower} AND {col} <= {upper}"));
        }

        let (Some(lower), Some(upper)) = (
            self.start.and_hms_opt(0, 0, 0),
            self.end.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)),
        ) else {
            return Err(CopyError::Config(format!(
                "invalid date range {}..{}",
                self.start, self.end
            )));
        };
        let (lower, upper) = (datetime_literal(lower), datetime_literal(upper));
        Ok(format!("{col} >= {lower} AND {col} < {upper}"))
    }

    /// Human-readable summary for status messages.
    pub fn describe(&self) -> String {
        format!("{} between {} and {}", self.column, self.start, self.end)
    }
}

/// Resolve a date filter against the dataset schema.
///
/// Exact column match first, then case-insensitive. Returns `None` (copy all
/// rows) when the column is absent, not date/time typed, or not a usable
/// identifier.
pub fn build_predicate(dataset: &Dataset, filter: &DateFilter) -> Option<Predicate> {
    let Some(column) = dataset.find_column(&filter.column) else {
        warn!(
            "{}: filter column '{}' not found in schema, copying all rows",
            dataset.name, filter.column
        );
        return None;
    };

    if !column.column_type.is_temporal() {
        warn!(
            "{}: filter column '{}' has type {}, only DATE/DATETIME/TIMESTAMP can be filtered; copying all rows",
            dataset.name, column.name, column.column_type
        );
        return None;
    }

    if let Err(e) = validate_identifier(&column.name) {
        warn!("{}: {}; copying all rows", dataset.name, e);
        return None;
    }

    if filter.start > filter.end {
        warn!(
            "{}: filter start {} is after end {}, no rows will match",
            dataset.name, filter.start, filter.end
        );
    }

    if column.name != filter.column {
        debug!(
            "{}: filter column '{}' resolved to '{}'",
            dataset.name, filter.column, column.name
        );
    }

    Some(Predicate {
        column: column.name.clone(),
        column_type: column.column_type.clone(),
        start: filter.start,
        end: filter.end,
    })
}
