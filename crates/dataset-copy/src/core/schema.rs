//! Dataset and column metadata types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared column type as reported by the metadata endpoint.
///
/// Unknown tags are carried through untouched so a schema can be copied to
/// the target exactly as the source declared it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    String,
    Long,
    Double,
    Decimal,
    Date,
    DateTime,
    Timestamp,
    Other(String),
}

impl ColumnType {
    /// Wire tag for this type.
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Long => "LONG",
            ColumnType::Double => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Date => "DATE",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Other(tag) => tag,
        }
    }

    /// Whether the column can carry a date range filter.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            ColumnType::Date | ColumnType::DateTime | ColumnType::Timestamp
        )
    }

    /// Whether values carry a time-of-day component.
    pub fn has_time(&self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Timestamp)
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        match tag.to_uppercase().as_str() {
            "STRING" => ColumnType::String,
            "LONG" => ColumnType::Long,
            "DOUBLE" => ColumnType::Double,
            "DECIMAL" => ColumnType::Decimal,
            "DATE" => ColumnType::Date,
            "DATETIME" => ColumnType::DateTime,
            "TIMESTAMP" => ColumnType::Timestamp,
            _ => ColumnType::Other(tag),
        }
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its dataset.
    pub name: String,

    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Read-only snapshot of a dataset taken at transfer start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Opaque dataset identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Approximate row count. Advisory only, may be stale.
    pub row_count: u64,

    /// Ordered column definitions.
    pub columns: Vec<Column>,
}

impl Dataset {
    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by exact name, falling back to a case-insensitive match.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name).or_else(|| {
            self.columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
        })
    }

    /// Columns that accept a date range filter.
    pub fn date_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.column_type.is_temporal())
            .collect()
    }
}

/// One entry of a dataset listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub row_count: Option<u64>,
}
