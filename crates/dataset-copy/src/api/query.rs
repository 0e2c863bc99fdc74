//! Structured source queries.
//!
//! Queries are assembled from typed parts and rendered here, never
//! concatenated from caller input. The query endpoint addresses the dataset
//! by id in the URL, so the row source is always the literal `table`.

use crate::error::Result;
use crate::source::Predicate;

/// What a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// All columns, every matching row.
    Rows,
    /// A single `row_count` cell.
    Count,
}

/// A query against one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    pub projection: Projection,
    pub filter: Option<Predicate>,
    pub limit: Option<usize>,
    pub offset: u64,
}

/// Column alias used by count queries.
pub const COUNT_COLUMN: &str = "row_count";

impl SourceQuery {
    /// Every matching row in one response.
    pub fn all(filter: Option<Predicate>) -> Self {
        Self {
            projection: Projection::Rows,
            filter,
            limit: None,
            offset: 0,
        }
    }

    /// One page of matching rows.
    pub fn page(filter: Option<Predicate>, limit: usize, offset: u64) -> Self {
        Self {
            projection: Projection::Rows,
            filter,
            limit: Some(limit),
            offset,
        }
    }

    /// Exact count of matching rows.
    pub fn count(filter: Option<Predicate>) -> Self {
        Self {
            projection: Projection::Count,
            filter,
            limit: None,
            offset: 0,
        }
    }

    /// Render the query text.
    pub fn to_sql(&self) -> Result<String> {
        let mut sql = match self.projection {
            Projection::Rows => "SELECT * FROM table".to_string(),
            Projection::Count => format!("SELECT COUNT(*) AS {} FROM table", COUNT_COLUMN),
        };

        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&filter.to_sql()?);
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, self.offset));
        }

        Ok(sql)
    }
}
