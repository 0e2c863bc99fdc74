//! Identifier validation and literal rendering for source queries.
//!
//! Column identifiers cannot be bound as query parameters, so they are
//! validated and quoted here. Filter bounds never come from caller text:
//! they are typed dates formatted by the engine, which leaves no room for
//! injected syntax.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{CopyError, Result};

/// Maximum identifier length accepted in a query.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing control characters (null bytes, newlines)
/// - Identifiers exceeding maximum length
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CopyError::Config("Identifier cannot be empty".to_string()));
    }

    if name.chars().any(char::is_control) {
        return Err(CopyError::Config(format!(
            "SECURITY: Identifier contains control characters (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(CopyError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote an identifier with backticks, doubling embedded backticks.
///
/// ```ignore
/// assert_eq!(quote_ident("order date")?, "`order date`");
/// assert_eq!(quote_ident("a`b")?, "`a``b`");
/// ```
pub fn quote_ident(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{}`", name.replace('`', "``")))
}

/// Render a date as a quoted literal.
pub fn date_literal(date: NaiveDate) -> String {
    format!("'{}'", date.format("%Y-%m-%d"))
}

/// Render a timestamp as a quoted literal.
pub fn datetime_literal(ts: NaiveDateTime) -> String {
    format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S"))
}
