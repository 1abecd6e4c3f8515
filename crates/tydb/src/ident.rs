//! Safe SQL identifier handling.
//!
//! Identifiers are the only text interpolated into SQL; everything else is bound as a
//! parameter. Identifiers are delimited with backticks, embedded backticks are doubled,
//! and the wildcard `*` is emitted bare.
//!
//! A filter or order key of the reserved form `$t.<table>.<column>` names a
//! table-qualified column:
//!
//! ```ignore
//! use tydb::ColumnRef;
//!
//! let c = ColumnRef::parse("$t.users.lastName")?;
//! assert_eq!(c.to_sql()?, "`users`.`lastName`");
//! # Ok::<(), tydb::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// Prefix marking a table-qualified key.
pub const TABLE_MARKER: &str = "$t.";

/// Append a backtick-quoted identifier to `out`.
pub(crate) fn write_ident(out: &mut String, name: &str) -> OrmResult<()> {
    if name == "*" {
        out.push('*');
        return Ok(());
    }
    if name.is_empty() {
        return Err(OrmError::invalid_query("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(OrmError::invalid_query(
            "Identifier cannot contain NUL character",
        ));
    }
    out.reserve(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        if ch == '`' {
            out.push_str("``");
        } else {
            out.push(ch);
        }
    }
    out.push('`');
    Ok(())
}

/// Quote a single identifier: `users` → `` `users` ``.
pub fn quote_ident(name: &str) -> OrmResult<String> {
    let mut out = String::with_capacity(name.len() + 2);
    write_ident(&mut out, name)?;
    Ok(out)
}

/// A column reference, optionally qualified by its table (or table alias).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// An unqualified column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// A table-qualified column.
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Parse a filter key.
    ///
    /// - `name` → unqualified column
    /// - `$t.table.column` → qualified column
    pub fn parse(key: &str) -> OrmResult<Self> {
        let Some(rest) = key.strip_prefix(TABLE_MARKER) else {
            return Ok(Self::new(key));
        };
        let mut parts = rest.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(table), Some(column), None) if !table.is_empty() && !column.is_empty() => {
                Ok(Self::qualified(table, column))
            }
            _ => Err(OrmError::invalid_query(format!(
                "Expected '{TABLE_MARKER}<table>.<column>', got '{key}'"
            ))),
        }
    }

    /// Render as the reserved key form accepted by [`ColumnRef::parse`].
    pub fn to_key(&self) -> String {
        match &self.table {
            Some(table) => format!("{TABLE_MARKER}{table}.{}", self.column),
            None => self.column.clone(),
        }
    }

    pub(crate) fn write_sql(&self, out: &mut String) -> OrmResult<()> {
        if let Some(table) = &self.table {
            write_ident(out, table)?;
            out.push('.');
        }
        write_ident(out, &self.column)
    }

    /// Render the quoted (optionally qualified) identifier.
    pub fn to_sql(&self) -> OrmResult<String> {
        let mut out = String::new();
        self.write_sql(&mut out)?;
        Ok(out)
    }
}

impl From<&str> for ColumnRef {
    fn from(column: &str) -> Self {
        Self::new(column)
    }
}

impl From<String> for ColumnRef {
    fn from(column: String) -> Self {
        Self::new(column)
    }
}

impl From<(&str, &str)> for ColumnRef {
    fn from((table, column): (&str, &str)) -> Self {
        Self::qualified(table, column)
    }
}
