//! Parameter-safe SQL accumulator.
//!
//! `Sql` keeps SQL text and bind parameters side by side. Every call to
//! [`Sql::push_bind`] emits exactly one `?` placeholder and appends exactly one
//! parameter, so the placeholder count always equals `params().len()` in the same
//! left-to-right order.
//!
//! # Example
//!
//! ```ignore
//! use tydb::sql;
//!
//! let mut q = sql("SELECT * FROM ");
//! q.push_ident("users")?;
//! q.push(" WHERE ").push_ident("name")?;
//! q.push(" = ").push_bind("Luis");
//! assert_eq!(q.sql(), "SELECT * FROM `users` WHERE `name` = ?");
//! # Ok::<(), tydb::OrmError>(())
//! ```

use crate::error::OrmResult;
use crate::ident::{ColumnRef, write_ident};
use crate::value::Value;

/// A compiled statement: SQL text plus its ordered bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sql {
    sql: String,
    params: Vec<Value>,
}

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            sql: initial_sql.into(),
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a statement from text that already contains its `?` placeholders.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append a `?` placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.sql.push('?');
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    ///
    /// If `values` is empty, this appends `NULL` (so `IN (NULL)` is valid SQL).
    pub fn push_bind_list<T>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self
    where
        T: Into<Value>,
    {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(first);
        for v in iter {
            self.push(", ");
            self.push_bind(v);
        }
        self
    }

    /// Append a backtick-quoted identifier.
    pub fn push_ident(&mut self, ident: &str) -> OrmResult<&mut Self> {
        write_ident(&mut self.sql, ident)?;
        Ok(self)
    }

    /// Append a (possibly table-qualified) column reference.
    pub fn push_column(&mut self, column: &ColumnRef) -> OrmResult<&mut Self> {
        column.write_sql(&mut self.sql)?;
        Ok(self)
    }

    /// Append another fragment, consuming it.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
        self
    }

    /// Whether no SQL text has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bind values in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Split into SQL text and bind values.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

impl std::fmt::Display for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}
