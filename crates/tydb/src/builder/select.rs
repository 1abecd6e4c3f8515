//! SELECT list compilation.

use crate::error::OrmResult;
use crate::ident::write_ident;
use crate::sql::Sql;

/// Aggregate (or DISTINCT) wrapper applied to a selected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Distinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Distinct => "DISTINCT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// One entry of a SELECT list: `[AGG(][`table`.]`column`[)] [AS `alias`]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub column: String,
    pub alias: Option<String>,
    pub table: Option<String>,
    pub aggregate: Option<Aggregate>,
}

impl SelectItem {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
            table: None,
            aggregate: None,
        }
    }

    /// Every column of one table: `` `table`.* ``.
    pub fn all_of(table: impl Into<String>) -> Self {
        Self::new("*").table(table)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    fn write_sql(&self, out: &mut Sql) -> OrmResult<()> {
        if let Some(agg) = self.aggregate {
            out.push(agg.as_sql()).push("(");
        }
        if let Some(table) = &self.table {
            out.push_ident(table)?.push(".");
        }
        out.push_ident(&self.column)?;
        if self.aggregate.is_some() {
            out.push(")");
        }
        if let Some(alias) = &self.alias {
            out.push(" AS ").push_ident(alias)?;
        }
        Ok(())
    }
}

impl From<&str> for SelectItem {
    fn from(column: &str) -> Self {
        Self::new(column)
    }
}

impl From<String> for SelectItem {
    fn from(column: String) -> Self {
        Self::new(column)
    }
}

/// Compile `SELECT <list>`; an empty list selects `*`.
pub fn compile_select(items: &[SelectItem]) -> OrmResult<Sql> {
    let mut q = Sql::new("SELECT ");
    if items.is_empty() {
        q.push("*");
        return Ok(q);
    }
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        item.write_sql(&mut q)?;
    }
    Ok(q)
}

/// A table in FROM/JOIN position, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name rows of this table are labeled with: the alias if any, else the table.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    pub(crate) fn write_sql(&self, out: &mut String) -> OrmResult<()> {
        write_ident(out, &self.table)?;
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            write_ident(out, alias)?;
        }
        Ok(())
    }

    /// Render `` `table`[ AS `alias`] ``.
    pub fn to_sql(&self) -> OrmResult<String> {
        let mut out = String::new();
        self.write_sql(&mut out)?;
        Ok(out)
    }
}

impl From<&str> for TableRef {
    fn from(table: &str) -> Self {
        Self::new(table)
    }
}

impl From<String> for TableRef {
    fn from(table: String) -> Self {
        Self::new(table)
    }
}
