//! GROUP BY, ORDER BY and LIMIT/OFFSET compilation.

use crate::error::OrmResult;
use crate::ident::ColumnRef;
use crate::sql::Sql;

/// Row ceiling applied to finds that do not paginate explicitly.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// A GROUP BY entry.
pub type GroupBy = ColumnRef;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// Page-based pagination; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per: u64,
}

impl Pagination {
    pub fn new(page: u64, per: u64) -> Self {
        Self { page, per }
    }

    /// A single row: find-one semantics.
    pub fn single() -> Self {
        Self::new(1, 1)
    }

    pub fn offset(&self) -> u64 {
        self.per.saturating_mul(self.page.max(1) - 1)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

fn push_column_list(q: &mut Sql, keyword: &str, columns: &[ColumnRef]) -> OrmResult<()> {
    for (i, column) in columns.iter().enumerate() {
        q.push(if i == 0 { keyword } else { ", " });
        q.push_column(column)?;
    }
    Ok(())
}

/// ` GROUP BY a, b`; empty when there are no columns.
pub fn compile_group_by(columns: &[GroupBy]) -> OrmResult<Sql> {
    let mut q = Sql::empty();
    push_column_list(&mut q, " GROUP BY ", columns)?;
    Ok(q)
}

/// ` ORDER BY a ASC, b DESC`; empty when there are no entries.
pub fn compile_order_by(entries: &[OrderBy]) -> OrmResult<Sql> {
    let mut q = Sql::empty();
    for (i, entry) in entries.iter().enumerate() {
        q.push(if i == 0 { " ORDER BY " } else { ", " });
        q.push_column(&entry.column)?
            .push(" ")
            .push(entry.direction.as_sql());
    }
    Ok(q)
}

/// ` LIMIT ? OFFSET ?` with params `[per, per * (page - 1)]`.
pub fn compile_limit(page: Pagination) -> Sql {
    let mut q = Sql::new(" LIMIT ");
    q.push_bind(to_i64(page.per))
        .push(" OFFSET ")
        .push_bind(to_i64(page.offset()));
    q
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
