//! JOIN clause compilation.

use super::select::TableRef;
use crate::error::OrmResult;
use crate::ident::ColumnRef;
use crate::sql::Sql;

/// The type of JOIN operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Cross => "CROSS",
        }
    }
}

/// One side of a join condition: a bare column or a `(table, column)` pair.
pub type JoinOn = ColumnRef;

/// `<TYPE> JOIN <table>[ AS alias] ON <on> = <with>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinType,
    pub table: TableRef,
    pub on: JoinOn,
    pub with: JoinOn,
}

impl Join {
    pub fn new(
        kind: JoinType,
        table: impl Into<TableRef>,
        on: impl Into<JoinOn>,
        with: impl Into<JoinOn>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            on: on.into(),
            with: with.into(),
        }
    }

    pub fn inner(
        table: impl Into<TableRef>,
        on: impl Into<JoinOn>,
        with: impl Into<JoinOn>,
    ) -> Self {
        Self::new(JoinType::Inner, table, on, with)
    }

    pub fn left(
        table: impl Into<TableRef>,
        on: impl Into<JoinOn>,
        with: impl Into<JoinOn>,
    ) -> Self {
        Self::new(JoinType::Left, table, on, with)
    }
}

/// Compile a list of joins; each join starts with a space.
pub fn compile_join(joins: &[Join]) -> OrmResult<Sql> {
    let mut q = Sql::empty();
    for join in joins {
        q.push(" ").push(join.kind.as_sql()).push(" JOIN ");
        let mut table = String::new();
        join.table.write_sql(&mut table)?;
        q.push(&table).push(" ON ");
        q.push_column(&join.on)?.push(" = ");
        q.push_column(&join.with)?;
    }
    Ok(q)
}
