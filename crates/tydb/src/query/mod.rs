//! Statement assembly.
//!
//! Raw table queries combine the clause compilers from [`crate::builder`] into
//! complete statements. Entity queries ([`plan`]) additionally resolve populated
//! associations into joins and describe how the joined rows are materialized.
//!
//! Every statement ends with `;` and binds all values as `?` parameters:
//!
//! ```ignore
//! use tydb::query::{FindOptions, compile_find};
//! use tydb::Filter;
//!
//! let q = compile_find("users", &Filter::new().eq("name", "Luis"), &FindOptions::default())?;
//! assert_eq!(q.sql(), "SELECT * FROM `users` WHERE `name` = ? LIMIT ? OFFSET ?;");
//! # Ok::<(), tydb::OrmError>(())
//! ```

pub mod plan;

pub use plan::{
    EntityFindOptions, EntityQuery, Level, MaterializePlan, Populate, plan_count, plan_find,
    plan_find_one,
};

use crate::builder::{
    GroupBy, Join, OrderBy, Pagination, SelectItem, TableRef, compile_group_by, compile_join,
    compile_limit, compile_order_by, compile_select, compile_where,
};
use crate::error::{OrmError, OrmResult};
use crate::filter::Filter;
use crate::ident::ColumnRef;
use crate::sql::Sql;
use crate::value::Value;

/// Column alias `compile_count` reads the count under.
pub const COUNT_ALIAS: &str = "total";

/// Options for a raw find.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub select: Vec<SelectItem>,
    pub join: Vec<Join>,
    pub group_by: Vec<GroupBy>,
    pub order_by: Vec<OrderBy>,
    /// `None` uses the default page (page 1 of 1000 rows).
    pub pagination: Option<Pagination>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, item: impl Into<SelectItem>) -> Self {
        self.select.push(item.into());
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.join.push(join);
        self
    }

    pub fn group_by(mut self, column: impl Into<GroupBy>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn paginate(mut self, page: u64, per: u64) -> Self {
        self.pagination = Some(Pagination::new(page, per));
        self
    }
}

/// Options for a raw count.
#[derive(Debug, Clone, Default)]
pub struct CountOptions {
    /// Count non-null values of this column instead of rows.
    pub count_by: Option<ColumnRef>,
    pub join: Vec<Join>,
    pub group_by: Vec<GroupBy>,
}

impl CountOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count_by(mut self, column: impl Into<ColumnRef>) -> Self {
        self.count_by = Some(column.into());
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.join.push(join);
        self
    }

    pub fn group_by(mut self, column: impl Into<GroupBy>) -> Self {
        self.group_by.push(column.into());
        self
    }
}

fn push_from(q: &mut Sql, table: &TableRef) -> OrmResult<()> {
    q.push(" FROM ").push(&table.to_sql()?);
    Ok(())
}

/// `SELECT .. FROM .. [JOIN ..] [WHERE ..] [GROUP BY ..] [ORDER BY ..] LIMIT ? OFFSET ?;`
pub fn compile_find(
    table: impl Into<TableRef>,
    filter: &Filter,
    options: &FindOptions,
) -> OrmResult<Sql> {
    let page = options.pagination.unwrap_or_default();
    compile_paged(&table.into(), filter, options, page)
}

/// Like [`compile_find`], limited to a single row.
pub fn compile_find_one(
    table: impl Into<TableRef>,
    filter: &Filter,
    options: &FindOptions,
) -> OrmResult<Sql> {
    compile_paged(&table.into(), filter, options, Pagination::single())
}

pub(crate) fn compile_paged(
    table: &TableRef,
    filter: &Filter,
    options: &FindOptions,
    page: Pagination,
) -> OrmResult<Sql> {
    let mut q = compile_select(&options.select)?;
    push_from(&mut q, table)?;
    q.push_sql(compile_join(&options.join)?)
        .push_sql(compile_where(filter, false)?)
        .push_sql(compile_group_by(&options.group_by)?)
        .push_sql(compile_order_by(&options.order_by)?)
        .push_sql(compile_limit(page))
        .push(";");
    Ok(q)
}

/// `SELECT COUNT(*) AS `total` FROM .. [JOIN ..] [WHERE ..] [GROUP BY ..];`
pub fn compile_count(
    table: impl Into<TableRef>,
    filter: &Filter,
    options: &CountOptions,
) -> OrmResult<Sql> {
    let mut q = Sql::new("SELECT COUNT(");
    match &options.count_by {
        Some(column) => q.push_column(column)?,
        None => q.push("*"),
    };
    q.push(") AS ").push_ident(COUNT_ALIAS)?;
    push_from(&mut q, &table.into())?;
    q.push_sql(compile_join(&options.join)?)
        .push_sql(compile_where(filter, false)?)
        .push_sql(compile_group_by(&options.group_by)?)
        .push(";");
    Ok(q)
}

/// `INSERT INTO `t` (`a`, `b`) VALUES (?, ?);` in the given column order.
pub fn compile_insert<K: AsRef<str>>(
    table: &str,
    values: impl IntoIterator<Item = (K, Value)>,
) -> OrmResult<Sql> {
    let mut columns = Sql::empty();
    let mut binds = Sql::empty();
    for (i, (column, value)) in values.into_iter().enumerate() {
        if i > 0 {
            columns.push(", ");
            binds.push(", ");
        }
        columns.push_ident(column.as_ref())?;
        binds.push_bind(value);
    }
    if columns.is_empty() {
        return Err(OrmError::invalid_query(format!(
            "INSERT into '{table}' has no columns"
        )));
    }

    let mut q = Sql::new("INSERT INTO ");
    q.push_ident(table)?
        .push(" (")
        .push_sql(columns)
        .push(") VALUES (")
        .push_sql(binds)
        .push(");");
    Ok(q)
}

/// `UPDATE `t` SET `a` = ?, .. [WHERE ..];`
pub fn compile_update<K: AsRef<str>>(
    table: &str,
    set: impl IntoIterator<Item = (K, Value)>,
    filter: &Filter,
) -> OrmResult<Sql> {
    let mut q = Sql::new("UPDATE ");
    q.push_ident(table)?;
    let mut empty = true;
    for (column, value) in set {
        q.push(if empty { " SET " } else { ", " });
        q.push_ident(column.as_ref())?.push(" = ").push_bind(value);
        empty = false;
    }
    if empty {
        return Err(OrmError::invalid_query(format!(
            "UPDATE of '{table}' has no columns to set"
        )));
    }
    q.push_sql(compile_where(filter, false)?).push(";");
    Ok(q)
}

/// `DELETE FROM `t` [WHERE ..];`
pub fn compile_delete(table: &str, filter: &Filter) -> OrmResult<Sql> {
    let mut q = Sql::new("DELETE FROM ");
    q.push_ident(table)?
        .push_sql(compile_where(filter, false)?)
        .push(";");
    Ok(q)
}

#[cfg(test)]
mod tests;
