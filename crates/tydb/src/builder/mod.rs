//! Clause compilers.
//!
//! Each compiler renders one clause of a statement from its structured
//! description into a [`Sql`](crate::sql::Sql) fragment. Fragments that follow
//! the table name (`WHERE`, `JOIN`, `GROUP BY`, `ORDER BY`, `LIMIT`) start with a
//! space, and an empty description renders an empty fragment, so the query
//! assembler can concatenate them unconditionally.
//!
//! - Identifiers are backtick-quoted; values are always bound as `?`.
//! - Parameters of every fragment line up with its placeholders left to right.

pub mod clause;
pub mod join;
pub mod select;
pub mod where_builder;

pub use clause::{
    DEFAULT_PAGE_SIZE, Direction, GroupBy, OrderBy, Pagination, compile_group_by,
    compile_limit, compile_order_by,
};
pub use join::{Join, JoinOn, JoinType, compile_join};
pub use select::{Aggregate, SelectItem, TableRef, compile_select};
pub use where_builder::compile_where;

#[cfg(test)]
mod tests;
