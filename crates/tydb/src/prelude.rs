//! Convenient imports for typical `tydb` usage.
//!
//! ```ignore
//! use tydb::prelude::*;
//! ```

pub use crate::{
    ColumnOptions, DataType, Db, DbConfig, DefaultValue, Entity, EntityBuilder,
    EntityFindOptions, Executor, Filter, OrderBy, OrmError, OrmResult, Pagination, Populate,
    RegistryBuilder, Rule, Sql, Value, sql,
};
