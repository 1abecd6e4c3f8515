//! # tydb
//!
//! A schema-first MySQL data-access layer.
//!
//! ## Features
//!
//! - **Parameterized SQL only**: values are always bound as `?`, identifiers are backtick-quoted
//! - **Filter mini-language**: `$eq` … `$nlike`, `$and` / `$or`, built in code or parsed from JSON
//! - **Schema registry**: entities, columns, defaults, validation rules and associations,
//!   frozen once at startup
//! - **Populate**: `BELONGS_TO`, `HAS_ONE`, `HAS_MANY` and `BELONGS_TO_MANY` associations are
//!   joined in one statement and the flat rows rebuilt into entity trees
//! - **Validated writes**: `insert` / `update` / `remove` check every field before any SQL is sent
//! - **Hooks**: inspect, log or veto every statement (`monitor`)
//!
//! ## Example
//!
//! ```ignore
//! use tydb::prelude::*;
//!
//! let registry = RegistryBuilder::new()
//!     .register(
//!         EntityBuilder::new("User", "users")
//!             .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
//!             .column_with("lastName", ColumnOptions::new(DataType::Varchar).required())
//!             .has_many("comments", "Comment", "userId"),
//!     )
//!     .register(
//!         EntityBuilder::new("Comment", "comments")
//!             .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
//!             .column("userId", DataType::Int),
//!     )
//!     .build()?;
//!
//! let db = Db::new(executor, registry);
//! let users = db
//!     .find_entities(
//!         "User",
//!         &Filter::new().eq("lastName", "Diaz"),
//!         &EntityFindOptions::new().populate("comments"),
//!     )
//!     .await?;
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod db;
pub mod ddl;
pub mod entity;
pub mod error;
pub mod filter;
pub mod ident;
pub mod materialize;
pub mod migrate;
pub mod monitor;
pub mod prelude;
pub mod query;
pub mod schema;
pub mod sql;
pub mod validate;
pub mod value;

pub use builder::{
    Aggregate, Direction, GroupBy, Join, JoinOn, JoinType, OrderBy, Pagination, SelectItem,
    TableRef,
};
pub use client::{ExecResult, Executor, Row, flat_row};
pub use config::DbConfig;
pub use db::Db;
pub use entity::{Entity, EntityState, FieldSource, Related};
pub use error::{OrmError, OrmResult};
pub use filter::{Clause, Filter, Op};
pub use ident::{ColumnRef, quote_ident};
pub use materialize::{materialize, materialize_one};
pub use migrate::{Migration, MigrationHandler};
pub use monitor::{
    CompositeHook, HookAction, QueryContext, QueryHook, QueryResult, QueryStats, QueryType,
    StatsHook,
};
pub use query::{
    CountOptions, EntityFindOptions, EntityQuery, FindOptions, MaterializePlan, Populate,
};
pub use schema::{
    Association, Cardinality, ColumnDef, ColumnOptions, DataType, DefaultValue, EntityBuilder,
    EntitySchema, Registry, RegistryBuilder,
};
pub use sql::{Sql, sql};
pub use validate::{Rule, ValidationErrors, ValidationReason};
pub use value::{FromValue, Record, Value};

#[cfg(feature = "tracing")]
pub use monitor::TracingSqlHook;
