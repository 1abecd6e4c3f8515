//! Entity schemas and the schema registry.
//!
//! A schema is described once with [`EntityBuilder`], checked and frozen by
//! [`RegistryBuilder::build`], and then only read:
//!
//! ```ignore
//! use tydb::schema::{ColumnOptions, DataType, DefaultValue, EntityBuilder, RegistryBuilder};
//!
//! let registry = RegistryBuilder::new()
//!     .register(
//!         EntityBuilder::new("User", "users")
//!             .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
//!             .column_with("lastName", ColumnOptions::new(DataType::Varchar).required())
//!             .column("firstName", DataType::Varchar)
//!             .column_with(
//!                 "createdAt",
//!                 ColumnOptions::new(DataType::DateTime).default(DefaultValue::Now),
//!             )
//!             .has_many("comments", "Comment", "userId"),
//!     )
//!     .register(
//!         EntityBuilder::new("Comment", "comments")
//!             .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
//!             .column("userId", DataType::Int)
//!             .belongs_to("user", "User", "userId"),
//!     )
//!     .build()?;
//! # Ok::<(), tydb::OrmError>(())
//! ```

mod association;
mod registry;

pub use association::{Association, Cardinality};
pub use registry::{EntityBuilder, Registry, RegistryBuilder};

use crate::ddl::{ColumnSpec, create_table};
use crate::error::OrmResult;
use crate::sql::Sql;
use crate::validate::Rule;
use crate::value::Value;
use chrono::Local;
use std::fmt;
use std::sync::OnceLock;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Varchar,
    Text,
    LongText,
    TinyInt,
    SmallInt,
    MediumInt,
    Int,
    BigInt,
    Decimal,
    Date,
    DateTime,
    Boolean,
}

impl DataType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            DataType::Varchar => "VARCHAR",
            DataType::Text => "TEXT",
            DataType::LongText => "LONGTEXT",
            DataType::TinyInt => "TINYINT",
            DataType::SmallInt => "SMALLINT",
            DataType::MediumInt => "MEDIUMINT",
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::Boolean => "BOOLEAN",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt
                | DataType::SmallInt
                | DataType::MediumInt
                | DataType::Int
                | DataType::BigInt
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Varchar | DataType::Text | DataType::LongText)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Value used when a column has no input.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Value(Value),
    /// Called each time a default is needed.
    Generator(fn() -> Value),
    /// The current local date or timestamp.
    Now,
    /// A time-based UUID rendered as text.
    UuidV1,
    /// A random UUID rendered as text.
    UuidV4,
}

impl DefaultValue {
    /// Produce the default for a column of `data_type`.
    pub fn resolve(&self, data_type: DataType) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Generator(f) => f(),
            DefaultValue::Now => {
                let now = Local::now().naive_local();
                match data_type {
                    DataType::Date => Value::Date(now.date()),
                    _ => Value::DateTime(now),
                }
            }
            DefaultValue::UuidV1 => Value::Text(uuid::Uuid::now_v1(node_id()).to_string()),
            DefaultValue::UuidV4 => Value::Text(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// The fixed value, if this default is one (only those are emitted as DDL defaults).
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            DefaultValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Random per-process node id for v1 UUIDs.
fn node_id() -> &'static [u8; 6] {
    static NODE: OnceLock<[u8; 6]> = OnceLock::new();
    NODE.get_or_init(|| {
        let random = uuid::Uuid::new_v4();
        let bytes = random.as_bytes();
        let mut node = [0u8; 6];
        node.copy_from_slice(&bytes[10..16]);
        node
    })
}

/// A frozen column description.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Field name on the entity.
    pub field: String,
    /// Column name in the table.
    pub storage: String,
    pub data_type: DataType,
    pub size: Option<u32>,
    pub scale: Option<u32>,
    pub default: Option<DefaultValue>,
    pub required: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub rules: Vec<Rule>,
}

impl ColumnDef {
    /// Resolve this column's default, or `Null` when it has none.
    pub fn default_value(&self) -> Value {
        self.default
            .as_ref()
            .map_or(Value::Null, |d| d.resolve(self.data_type))
    }

    fn ddl_spec(&self) -> ColumnSpec {
        ColumnSpec {
            size: self.size,
            scale: self.scale,
            nullable: !self.required && !self.primary_key,
            primary_key: self.primary_key,
            unique: self.unique,
            auto_increment: self.auto_increment,
            default: self.default.as_ref().and_then(DefaultValue::as_value).cloned(),
        }
    }
}

/// Full-options column form for [`EntityBuilder::column_with`].
#[derive(Debug, Clone)]
pub struct ColumnOptions {
    data_type: DataType,
    storage: Option<String>,
    size: Option<u32>,
    scale: Option<u32>,
    default: Option<DefaultValue>,
    required: bool,
    primary_key: bool,
    auto_increment: bool,
    unique: bool,
    rules: Vec<Rule>,
}

impl ColumnOptions {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            storage: None,
            size: None,
            scale: None,
            default: None,
            required: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            rules: Vec::new(),
        }
    }

    /// Store the field under a different column name.
    pub fn column(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Shorthand for a fixed default value.
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        self.default(DefaultValue::Value(value.into()))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub(crate) fn into_column(self, field: impl Into<String>) -> ColumnDef {
        let field = field.into();
        ColumnDef {
            storage: self.storage.unwrap_or_else(|| field.clone()),
            field,
            data_type: self.data_type,
            size: self.size,
            scale: self.scale,
            default: self.default,
            required: self.required,
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            unique: self.unique,
            rules: self.rules,
        }
    }
}

impl From<DataType> for ColumnOptions {
    fn from(data_type: DataType) -> Self {
        Self::new(data_type)
    }
}

/// The frozen description of one entity type.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    table: String,
    columns: Vec<ColumnDef>,
    primary_key: usize,
    associations: Vec<Association>,
}

impl EntitySchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Column by field name.
    pub fn column(&self, field: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Column by storage name.
    pub fn column_by_storage(&self, storage: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.storage == storage)
    }

    pub fn primary_key(&self) -> &ColumnDef {
        &self.columns[self.primary_key]
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    /// Association by its local name.
    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name() == name)
    }

    /// First association whose target is the entity `target`.
    pub fn association_to(&self, target: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.target() == target)
    }

    /// Storage column for a field, falling back to the name itself.
    pub fn storage_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.column(field).map_or(field, |c| c.storage.as_str())
    }

    /// `CREATE TABLE IF NOT EXISTS` for this entity.
    pub fn create_table(&self) -> OrmResult<Sql> {
        self.columns
            .iter()
            .fold(create_table(&self.table, true), |q, c| {
                q.column(&c.storage, c.data_type, c.ddl_spec())
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_resolve_by_field_or_storage_name() {
        let registry = RegistryBuilder::new()
            .register(
                EntityBuilder::new("User", "users")
                    .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
                    .column_with(
                        "lastName",
                        ColumnOptions::new(DataType::Varchar).column("last_name"),
                    ),
            )
            .build()
            .unwrap();
        let schema = registry.entity("User").unwrap();

        assert_eq!(schema.column_by_storage("last_name").unwrap().field, "lastName");
        assert!(schema.column_by_storage("lastName").is_none());
        assert_eq!(schema.column("lastName").unwrap().storage, "last_name");
        assert_eq!(schema.storage_name("lastName"), "last_name");
        assert_eq!(schema.storage_name("unknown"), "unknown");
    }

    #[test]
    fn now_default_follows_column_type() {
        assert!(matches!(
            DefaultValue::Now.resolve(DataType::DateTime),
            Value::DateTime(_)
        ));
        assert!(matches!(
            DefaultValue::Now.resolve(DataType::Date),
            Value::Date(_)
        ));
    }

    #[test]
    fn uuid_defaults_are_text_and_distinct() {
        let a = DefaultValue::UuidV4.resolve(DataType::Varchar);
        let b = DefaultValue::UuidV4.resolve(DataType::Varchar);
        assert_ne!(a, b);
        let v1 = DefaultValue::UuidV1.resolve(DataType::Varchar);
        let text = v1.as_str().unwrap();
        assert_eq!(uuid::Uuid::parse_str(text).unwrap().get_version_num(), 1);
    }

    #[test]
    fn generator_default_is_called() {
        fn seven() -> Value {
            Value::Int(7)
        }
        let col = ColumnOptions::new(DataType::Int)
            .default(DefaultValue::Generator(seven))
            .into_column("n");
        assert_eq!(col.default_value(), Value::Int(7));
    }
}
