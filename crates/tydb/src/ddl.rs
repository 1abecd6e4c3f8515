//! Table DDL templates: CREATE / ALTER / DROP / RENAME TABLE.
//!
//! ```ignore
//! use tydb::ddl::{ColumnSpec, create_table};
//! use tydb::DataType;
//!
//! let q = create_table("users", true)
//!     .column("id", DataType::Int, ColumnSpec::new().primary_key().auto_increment())
//!     .column("name", DataType::Varchar, ColumnSpec::new().size(100))
//!     .build()?;
//! assert_eq!(
//!     q.sql(),
//!     "CREATE TABLE IF NOT EXISTS `users` (`id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`), `name` VARCHAR(100) NOT NULL);"
//! );
//! # Ok::<(), tydb::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};
use crate::schema::DataType;
use crate::sql::Sql;
use crate::value::Value;

const DEFAULT_VARCHAR_SIZE: u32 = 255;
const DEFAULT_DECIMAL_PRECISION: u32 = 10;
const DEFAULT_DECIMAL_SCALE: u32 = 2;

/// Column attributes for CREATE / ALTER.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSpec {
    pub size: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub default: Option<Value>,
}

impl ColumnSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Digits after the decimal point (DECIMAL only).
    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Where an ALTERed column is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    First,
    After(String),
}

/// `<type>[(size)] NULL|NOT NULL [UNIQUE] [AUTO_INCREMENT] [DEFAULT ?]`
fn push_column_type(q: &mut Sql, data_type: DataType, spec: &ColumnSpec) {
    q.push(" ").push(data_type.as_sql());
    match data_type {
        DataType::Decimal => {
            let precision = spec.size.unwrap_or(DEFAULT_DECIMAL_PRECISION);
            let scale = spec.scale.unwrap_or(DEFAULT_DECIMAL_SCALE);
            q.push(&format!("({precision},{scale})"));
        }
        DataType::Varchar => {
            let size = spec.size.unwrap_or(DEFAULT_VARCHAR_SIZE);
            q.push(&format!("({size})"));
        }
        _ => {}
    }

    q.push(if spec.nullable { " NULL" } else { " NOT NULL" });

    if spec.unique && !matches!(data_type, DataType::Boolean | DataType::Date | DataType::DateTime)
    {
        q.push(" UNIQUE");
    }
    if spec.auto_increment && data_type.is_integer() {
        q.push(" AUTO_INCREMENT");
    }
    if let Some(default) = &spec.default {
        q.push(" DEFAULT ").push_bind(default.clone());
    }
}

#[derive(Debug, Clone)]
struct CreateColumn {
    name: String,
    data_type: DataType,
    spec: ColumnSpec,
}

/// `CREATE TABLE` builder.
#[derive(Debug, Clone)]
pub struct CreateTable {
    table: String,
    if_not_exists: bool,
    columns: Vec<CreateColumn>,
}

/// Start a `CREATE TABLE [IF NOT EXISTS]` statement.
pub fn create_table(table: impl Into<String>, if_not_exists: bool) -> CreateTable {
    CreateTable {
        table: table.into(),
        if_not_exists,
        columns: Vec::new(),
    }
}

impl CreateTable {
    pub fn column(mut self, name: impl Into<String>, data_type: DataType, spec: ColumnSpec) -> Self {
        self.columns.push(CreateColumn {
            name: name.into(),
            data_type,
            spec,
        });
        self
    }

    pub fn build(&self) -> OrmResult<Sql> {
        if self.columns.is_empty() {
            return Err(OrmError::invalid_query(format!(
                "No columns defined for table '{}'",
                self.table
            )));
        }

        let mut q = Sql::new("CREATE TABLE ");
        if self.if_not_exists {
            q.push("IF NOT EXISTS ");
        }
        q.push_ident(&self.table)?.push(" (");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_ident(&column.name)?;
            push_column_type(&mut q, column.data_type, &column.spec);
            if column.spec.primary_key
                && (column.data_type.is_integer() || column.data_type == DataType::Varchar)
            {
                q.push(", PRIMARY KEY (").push_ident(&column.name)?.push(")");
            }
        }
        q.push(");");
        Ok(q)
    }
}

#[derive(Debug, Clone)]
enum AlterChange {
    Add {
        name: String,
        data_type: DataType,
        spec: ColumnSpec,
        placement: Option<Placement>,
    },
    Modify {
        name: String,
        data_type: DataType,
        spec: ColumnSpec,
        placement: Option<Placement>,
    },
    Drop {
        name: String,
    },
}

/// `ALTER TABLE` builder.
#[derive(Debug, Clone)]
pub struct AlterTable {
    table: String,
    changes: Vec<AlterChange>,
}

/// Start an `ALTER TABLE` statement.
pub fn alter_table(table: impl Into<String>) -> AlterTable {
    AlterTable {
        table: table.into(),
        changes: Vec::new(),
    }
}

impl AlterTable {
    pub fn add_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        spec: ColumnSpec,
        placement: Option<Placement>,
    ) -> Self {
        self.changes.push(AlterChange::Add {
            name: name.into(),
            data_type,
            spec,
            placement,
        });
        self
    }

    pub fn modify_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        spec: ColumnSpec,
        placement: Option<Placement>,
    ) -> Self {
        self.changes.push(AlterChange::Modify {
            name: name.into(),
            data_type,
            spec,
            placement,
        });
        self
    }

    pub fn drop_column(mut self, name: impl Into<String>) -> Self {
        self.changes.push(AlterChange::Drop { name: name.into() });
        self
    }

    pub fn build(&self) -> OrmResult<Sql> {
        if self.changes.is_empty() {
            return Err(OrmError::invalid_query(format!(
                "No changes defined for table '{}'",
                self.table
            )));
        }

        let mut q = Sql::new("ALTER TABLE ");
        q.push_ident(&self.table)?;
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                q.push(",");
            }
            match change {
                AlterChange::Drop { name } => {
                    q.push(" DROP COLUMN ").push_ident(name)?;
                }
                AlterChange::Add {
                    name,
                    data_type,
                    spec,
                    placement,
                }
                | AlterChange::Modify {
                    name,
                    data_type,
                    spec,
                    placement,
                } => {
                    let action = if matches!(change, AlterChange::Add { .. }) {
                        " ADD COLUMN "
                    } else {
                        " MODIFY COLUMN "
                    };
                    q.push(action).push_ident(name)?;
                    push_column_type(&mut q, *data_type, spec);
                    match placement {
                        Some(Placement::First) => {
                            q.push(" FIRST");
                        }
                        Some(Placement::After(column)) => {
                            q.push(" AFTER ").push_ident(column)?;
                        }
                        None => {}
                    }
                }
            }
        }
        q.push(";");
        Ok(q)
    }
}

/// `DROP TABLE [IF EXISTS] `table`;`
pub fn drop_table(table: &str, if_exists: bool) -> OrmResult<Sql> {
    let mut q = Sql::new("DROP TABLE ");
    if if_exists {
        q.push("IF EXISTS ");
    }
    q.push_ident(table)?.push(";");
    Ok(q)
}

/// `ALTER TABLE `from` RENAME TO `to`;`
pub fn rename_table(from: &str, to: &str) -> OrmResult<Sql> {
    let mut q = Sql::new("ALTER TABLE ");
    q.push_ident(from)?.push(" RENAME TO ").push_ident(to)?.push(";");
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_with_defaults() {
        let q = create_table("my_table", true)
            .column("name", DataType::Varchar, ColumnSpec::new())
            .column("lastName", DataType::Varchar, ColumnSpec::new())
            .build()
            .unwrap();
        assert_eq!(
            q.sql(),
            "CREATE TABLE IF NOT EXISTS `my_table` (`name` VARCHAR(255) NOT NULL, `lastName` VARCHAR(255) NOT NULL);"
        );
        assert!(q.params().is_empty());
    }

    #[test]
    fn create_int_columns() {
        let q = create_table("my_table", false)
            .column(
                "id",
                DataType::Int,
                ColumnSpec::new().primary_key().auto_increment(),
            )
            .column("age", DataType::Int, ColumnSpec::new())
            .column("cards", DataType::TinyInt, ColumnSpec::new().nullable().size(10))
            .column("employee", DataType::SmallInt, ColumnSpec::new().unique())
            .column("bags", DataType::Int, ColumnSpec::new().default_value(100))
            .build()
            .unwrap();
        assert_eq!(
            q.sql(),
            "CREATE TABLE `my_table` (`id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`), \
             `age` INT NOT NULL, `cards` TINYINT NULL, `employee` SMALLINT NOT NULL UNIQUE, \
             `bags` INT NOT NULL DEFAULT ?);"
        );
        assert_eq!(q.params(), &[Value::Int(100)]);
    }

    #[test]
    fn create_decimal_and_string_columns() {
        let q = create_table("my_table", false)
            .column("total", DataType::Decimal, ColumnSpec::new())
            .column(
                "subtotal",
                DataType::Decimal,
                ColumnSpec::new().nullable().size(5).scale(2),
            )
            .column(
                "uid",
                DataType::Varchar,
                ColumnSpec::new().primary_key().auto_increment(),
            )
            .column("email", DataType::Text, ColumnSpec::new().nullable().size(50))
            .build()
            .unwrap();
        assert_eq!(
            q.sql(),
            "CREATE TABLE `my_table` (`total` DECIMAL(10,2) NOT NULL, `subtotal` DECIMAL(5,2) NULL, \
             `uid` VARCHAR(255) NOT NULL, PRIMARY KEY (`uid`), `email` TEXT NULL);"
        );
    }

    #[test]
    fn unique_is_dropped_for_boolean_and_dates() {
        let q = create_table("t", false)
            .column("isDone", DataType::Boolean, ColumnSpec::new().unique())
            .column("createdAt", DataType::DateTime, ColumnSpec::new().unique())
            .column("isCreated", DataType::Boolean, ColumnSpec::new().default_value(true))
            .build()
            .unwrap();
        assert_eq!(
            q.sql(),
            "CREATE TABLE `t` (`isDone` BOOLEAN NOT NULL, `createdAt` DATETIME NOT NULL, \
             `isCreated` BOOLEAN NOT NULL DEFAULT ?);"
        );
        assert_eq!(q.params(), &[Value::Bool(true)]);
    }

    #[test]
    fn create_without_columns_fails() {
        let err = create_table("t", true).build().unwrap_err();
        assert!(matches!(err, OrmError::InvalidQuery(_)));
    }

    #[test]
    fn alter_add_modify_drop() {
        let q = alter_table("my_table")
            .add_column("name", DataType::Varchar, ColumnSpec::new(), None)
            .modify_column(
                "lastName",
                DataType::Varchar,
                ColumnSpec::new(),
                Some(Placement::After("name".into())),
            )
            .add_column("id", DataType::Int, ColumnSpec::new(), Some(Placement::First))
            .drop_column("email")
            .build()
            .unwrap();
        assert_eq!(
            q.sql(),
            "ALTER TABLE `my_table` ADD COLUMN `name` VARCHAR(255) NOT NULL, \
             MODIFY COLUMN `lastName` VARCHAR(255) NOT NULL AFTER `name`, \
             ADD COLUMN `id` INT NOT NULL FIRST, DROP COLUMN `email`;"
        );
        assert!(alter_table("t").build().is_err());
    }

    #[test]
    fn drop_and_rename() {
        assert_eq!(
            drop_table("my_table", true).unwrap().sql(),
            "DROP TABLE IF EXISTS `my_table`;"
        );
        assert_eq!(
            drop_table("my_table", false).unwrap().sql(),
            "DROP TABLE `my_table`;"
        );
        assert_eq!(
            rename_table("my_table", "new_table").unwrap().sql(),
            "ALTER TABLE `my_table` RENAME TO `new_table`;"
        );
    }
}
