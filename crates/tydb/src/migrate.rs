//! Ordered schema migrations with a history table.
//!
//! Each [`Migration`] has a unique name. [`MigrationHandler::migrate`] runs the
//! `up` step of every migration without a history row and records it;
//! [`MigrationHandler::rollback`] undoes the most recent applied migration.
//!
//! # Example
//!
//! ```ignore
//! use tydb::migrate::{Migration, MigrationHandler};
//!
//! struct CreateUsers;
//!
//! #[async_trait::async_trait]
//! impl<E: tydb::Executor> Migration<E> for CreateUsers {
//!     fn name(&self) -> &str {
//!         "CreateUsers"
//!     }
//!     async fn up(&self, db: &tydb::Db<E>) -> tydb::OrmResult<()> {
//!         let ddl = db.schema("User")?.create_table()?;
//!         db.run(&ddl).await.map(drop)
//!     }
//!     async fn down(&self, db: &tydb::Db<E>) -> tydb::OrmResult<()> {
//!         db.run(&tydb::ddl::drop_table("users", true)?).await.map(drop)
//!     }
//! }
//!
//! let handler = MigrationHandler::new().add(CreateUsers);
//! handler.prepare(&db).await?;
//! handler.migrate(&db).await?;
//! ```

use crate::client::Executor;
use crate::db::Db;
use crate::ddl::{ColumnSpec, create_table};
use crate::error::OrmResult;
use crate::filter::Filter;
use crate::query::FindOptions;
use crate::schema::DataType;
use crate::value::{Record, Value};
use async_trait::async_trait;
use chrono::Local;

/// Table recording applied migrations.
pub const HISTORY_TABLE: &str = "db_migration_history";

macro_rules! status {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::info!(target: "tydb.migrate", $($arg)*);
    };
}

macro_rules! failure {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::error!(target: "tydb.migrate", $($arg)*);
    };
}

/// One reversible schema change.
#[async_trait]
pub trait Migration<E: Executor>: Send + Sync {
    /// Unique name, stored in the history table.
    fn name(&self) -> &str;

    async fn up(&self, db: &Db<E>) -> OrmResult<()>;

    async fn down(&self, db: &Db<E>) -> OrmResult<()>;
}

/// Applies and rolls back an ordered list of migrations.
pub struct MigrationHandler<E> {
    migrations: Vec<Box<dyn Migration<E>>>,
}

impl<E: Executor> Default for MigrationHandler<E> {
    fn default() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }
}

impl<E: Executor> MigrationHandler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a migration; migrations run in insertion order.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, migration: impl Migration<E> + 'static) -> Self {
        self.migrations.push(Box::new(migration));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.migrations.iter().map(|m| m.name())
    }

    /// Create the history table if it does not exist.
    pub async fn prepare(&self, db: &Db<E>) -> OrmResult<()> {
        status!("Checking database migration settings...");
        let ddl = create_table(HISTORY_TABLE, true)
            .column(
                "id",
                DataType::Int,
                ColumnSpec::new().primary_key().auto_increment(),
            )
            .column("migration_name", DataType::Text, ColumnSpec::new())
            .column("implemented_at", DataType::DateTime, ColumnSpec::new())
            .build()?;
        db.run(&ddl).await?;
        Ok(())
    }

    /// Apply every migration that has no history row, in order.
    ///
    /// Stops at the first failing migration; earlier ones stay applied.
    pub async fn migrate(&self, db: &Db<E>) -> OrmResult<()> {
        for migration in &self.migrations {
            let name = migration.name();
            if history(db, name).await?.is_some() {
                continue;
            }
            if let Err(e) = migration.up(db).await {
                failure!(migration = name, error = %e, "Migration '{name}' has errors!");
                return Err(e);
            }
            db.insert_into(
                HISTORY_TABLE,
                [
                    ("migration_name", Value::from(name)),
                    ("implemented_at", Value::DateTime(Local::now().naive_local())),
                ],
            )
            .await?;
            status!(migration = name, "Migration '{name}' implemented successfully!");
        }
        status!("Database is up to date!");
        Ok(())
    }

    /// Undo the most recently applied migration (the last one in order with a
    /// history row) and delete its history row.
    pub async fn rollback(&self, db: &Db<E>) -> OrmResult<()> {
        for migration in self.migrations.iter().rev() {
            let name = migration.name();
            let Some(record) = history(db, name).await? else {
                continue;
            };
            if let Err(e) = migration.down(db).await {
                failure!(migration = name, error = %e, "Migration '{name}' has errors!");
                return Err(e);
            }
            status!(migration = name, "Migration '{name}' rollbacked successfully!");
            let filter = match record.get("id") {
                Some(id) if !id.is_null() => Filter::new().eq("id", id.clone()),
                _ => Filter::new().eq("migration_name", name),
            };
            db.delete_where(HISTORY_TABLE, &filter).await?;
            break;
        }
        status!("Done");
        Ok(())
    }
}

async fn history<E: Executor>(db: &Db<E>, name: &str) -> OrmResult<Option<Record>> {
    db.find_one(
        HISTORY_TABLE,
        &Filter::new().eq("migration_name", name),
        FindOptions::default(),
    )
    .await
}
