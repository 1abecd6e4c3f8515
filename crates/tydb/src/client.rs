//! The execution collaborator contract.
//!
//! `tydb` never opens connections itself. A [`Db`](crate::Db) hands every compiled
//! statement to an [`Executor`], which owns the connection and its lifecycle.

use crate::error::OrmResult;
use crate::value::{Record, Value};
use std::collections::BTreeMap;

/// One result row.
///
/// For grouped (table-keyed) results each table label maps to that table's
/// columns. Flat results keep every column under the `""` key.
pub type Row = BTreeMap<String, Record>;

/// Key under which flat (ungrouped) results are stored in a [`Row`].
pub const FLAT: &str = "";

/// What the executor returns for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows: Vec<Row>,
    /// Column names, as reported by the driver.
    pub fields: Vec<String>,
    pub affected_rows: u64,
    /// Generated key of an `INSERT`, if any.
    pub last_insert_id: Option<u64>,
}

impl ExecResult {
    /// A result carrying rows.
    pub fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// A result of a statement that changed rows.
    pub fn affected(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            ..Self::default()
        }
    }

    /// An insert result with a generated key.
    pub fn inserted(last_insert_id: u64) -> Self {
        Self {
            affected_rows: 1,
            last_insert_id: Some(last_insert_id),
            ..Self::default()
        }
    }

    /// Flat views of the rows (the `""` slice of each).
    pub fn flat_rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().filter_map(|row| row.get(FLAT))
    }
}

/// Build a flat [`Row`] from column/value pairs.
pub fn flat_row<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Row
where
    K: Into<String>,
    V: Into<Value>,
{
    let record = values
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    BTreeMap::from([(FLAT.to_string(), record)])
}

/// Executes compiled statements against a database connection.
///
/// `grouped` asks for rows keyed by table label (used when populating
/// associations); otherwise the whole row goes under [`FLAT`]. Implementations
/// report driver failures as [`OrmError::Core`](crate::OrmError::Core); the
/// caller attaches the SQL text.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        grouped: bool,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send;
}

impl<E: Executor> Executor for &E {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        grouped: bool,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        (**self).execute(sql, params, grouped)
    }
}

impl<E: Executor> Executor for std::sync::Arc<E> {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        grouped: bool,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        (**self).execute(sql, params, grouped)
    }
}
