//! The data-access handle.
//!
//! [`Db`] owns an [`Executor`], the frozen [`Registry`] and a [`DbConfig`]. It
//! compiles each operation, sends the statement through the configured hooks to
//! the executor, and materializes the rows. Statements run one at a time, in
//! call order; use separate handles (and executors) for concurrent work.

use crate::builder::{Pagination, TableRef};
use crate::client::{ExecResult, Executor};
use crate::config::DbConfig;
use crate::entity::{Entity, EntityState};
use crate::error::{OrmError, OrmResult};
use crate::filter::Filter;
use crate::materialize::{materialize, materialize_one};
use crate::monitor::{HookAction, QueryContext, QueryHook, QueryResult, QueryType};
use crate::query::plan::storage_filter;
use crate::query::{
    COUNT_ALIAS, CountOptions, EntityFindOptions, EntityQuery, FindOptions, compile_count,
    compile_delete, compile_find, compile_find_one, compile_insert, compile_update, plan_count,
    plan_find, plan_find_one,
};
use crate::schema::{ColumnDef, EntitySchema, Registry};
use crate::sql::Sql;
use crate::validate::{Mode, ValidationErrors, ValidationReason, validate_value};
use crate::value::{FromValue, Record, Value};
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::monitor::TracingSqlHook;

/// A data-access handle over one executor.
pub struct Db<E> {
    executor: E,
    registry: Arc<Registry>,
    config: DbConfig,
    hook: Option<Arc<dyn QueryHook>>,
    #[cfg(feature = "tracing")]
    sql_logger: Option<TracingSqlHook>,
}

impl<E: Executor> Db<E> {
    pub fn new(executor: E, registry: Arc<Registry>) -> Self {
        Self {
            executor,
            registry,
            config: DbConfig::default(),
            hook: None,
            #[cfg(feature = "tracing")]
            sql_logger: None,
        }
    }

    pub fn with_config(mut self, config: DbConfig) -> Self {
        #[cfg(feature = "tracing")]
        {
            self.sql_logger = config
                .sql_logging
                .then(|| TracingSqlHook::new().max_sql_length(config.max_logged_sql_length));
        }
        self.config = config;
        self
    }

    /// Install a hook; use [`CompositeHook`](crate::monitor::CompositeHook) to run several.
    pub fn with_hook(mut self, hook: impl QueryHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Schema of a registered entity.
    pub fn schema(&self, entity: &str) -> OrmResult<&Arc<EntitySchema>> {
        self.registry.entity(entity)
    }

    fn hooks(&self) -> Vec<&dyn QueryHook> {
        let mut hooks: Vec<&dyn QueryHook> = Vec::new();
        #[cfg(feature = "tracing")]
        if let Some(logger) = &self.sql_logger {
            hooks.push(logger);
        }
        if let Some(hook) = &self.hook {
            hooks.push(hook.as_ref());
        }
        hooks
    }

    async fn exec(
        &self,
        tag: &str,
        entity: Option<&str>,
        statement: &Sql,
        grouped: bool,
    ) -> OrmResult<ExecResult> {
        let mut ctx = QueryContext::new(statement.sql(), statement.params().len()).with_tag(tag);
        if let Some(entity) = entity {
            ctx = ctx.with_entity(entity);
        }

        let hooks = self.hooks();
        for hook in &hooks {
            if let HookAction::Abort(reason) = hook.before_query(&ctx) {
                return Err(
                    OrmError::core(format!("Statement aborted by hook: {reason}"))
                        .with_sql(statement.sql()),
                );
            }
        }

        let start = Instant::now();
        let result = self
            .executor
            .execute(statement.sql(), statement.params(), grouped)
            .await
            .map_err(|e| e.with_sql(statement.sql()));
        let elapsed = start.elapsed();

        if !hooks.is_empty() {
            let outcome = match &result {
                Ok(r) if ctx.query_type == QueryType::Select => QueryResult::Rows(r.rows.len()),
                Ok(r) => QueryResult::Affected(r.affected_rows),
                Err(e) => QueryResult::error(e.to_string()),
            };
            for hook in &hooks {
                hook.after_query(&ctx, elapsed, &outcome);
            }
        }
        result
    }

    fn default_page(&self) -> Pagination {
        Pagination::new(1, self.config.default_page_size)
    }

    // ==================== Raw table operations ====================

    /// Rows of `table` matching `filter`, capped at the default page when
    /// `options` has no pagination.
    pub async fn find(
        &self,
        table: impl Into<TableRef>,
        filter: &Filter,
        mut options: FindOptions,
    ) -> OrmResult<Vec<Record>> {
        options.pagination.get_or_insert(self.default_page());
        let statement = compile_find(table, filter, &options)?;
        let result = self.exec("find", None, &statement, false).await?;
        Ok(into_flat(&result))
    }

    pub async fn find_one(
        &self,
        table: impl Into<TableRef>,
        filter: &Filter,
        options: FindOptions,
    ) -> OrmResult<Option<Record>> {
        let statement = compile_find_one(table, filter, &options)?;
        let result = self.exec("find_one", None, &statement, false).await?;
        Ok(result.flat_rows().next().cloned())
    }

    pub async fn count(
        &self,
        table: impl Into<TableRef>,
        filter: &Filter,
        options: CountOptions,
    ) -> OrmResult<u64> {
        let statement = compile_count(table, filter, &options)?;
        let result = self.exec("count", None, &statement, false).await?;
        read_total(&result)
    }

    /// Insert one row; columns are written in the given order.
    pub async fn insert_into<K, V>(
        &self,
        table: &str,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> OrmResult<ExecResult>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let statement = compile_insert(table, values.into_iter().map(|(k, v)| (k, v.into())))?;
        self.exec("insert", None, &statement, false).await
    }

    /// Update matching rows; returns the affected row count.
    pub async fn update_where<K, V>(
        &self,
        table: &str,
        set: impl IntoIterator<Item = (K, V)>,
        filter: &Filter,
    ) -> OrmResult<u64>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let statement = compile_update(table, set.into_iter().map(|(k, v)| (k, v.into())), filter)?;
        let result = self.exec("update", None, &statement, false).await?;
        Ok(result.affected_rows)
    }

    /// Delete matching rows; returns the affected row count.
    pub async fn delete_where(&self, table: &str, filter: &Filter) -> OrmResult<u64> {
        self.check_delete_filter(table, filter)?;
        let statement = compile_delete(table, filter)?;
        let result = self.exec("delete", None, &statement, false).await?;
        Ok(result.affected_rows)
    }

    /// Execute an already compiled statement (DDL, hand-written SQL).
    pub async fn run(&self, statement: &Sql) -> OrmResult<ExecResult> {
        self.exec("run", None, statement, false).await
    }

    fn check_delete_filter(&self, table: &str, filter: &Filter) -> OrmResult<()> {
        if self.config.reject_unfiltered_delete && filter.is_empty() {
            return Err(OrmError::invalid_query(format!(
                "DELETE from '{table}' without a filter is not allowed"
            )));
        }
        Ok(())
    }

    // ==================== Entity reads ====================

    /// Entities matching `filter`, with populated associations attached.
    pub async fn find_entities(
        &self,
        entity: &str,
        filter: &Filter,
        options: &EntityFindOptions,
    ) -> OrmResult<Vec<Entity>> {
        let query = plan_find(&self.registry, entity, filter, options, &self.config)?;
        let result = self.exec_entity_query("find", entity, &query).await?;
        Ok(materialize(&query.plan, &result.rows))
    }

    /// The first entity matching `filter`.
    pub async fn find_entity(
        &self,
        entity: &str,
        filter: &Filter,
        options: &EntityFindOptions,
    ) -> OrmResult<Option<Entity>> {
        let query = plan_find_one(&self.registry, entity, filter, options, &self.config)?;
        let result = self.exec_entity_query("find_one", entity, &query).await?;
        Ok(materialize_one(&query.plan, &result.rows))
    }

    /// Like [`Db::find_entity`], but no match is [`OrmError::NotFound`].
    pub async fn find_entity_or_fail(
        &self,
        entity: &str,
        filter: &Filter,
        options: &EntityFindOptions,
    ) -> OrmResult<Entity> {
        match self.find_entity(entity, filter, options).await? {
            Some(found) => Ok(found),
            None => {
                let schema = self.registry.entity(entity)?;
                Err(OrmError::NotFound {
                    entity: schema.name().to_string(),
                    primary_key: schema.primary_key().field.clone(),
                    filter: filter.to_json(),
                })
            }
        }
    }

    pub async fn count_entities(&self, entity: &str, filter: &Filter) -> OrmResult<u64> {
        let statement = plan_count(&self.registry, entity, filter)?;
        let result = self.exec("count", Some(entity), &statement, false).await?;
        read_total(&result)
    }

    async fn exec_entity_query(
        &self,
        tag: &str,
        entity: &str,
        query: &EntityQuery,
    ) -> OrmResult<ExecResult> {
        self.exec(tag, Some(entity), &query.statement, query.grouped())
            .await
    }

    // ==================== Entity bulk writes ====================

    /// Set fields on every matching row. Provided values are validated first.
    pub async fn update_all<K, V>(
        &self,
        entity: &str,
        set: impl IntoIterator<Item = (K, V)>,
        filter: &Filter,
    ) -> OrmResult<u64>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let schema = Arc::clone(self.registry.entity(entity)?);
        let mut errors = ValidationErrors::new();
        let mut values = Vec::new();
        for (field, value) in set {
            let (field, value) = (field.into(), value.into());
            let column = schema.column(&field).ok_or_else(|| {
                OrmError::invalid_query(format!("'{entity}' has no field '{field}'"))
            })?;
            // Columns that are not set keep their value, so only the given ones are checked.
            if let Err(reason) = validate_value(column, Some(&value), Mode::Update) {
                errors.add(field, reason);
                continue;
            }
            values.push((column.storage.clone(), value));
        }
        if !errors.is_empty() {
            return Err(OrmError::Validation(errors));
        }

        let filter = storage_filter(&schema, filter);
        let statement = compile_update(schema.table(), values, &filter)?;
        let result = self.exec("update", Some(entity), &statement, false).await?;
        Ok(result.affected_rows)
    }

    /// Delete every matching row.
    pub async fn remove_all(&self, entity: &str, filter: &Filter) -> OrmResult<u64> {
        let schema = Arc::clone(self.registry.entity(entity)?);
        self.check_delete_filter(schema.table(), filter)?;
        let filter = storage_filter(&schema, filter);
        let statement = compile_delete(schema.table(), &filter)?;
        let result = self.exec("delete", Some(entity), &statement, false).await?;
        Ok(result.affected_rows)
    }

    // ==================== Instance writes ====================

    /// Insert a new entity and write back its generated primary key.
    ///
    /// Every declared column is written (missing values as `NULL`); the primary
    /// key only when it is set.
    pub async fn insert(&self, entity: &mut Entity) -> OrmResult<()> {
        if entity.state() != EntityState::New {
            return Err(OrmError::invalid_query(format!(
                "Cannot insert a {:?} '{}'",
                entity.state(),
                entity.entity()
            )));
        }
        self.validate(entity, Mode::Insert).await?;

        let schema = Arc::clone(entity.schema());
        let values = schema.columns().iter().filter_map(|column| {
            let value = entity.get(&column.field).cloned().unwrap_or(Value::Null);
            (!column.primary_key || !value.is_null()).then(|| (column.storage.as_str(), value))
        });
        let statement = compile_insert(schema.table(), values)?;
        let result = self
            .exec("insert", Some(schema.name()), &statement, false)
            .await?;

        if entity.primary_key().is_none()
            && let Some(id) = result.last_insert_id
        {
            let id = i64::try_from(id).map_err(|_| {
                OrmError::core(format!("Generated key {id} does not fit a signed integer"))
            })?;
            entity.set(&schema.primary_key().field, id)?;
        }
        entity.set_state(EntityState::Persisted);
        Ok(())
    }

    /// Write every non-key column of an entity, by primary key.
    pub async fn update(&self, entity: &mut Entity) -> OrmResult<()> {
        ensure_live(entity)?;
        self.validate(entity, Mode::Update).await?;

        let schema = Arc::clone(entity.schema());
        let pk = schema.primary_key();
        let values = schema
            .columns()
            .iter()
            .filter(|c| !c.primary_key)
            .map(|c| {
                let value = entity.get(&c.field).cloned().unwrap_or(Value::Null);
                (c.storage.as_str(), value)
            });
        let key = entity.primary_key().cloned().unwrap_or(Value::Null);
        let filter = Filter::new().eq(pk.storage.as_str(), key);
        let statement = compile_update(schema.table(), values, &filter)?;
        self.exec("update", Some(schema.name()), &statement, false)
            .await?;
        entity.set_state(EntityState::Persisted);
        Ok(())
    }

    /// Delete an entity's row; the instance becomes inert.
    pub async fn remove(&self, entity: &mut Entity) -> OrmResult<()> {
        ensure_live(entity)?;
        let schema = Arc::clone(entity.schema());
        let pk = schema.primary_key();
        let Some(key) = entity.primary_key().cloned() else {
            let mut errors = ValidationErrors::new();
            errors.add(pk.field.clone(), ValidationReason::Required);
            return Err(OrmError::Validation(errors));
        };
        let statement = compile_delete(schema.table(), &Filter::new().eq(pk.storage.as_str(), key))?;
        self.exec("delete", Some(schema.name()), &statement, false)
            .await?;
        entity.set_state(EntityState::Deleted);
        Ok(())
    }

    /// Local checks for every column first; uniqueness lookups only run when
    /// those pass, so an invalid entity never reaches the database.
    async fn validate(&self, entity: &Entity, mode: Mode) -> OrmResult<()> {
        let schema = entity.schema();
        let mut errors = ValidationErrors::new();
        for column in schema.columns() {
            if let Err(reason) = validate_value(column, entity.get(&column.field), mode) {
                errors.add(column.field.clone(), reason);
            }
        }
        if !errors.is_empty() {
            return Err(OrmError::Validation(errors));
        }

        for column in schema.columns().iter().filter(|c| c.unique) {
            let Some(value) = entity.get(&column.field).filter(|v| !v.is_null()) else {
                continue;
            };
            if self.is_taken(entity, column, value, mode).await? {
                errors.add(column.field.clone(), ValidationReason::Unique);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(OrmError::Validation(errors))
        }
    }

    /// Whether another row already holds `value` in `column`.
    async fn is_taken(
        &self,
        entity: &Entity,
        column: &ColumnDef,
        value: &Value,
        mode: Mode,
    ) -> OrmResult<bool> {
        let schema = entity.schema();
        let mut filter = Filter::new().eq(column.storage.as_str(), value.clone());
        if mode == Mode::Update
            && let Some(key) = entity.primary_key()
        {
            filter = filter.ne(schema.primary_key().storage.as_str(), key.clone());
        }
        let statement = compile_find_one(schema.table(), &filter, &FindOptions::default())?;
        let result = self
            .exec("unique", Some(schema.name()), &statement, false)
            .await?;
        Ok(!result.rows.is_empty())
    }
}

fn ensure_live(entity: &Entity) -> OrmResult<()> {
    if entity.state() == EntityState::Deleted {
        return Err(OrmError::invalid_query(format!(
            "'{}' has been removed",
            entity.entity()
        )));
    }
    Ok(())
}

fn into_flat(result: &ExecResult) -> Vec<Record> {
    result.flat_rows().cloned().collect()
}

/// The count alias from the first row, under whichever slice holds it.
fn read_total(result: &ExecResult) -> OrmResult<u64> {
    let Some(row) = result.rows.first() else {
        return Ok(0);
    };
    let total = row
        .values()
        .find_map(|record| record.get(COUNT_ALIAS))
        .ok_or_else(|| OrmError::decode(COUNT_ALIAS, "count result has no total column"))?;
    u64::from_value(total).map_err(|e| match e {
        OrmError::Decode { message, .. } => OrmError::decode(COUNT_ALIAS, message),
        other => other,
    })
}
