//! Entity queries: association joins and the materialization plan.

use super::{COUNT_ALIAS, FindOptions, compile_paged};
use crate::builder::{
    GroupBy, Join, OrderBy, Pagination, SelectItem, TableRef, compile_where,
};
use crate::config::DbConfig;
use crate::error::{OrmError, OrmResult};
use crate::filter::Filter;
use crate::ident::ColumnRef;
use crate::schema::{Association, Cardinality, EntitySchema, Registry};
use crate::sql::Sql;
use std::collections::HashSet;
use std::sync::Arc;

/// An association to join and attach, optionally with its own nested populates.
///
/// `target` names either the target entity type or the association itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    pub target: String,
    pub nested: Vec<Populate>,
}

impl Populate {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            nested: Vec::new(),
        }
    }

    /// Populate an association of the populated entity as well.
    pub fn with(mut self, nested: impl Into<Populate>) -> Self {
        self.nested.push(nested.into());
        self
    }
}

impl From<&str> for Populate {
    fn from(target: &str) -> Self {
        Self::new(target)
    }
}

impl From<String> for Populate {
    fn from(target: String) -> Self {
        Self::new(target)
    }
}

/// Options for entity finds.
///
/// Column names in `order_by` and `group_by` are entity field names; they are
/// mapped to storage columns like filter keys.
#[derive(Debug, Clone, Default)]
pub struct EntityFindOptions {
    pub populate: Vec<Populate>,
    pub order_by: Vec<OrderBy>,
    pub group_by: Vec<GroupBy>,
    pub pagination: Option<Pagination>,
}

impl EntityFindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn populate(mut self, populate: impl Into<Populate>) -> Self {
        self.populate.push(populate.into());
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn group_by(mut self, column: impl Into<GroupBy>) -> Self {
        self.group_by.push(column.into());
        self
    }

    pub fn paginate(mut self, page: u64, per: u64) -> Self {
        self.pagination = Some(Pagination::new(page, per));
        self
    }
}

/// One table of a joined result.
#[derive(Debug, Clone)]
pub struct Level {
    /// Table name or alias the executor groups this table's columns under.
    pub label: String,
    pub schema: Arc<EntitySchema>,
    /// Index of the level this one is attached to (`None` for the root).
    pub parent: Option<usize>,
    /// Name the entities of this level are attached under on their parent.
    pub association: Option<String>,
    pub cardinality: Cardinality,
}

/// How joined rows map back onto entities.
///
/// Levels are in join order; a parent always precedes its children.
#[derive(Debug, Clone)]
pub struct MaterializePlan {
    pub levels: Vec<Level>,
}

impl MaterializePlan {
    /// A plan for a single, unjoined entity.
    pub fn root(schema: &Arc<EntitySchema>) -> Self {
        Self {
            levels: vec![Level {
                label: schema.table().to_string(),
                schema: Arc::clone(schema),
                parent: None,
                association: None,
                cardinality: Cardinality::One,
            }],
        }
    }

    /// Whether rows contain more than one table.
    pub fn is_joined(&self) -> bool {
        self.levels.len() > 1
    }
}

/// A compiled entity statement and the plan for its rows.
#[derive(Debug, Clone)]
pub struct EntityQuery {
    pub statement: Sql,
    pub plan: MaterializePlan,
}

impl EntityQuery {
    /// Whether the executor should return table-grouped rows.
    pub fn grouped(&self) -> bool {
        self.plan.is_joined()
    }
}

/// Collects levels, joins and used labels while walking the populate tree.
struct JoinResolver<'a> {
    registry: &'a Registry,
    levels: Vec<Level>,
    joins: Vec<Join>,
    labels: HashSet<String>,
}

impl<'a> JoinResolver<'a> {
    fn new(registry: &'a Registry, root: &Arc<EntitySchema>) -> Self {
        let plan = MaterializePlan::root(root);
        let labels = HashSet::from([root.table().to_string()]);
        Self {
            registry,
            levels: plan.levels,
            joins: Vec::new(),
            labels,
        }
    }

    /// The table's name, or `{table}_{n}` when the name is already taken.
    fn claim_label(&mut self, table: &str) -> String {
        let mut label = table.to_string();
        let mut n = self.levels.len();
        while self.labels.contains(&label) {
            label = format!("{table}_{n}");
            n += 1;
        }
        self.labels.insert(label.clone());
        label
    }

    fn table_ref(table: &str, label: &str) -> TableRef {
        if table == label {
            TableRef::new(table)
        } else {
            TableRef::new(table).alias(label)
        }
    }

    fn resolve(&mut self, parent: usize, populate: &Populate) -> OrmResult<()> {
        let owner = Arc::clone(&self.levels[parent].schema);
        let owner_label = self.levels[parent].label.clone();
        let assoc = owner
            .association_to(&populate.target)
            .or_else(|| owner.association(&populate.target))
            .ok_or_else(|| {
                OrmError::definition(format!(
                    "Entity '{}' has no association to '{}'",
                    owner.name(),
                    populate.target
                ))
            })?
            .clone();
        let target = Arc::clone(self.registry.entity(assoc.target())?);
        let label = self.claim_label(target.table());
        let target_pk = ColumnRef::qualified(&label, &target.primary_key().storage);
        let owner_pk = ColumnRef::qualified(&owner_label, &owner.primary_key().storage);

        match &assoc {
            Association::BelongsTo { foreign_key, .. } => {
                self.joins.push(Join::inner(
                    Self::table_ref(target.table(), &label),
                    ColumnRef::qualified(&owner_label, owner.storage_name(foreign_key)),
                    target_pk,
                ));
            }
            Association::HasOne { foreign_key, .. } | Association::HasMany { foreign_key, .. } => {
                self.joins.push(Join::inner(
                    Self::table_ref(target.table(), &label),
                    owner_pk,
                    ColumnRef::qualified(&label, target.storage_name(foreign_key)),
                ));
            }
            Association::BelongsToMany { through, .. } => {
                let (junction, to_owner, to_target) =
                    self.registry
                        .junction_keys(owner.name(), target.name(), through)?;
                let junction = Arc::clone(junction);
                let (to_owner, to_target) = (to_owner.to_string(), to_target.to_string());
                let junction_label = self.claim_label(junction.table());
                self.joins.push(Join::inner(
                    Self::table_ref(junction.table(), &junction_label),
                    owner_pk,
                    ColumnRef::qualified(&junction_label, junction.storage_name(&to_owner)),
                ));
                self.joins.push(Join::inner(
                    Self::table_ref(target.table(), &label),
                    ColumnRef::qualified(&junction_label, junction.storage_name(&to_target)),
                    target_pk,
                ));
            }
        }

        let index = self.levels.len();
        self.levels.push(Level {
            label,
            schema: target,
            parent: Some(parent),
            association: Some(assoc.name().to_string()),
            cardinality: assoc.cardinality(),
        });
        for nested in &populate.nested {
            self.resolve(index, nested)?;
        }
        Ok(())
    }

    /// Map a field-level column reference to storage, qualifying bare names
    /// with the root label once other tables are joined.
    fn map_column(&self, column: &ColumnRef) -> ColumnRef {
        let joined = !self.joins.is_empty();
        match &column.table {
            None => {
                let root = &self.levels[0];
                let storage = root.schema.storage_name(&column.column);
                if joined {
                    ColumnRef::qualified(&root.label, storage)
                } else {
                    ColumnRef::new(storage)
                }
            }
            Some(table) => match self.levels.iter().find(|l| &l.label == table) {
                Some(level) => {
                    ColumnRef::qualified(table, level.schema.storage_name(&column.column))
                }
                None => column.clone(),
            },
        }
    }
}

fn plan(
    registry: &Registry,
    entity: &str,
    filter: &Filter,
    options: &EntityFindOptions,
    config: &DbConfig,
    single: bool,
) -> OrmResult<EntityQuery> {
    let root = Arc::clone(registry.entity(entity)?);
    let mut resolver = JoinResolver::new(registry, &root);
    for populate in &options.populate {
        resolver.resolve(0, populate)?;
    }
    let joined = resolver.levels.len() > 1;

    let filter = filter.map_columns(&|c| resolver.map_column(c));
    let group_by = options
        .group_by
        .iter()
        .map(|c| resolver.map_column(c))
        .collect();
    let mut order_by: Vec<OrderBy> = options
        .order_by
        .iter()
        .map(|o| OrderBy {
            column: resolver.map_column(&o.column),
            direction: o.direction,
        })
        .collect();
    if joined && config.auto_order_populated {
        for level in &resolver.levels {
            let key = ColumnRef::qualified(&level.label, &level.schema.primary_key().storage);
            if !order_by.iter().any(|o| o.column == key) {
                order_by.push(OrderBy::asc(key));
            }
        }
    }

    let select = if joined {
        resolver
            .levels
            .iter()
            .map(|l| SelectItem::all_of(&l.label))
            .collect()
    } else {
        Vec::new()
    };

    let default_page = Pagination::new(1, config.default_page_size);
    let page = match options.pagination {
        Some(page) => page,
        None if single && !joined => Pagination::single(),
        None => default_page,
    };

    let find = FindOptions {
        select,
        join: std::mem::take(&mut resolver.joins),
        group_by,
        order_by,
        pagination: None,
    };
    let statement = compile_paged(&TableRef::new(root.table()), &filter, &find, page)?;
    Ok(EntityQuery {
        statement,
        plan: MaterializePlan {
            levels: resolver.levels,
        },
    })
}

/// Plan a find over `entity`, joining every populated association.
///
/// Without pagination the configured default page caps the joined rows. When
/// populating, rows are ordered by every level's primary key (after the
/// caller's own order) unless `auto_order_populated` is off.
pub fn plan_find(
    registry: &Registry,
    entity: &str,
    filter: &Filter,
    options: &EntityFindOptions,
    config: &DbConfig,
) -> OrmResult<EntityQuery> {
    plan(registry, entity, filter, options, config, false)
}

/// Plan a single-entity find.
///
/// Unpopulated finds fetch one row. Populated finds keep the default page so
/// every joined row of the first root is returned.
pub fn plan_find_one(
    registry: &Registry,
    entity: &str,
    filter: &Filter,
    options: &EntityFindOptions,
    config: &DbConfig,
) -> OrmResult<EntityQuery> {
    plan(registry, entity, filter, options, config, true)
}

/// `SELECT COUNT(*) AS `total` FROM <table> [WHERE ..];` with field names mapped.
pub fn plan_count(registry: &Registry, entity: &str, filter: &Filter) -> OrmResult<Sql> {
    let schema = registry.entity(entity)?;
    let filter = storage_filter(schema, filter);
    let mut q = Sql::new("SELECT COUNT(*) AS ");
    q.push_ident(COUNT_ALIAS)?
        .push(" FROM ")
        .push_ident(schema.table())?
        .push_sql(compile_where(&filter, false)?)
        .push(";");
    Ok(q)
}

/// Field names to storage columns for single-table entity statements.
pub(crate) fn storage_filter(schema: &EntitySchema, filter: &Filter) -> Filter {
    filter.map_columns(&|c| match &c.table {
        None => ColumnRef::new(schema.storage_name(&c.column)),
        Some(_) => c.clone(),
    })
}
