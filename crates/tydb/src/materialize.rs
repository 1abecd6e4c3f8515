//! Rebuilding entity trees from joined rows.
//!
//! Rows arrive flat, one slice per joined table. A single pass keeps one
//! *holder* slot per plan level with the entity currently being assembled. For
//! each row, the longest prefix of levels whose slice equals the held entity is
//! still the same group; every level past that prefix is folded into its parent
//! (by the association's cardinality) and replaced by the row's entity. A root
//! is emitted once its whole subtree has been folded.
//!
//! Rows must be grouped contiguously by every ancestor key. The query planner
//! orders populated finds by each level's primary key unless configured
//! otherwise; without that order, children of one root that are not adjacent
//! end up under separate copies of that root.

use crate::client::{FLAT, Row};
use crate::entity::{Entity, FieldSource};
use crate::query::MaterializePlan;
use crate::schema::Cardinality;
use crate::value::Record;

struct Holder<'p> {
    plan: &'p MaterializePlan,
    slots: Vec<Option<Entity>>,
    out: Vec<Entity>,
}

impl<'p> Holder<'p> {
    fn new(plan: &'p MaterializePlan) -> Self {
        Self {
            plan,
            slots: vec![None; plan.levels.len()],
            out: Vec::new(),
        }
    }

    fn has_root(&self) -> bool {
        self.slots.first().is_some_and(Option::is_some)
    }

    /// Number of leading levels whose held entity equals the row's.
    fn matching_prefix(&self, row: &[Option<Entity>]) -> usize {
        self.slots
            .iter()
            .zip(row)
            .take_while(|(held, current)| match (held, current) {
                (Some(h), Some(c)) => h.matches(c),
                (None, None) => true,
                _ => false,
            })
            .count()
    }

    /// Fold levels `pos..` into their parents, deepest first; emit the root when
    /// `pos` is zero.
    fn flush(&mut self, pos: usize) {
        for index in (pos.max(1)..self.slots.len()).rev() {
            let Some(child) = self.slots[index].take() else {
                continue;
            };
            let level = &self.plan.levels[index];
            let (Some(parent), Some(name)) = (level.parent, level.association.as_deref()) else {
                continue;
            };
            // Children of an absent parent are dropped.
            if let Some(owner) = self.slots[parent].as_mut() {
                match level.cardinality {
                    Cardinality::One => owner.attach_one(name, child),
                    Cardinality::Many => owner.attach_many(name, child),
                }
            }
        }
        if pos == 0
            && let Some(root) = self.slots[0].take()
        {
            self.out.push(root);
        }
    }

    fn hold(&mut self, pos: usize, row: Vec<Option<Entity>>) {
        for (index, entity) in row.into_iter().enumerate().skip(pos) {
            let entity = entity.map(|mut e| {
                self.init_collections(index, &mut e);
                e
            });
            self.slots[index] = entity;
        }
    }

    /// Populated collections exist on every held entity, even when empty.
    fn init_collections(&self, index: usize, entity: &mut Entity) {
        for level in &self.plan.levels {
            if level.parent == Some(index)
                && level.cardinality == Cardinality::Many
                && let Some(name) = level.association.as_deref()
            {
                entity.init_many(name);
            }
        }
    }
}

/// The slice of `row` belonging to level `index`; the root falls back to the
/// flat (ungrouped) slice.
fn slice<'r>(plan: &MaterializePlan, row: &'r Row, index: usize) -> Option<&'r Record> {
    let level = &plan.levels[index];
    row.get(&level.label)
        .or_else(|| if index == 0 { row.get(FLAT) } else { None })
        .filter(|record| record.values().any(|v| !v.is_null()))
}

fn hydrate_row(plan: &MaterializePlan, row: &Row) -> Vec<Option<Entity>> {
    plan.levels
        .iter()
        .enumerate()
        .map(|(index, level)| {
            slice(plan, row, index)
                .map(|record| Entity::hydrate(&level.schema, record, FieldSource::Storage))
        })
        .collect()
}

/// Rebuild every root entity from `rows`.
pub fn materialize(plan: &MaterializePlan, rows: &[Row]) -> Vec<Entity> {
    let mut holder = Holder::new(plan);
    for row in rows {
        let current = hydrate_row(plan, row);
        if current.first().is_none_or(Option::is_none) {
            continue;
        }
        let pos = holder.matching_prefix(&current);
        if pos < current.len() {
            holder.flush(pos);
            holder.hold(pos, current);
        }
    }
    holder.flush(0);
    holder.out
}

/// Rebuild only the first root entity; rows after its group are ignored.
pub fn materialize_one(plan: &MaterializePlan, rows: &[Row]) -> Option<Entity> {
    let mut holder = Holder::new(plan);
    for row in rows {
        let current = hydrate_row(plan, row);
        if current.first().is_none_or(Option::is_none) {
            continue;
        }
        let pos = holder.matching_prefix(&current);
        if pos == 0 && holder.has_root() {
            break;
        }
        if pos < current.len() {
            holder.flush(pos);
            holder.hold(pos, current);
        }
    }
    holder.flush(0);
    holder.out.into_iter().next()
}
