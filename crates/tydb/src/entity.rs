//! Hydrated entity instances.

use crate::error::{OrmError, OrmResult};
use crate::schema::{ColumnDef, DataType, EntitySchema};
use crate::value::{FromValue, Record, Value};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Lifecycle of an instance with respect to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Built in memory, not inserted yet.
    New,
    /// Read from or written to the database.
    Persisted,
    /// Removed; the instance is inert.
    Deleted,
}

/// Populated association data.
#[derive(Debug, Clone)]
pub enum Related {
    One(Box<Entity>),
    Many(Vec<Entity>),
}

/// Which names a raw record is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Entity field names (caller input).
    Field,
    /// Storage column names (rows from the database).
    Storage,
}

/// One row of an entity type, with populated associations.
#[derive(Clone)]
pub struct Entity {
    schema: Arc<EntitySchema>,
    fields: Record,
    /// Declared columns as read from storage, before defaults were applied.
    stored: Option<Record>,
    relations: BTreeMap<String, Related>,
    state: EntityState,
}

impl Entity {
    /// Build an instance from one raw row slice.
    ///
    /// Every declared column gets a value: the coerced input when present,
    /// otherwise the column default (or `Null`). Undeclared input keys are ignored.
    /// Rows read by storage name are `Persisted`, caller input is `New`.
    pub fn hydrate(schema: &Arc<EntitySchema>, record: &Record, source: FieldSource) -> Self {
        let mut fields = Record::new();
        let mut stored = Record::new();
        for column in schema.columns() {
            let key = match source {
                FieldSource::Field => &column.field,
                FieldSource::Storage => &column.storage,
            };
            let input = record
                .get(key)
                .filter(|v| !v.is_null())
                .map(|v| coerce(column, v.clone()));
            if source == FieldSource::Storage {
                stored.insert(column.field.clone(), input.clone().unwrap_or(Value::Null));
            }
            let value = input.unwrap_or_else(|| column.default_value());
            fields.insert(column.field.clone(), value);
        }

        Self {
            schema: Arc::clone(schema),
            fields,
            stored: (source == FieldSource::Storage).then_some(stored),
            relations: BTreeMap::new(),
            state: match source {
                FieldSource::Field => EntityState::New,
                FieldSource::Storage => EntityState::Persisted,
            },
        }
    }

    /// A new, unsaved instance from field-keyed values.
    pub fn new<K, V>(schema: &Arc<EntitySchema>, values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let record: Record = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::hydrate(schema, &record, FieldSource::Field)
    }

    pub fn schema(&self) -> &Arc<EntitySchema> {
        &self.schema
    }

    /// Entity type name.
    pub fn entity(&self) -> &str {
        self.schema.name()
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Typed read of one field.
    pub fn try_get<T: FromValue>(&self, field: &str) -> OrmResult<T> {
        let value = self.fields.get(field).ok_or_else(|| {
            OrmError::decode(field, format!("'{}' has no field '{field}'", self.entity()))
        })?;
        T::from_value(value).map_err(|e| match e {
            OrmError::Decode { message, .. } => OrmError::decode(field, message),
            other => other,
        })
    }

    /// Assign a declared field; the value is coerced to the column type.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> OrmResult<&mut Self> {
        let column = self.schema.column(field).ok_or_else(|| {
            OrmError::invalid_query(format!("'{}' has no field '{field}'", self.entity()))
        })?;
        let value = coerce(column, value.into());
        self.fields.insert(field.to_string(), value);
        self.stored = None;
        Ok(self)
    }

    /// The primary key value, if set.
    pub fn primary_key(&self) -> Option<&Value> {
        self.fields
            .get(&self.schema.primary_key().field)
            .filter(|v| !v.is_null())
    }

    pub fn relations(&self) -> &BTreeMap<String, Related> {
        &self.relations
    }

    pub fn related(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    /// A populated single association.
    pub fn one(&self, name: &str) -> Option<&Entity> {
        match self.relations.get(name) {
            Some(Related::One(e)) => Some(e),
            _ => None,
        }
    }

    /// A populated collection association; `None` when it was not populated.
    pub fn many(&self, name: &str) -> Option<&[Entity]> {
        match self.relations.get(name) {
            Some(Related::Many(items)) => Some(items),
            _ => None,
        }
    }

    /// Same entity type and equal declared column values.
    ///
    /// Two unmodified instances read from storage compare their stored values,
    /// so generated defaults (`Now`, UUIDs) never tell one row apart from itself.
    pub fn matches(&self, other: &Entity) -> bool {
        if self.schema.name() != other.schema.name() {
            return false;
        }
        if let (Some(a), Some(b)) = (&self.stored, &other.stored) {
            return a == b;
        }
        self.schema
            .columns()
            .iter()
            .all(|c| self.fields.get(&c.field) == other.fields.get(&c.field))
    }

    /// Attach a single related entity, merging into an equal one already there.
    pub(crate) fn attach_one(&mut self, name: &str, child: Entity) {
        match self.relations.get_mut(name) {
            Some(Related::One(existing)) if existing.matches(&child) => existing.merge(child),
            _ => {
                self.relations
                    .insert(name.to_string(), Related::One(Box::new(child)));
            }
        }
    }

    /// Append to a collection, merging into an equal entity already present.
    pub(crate) fn attach_many(&mut self, name: &str, child: Entity) {
        let slot = self
            .relations
            .entry(name.to_string())
            .or_insert_with(|| Related::Many(Vec::new()));
        if let Related::One(_) = slot {
            *slot = Related::Many(Vec::new());
        }
        if let Related::Many(items) = slot {
            match items.iter_mut().find(|e| e.matches(&child)) {
                Some(existing) => existing.merge(child),
                None => items.push(child),
            }
        }
    }

    /// Ensure a collection exists even when nothing was attached.
    pub(crate) fn init_many(&mut self, name: &str) {
        self.relations
            .entry(name.to_string())
            .or_insert_with(|| Related::Many(Vec::new()));
    }

    fn merge(&mut self, other: Entity) {
        for (name, related) in other.relations {
            match related {
                Related::One(child) => self.attach_one(&name, *child),
                Related::Many(children) => {
                    self.init_many(&name);
                    for child in children {
                        self.attach_many(&name, child);
                    }
                }
            }
        }
    }

    /// Fields in declaration order, then populated associations.
    pub fn to_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        for column in self.schema.columns() {
            let value = self.fields.get(&column.field).unwrap_or(&Value::Null);
            out.insert(column.field.clone(), value.to_json());
        }
        for (name, related) in &self.relations {
            let value = match related {
                Related::One(e) => e.to_json(),
                Related::Many(items) => {
                    serde_json::Value::Array(items.iter().map(Entity::to_json).collect())
                }
            };
            out.insert(name.clone(), value);
        }
        serde_json::Value::Object(out)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("entity", &self.schema.name())
            .field("fields", &self.fields)
            .field("relations", &self.relations)
            .field("state", &self.state)
            .finish()
    }
}

/// Normalize a raw value to the column's semantic type.
///
/// Values that cannot be converted are kept as-is; validation reports them.
fn coerce(column: &ColumnDef, value: Value) -> Value {
    match (column.data_type, value) {
        (DataType::Boolean, Value::Int(i)) => Value::Bool(i != 0),
        (DataType::Boolean, Value::Text(s)) => match s.as_str() {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            _ => Value::Text(s),
        },
        (DataType::Date, Value::DateTime(dt)) => Value::Date(dt.date()),
        (DataType::Date, Value::Text(s)) => match Value::parse_datetime(&s) {
            Some(dt) => Value::Date(dt.date()),
            None => Value::Text(s),
        },
        (DataType::DateTime, Value::Date(d)) => d
            .and_hms_opt(0, 0, 0)
            .map_or(Value::Date(d), Value::DateTime),
        (DataType::DateTime, Value::Text(s)) => match Value::parse_datetime(&s) {
            Some(dt) => Value::DateTime(dt),
            None => Value::Text(s),
        },
        (DataType::Decimal, Value::Text(s)) => match Decimal::from_str(&s) {
            Ok(d) => Value::Decimal(d),
            Err(_) => Value::Text(s),
        },
        (DataType::Decimal, Value::Int(i)) => Value::Decimal(Decimal::from(i)),
        (DataType::Decimal, Value::Float(f)) => {
            Decimal::from_f64(f).map_or(Value::Float(f), Value::Decimal)
        }
        (t, Value::Text(s)) if t.is_integer() => match s.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Text(s),
        },
        (t, Value::Bool(b)) if t.is_integer() => Value::Int(i64::from(b)),
        (_, other) => other,
    }
}
