use super::{Association, ColumnDef, ColumnOptions, DataType, EntitySchema};
use crate::error::{OrmError, OrmResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Describes one entity type before registration.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    name: String,
    table: String,
    columns: Vec<ColumnDef>,
    associations: Vec<Association>,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Shorthand column: type only, nullable, no default.
    pub fn column(self, field: impl Into<String>, data_type: DataType) -> Self {
        self.column_with(field, ColumnOptions::new(data_type))
    }

    /// Column with full options.
    pub fn column_with(mut self, field: impl Into<String>, options: ColumnOptions) -> Self {
        self.columns.push(options.into_column(field));
        self
    }

    /// `foreign_key` is a field of this entity holding the target's primary key.
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associations.push(Association::BelongsTo {
            name: name.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// `foreign_key` is a field of the target holding this entity's primary key.
    pub fn has_one(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associations.push(Association::HasOne {
            name: name.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// `foreign_key` is a field of the target holding this entity's primary key.
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.associations.push(Association::HasMany {
            name: name.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// Many-to-many through the junction entity `through`.
    pub fn belongs_to_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        through: impl Into<String>,
    ) -> Self {
        self.associations.push(Association::BelongsToMany {
            name: name.into(),
            target: target.into(),
            through: through.into(),
        });
        self
    }

    /// Checks that need only this entity.
    fn build(self) -> OrmResult<EntitySchema> {
        let mut fields = HashSet::new();
        let mut storage = HashSet::new();
        for column in &self.columns {
            if !fields.insert(column.field.as_str()) {
                return Err(OrmError::definition(format!(
                    "Duplicated field name '{}' in entity '{}'",
                    column.field, self.name
                )));
            }
            if !storage.insert(column.storage.as_str()) {
                return Err(OrmError::definition(format!(
                    "Duplicated column name '{}' in entity '{}'",
                    column.storage, self.name
                )));
            }
        }

        let mut keys = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(i, _)| i);
        let primary_key = match (keys.next(), keys.next()) {
            (Some(i), None) => i,
            (None, _) => {
                return Err(OrmError::definition(format!(
                    "Entity '{}' has no primary key",
                    self.name
                )));
            }
            (Some(_), Some(_)) => {
                return Err(OrmError::definition(format!(
                    "Entity '{}' declares more than one primary key",
                    self.name
                )));
            }
        };

        let mut names = HashSet::new();
        for assoc in &self.associations {
            if fields.contains(assoc.name()) || !names.insert(assoc.name()) {
                return Err(OrmError::definition(format!(
                    "Association name '{}' in entity '{}' collides with another field or association",
                    assoc.name(),
                    self.name
                )));
            }
        }

        Ok(EntitySchema {
            name: self.name,
            table: self.table,
            columns: self.columns,
            primary_key,
            associations: self.associations,
        })
    }
}

/// Collects entity descriptions and freezes them into a [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    entities: Vec<EntityBuilder>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity: EntityBuilder) -> Self {
        self.entities.push(entity);
        self
    }

    /// Check every entity and association and freeze the result.
    pub fn build(self) -> OrmResult<Arc<Registry>> {
        let mut entities = BTreeMap::new();
        for builder in self.entities {
            let schema = builder.build()?;
            let name = schema.name.clone();
            if entities.insert(name.clone(), Arc::new(schema)).is_some() {
                return Err(OrmError::definition(format!(
                    "Entity '{name}' is registered twice"
                )));
            }
        }

        let registry = Registry { entities };
        for schema in registry.entities.values() {
            for assoc in schema.associations() {
                registry.check_association(schema, assoc)?;
            }
        }
        Ok(Arc::new(registry))
    }
}

/// Immutable entity name → schema lookup.
#[derive(Debug, Default)]
pub struct Registry {
    entities: BTreeMap<String, Arc<EntitySchema>>,
}

impl Registry {
    pub fn get(&self, name: &str) -> Option<&Arc<EntitySchema>> {
        self.entities.get(name)
    }

    /// Like [`Registry::get`], but an unknown name is a definition error.
    pub fn entity(&self, name: &str) -> OrmResult<&Arc<EntitySchema>> {
        self.get(name)
            .ok_or_else(|| OrmError::definition(format!("Entity '{name}' is not registered")))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn check_association(&self, owner: &EntitySchema, assoc: &Association) -> OrmResult<()> {
        let target = self.get(assoc.target()).ok_or_else(|| {
            OrmError::definition(format!(
                "Association '{}' of '{}' targets unregistered entity '{}'",
                assoc.name(),
                owner.name(),
                assoc.target()
            ))
        })?;

        let (holder, foreign_key) = match assoc {
            Association::BelongsTo { foreign_key, .. } => (owner, foreign_key),
            Association::HasOne { foreign_key, .. } | Association::HasMany { foreign_key, .. } => {
                (target.as_ref(), foreign_key)
            }
            Association::BelongsToMany { through, .. } => {
                return match self.get(through) {
                    Some(_) => Ok(()),
                    None => Err(OrmError::definition(format!(
                        "Association '{}' of '{}' goes through unregistered entity '{through}'",
                        assoc.name(),
                        owner.name()
                    ))),
                };
            }
        };
        if holder.column(foreign_key).is_none() {
            return Err(OrmError::definition(format!(
                "Foreign key '{foreign_key}' of association '{}' is not a field of '{}'",
                assoc.name(),
                holder.name()
            )));
        }
        Ok(())
    }

    /// The junction's foreign keys `(toward owner, toward target)` for a
    /// many-to-many association.
    ///
    /// The junction must declare exactly one `BelongsTo` toward each side.
    pub fn junction_keys<'a>(
        &'a self,
        owner: &str,
        target: &str,
        through: &str,
    ) -> OrmResult<(&'a Arc<EntitySchema>, &'a str, &'a str)> {
        let junction = self.entity(through)?;
        let side = |entity: &str| -> OrmResult<&'a str> {
            let mut keys = junction.associations().iter().filter_map(|a| match a {
                Association::BelongsTo {
                    target,
                    foreign_key,
                    ..
                } if target == entity => Some(foreign_key.as_str()),
                _ => None,
            });
            match (keys.next(), keys.next()) {
                (Some(key), None) => Ok(key),
                (None, _) => Err(OrmError::definition(format!(
                    "Junction '{through}' has no BELONGS_TO association to '{entity}'"
                ))),
                (Some(_), Some(_)) => Err(OrmError::definition(format!(
                    "Junction '{through}' has more than one BELONGS_TO association to '{entity}'"
                ))),
            }
        };
        Ok((junction, side(owner)?, side(target)?))
    }
}
