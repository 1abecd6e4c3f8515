//! Declared relationships between entities.

use std::fmt;

/// Whether a populated association holds one entity or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A relationship from the owning entity to `target`.
///
/// Foreign keys name entity fields (not storage columns); they are resolved to
/// storage columns when joins are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association {
    /// The owner holds `foreign_key` pointing at the target's primary key.
    BelongsTo {
        name: String,
        target: String,
        foreign_key: String,
    },
    /// The target holds `foreign_key` pointing at the owner's primary key; at most one row.
    HasOne {
        name: String,
        target: String,
        foreign_key: String,
    },
    /// The target holds `foreign_key` pointing at the owner's primary key.
    HasMany {
        name: String,
        target: String,
        foreign_key: String,
    },
    /// Many-to-many through a junction entity that declares a `BelongsTo`
    /// toward each side.
    BelongsToMany {
        name: String,
        target: String,
        through: String,
    },
}

impl Association {
    /// Name the resolved data is attached under.
    pub fn name(&self) -> &str {
        match self {
            Association::BelongsTo { name, .. }
            | Association::HasOne { name, .. }
            | Association::HasMany { name, .. }
            | Association::BelongsToMany { name, .. } => name,
        }
    }

    /// Target entity name.
    pub fn target(&self) -> &str {
        match self {
            Association::BelongsTo { target, .. }
            | Association::HasOne { target, .. }
            | Association::HasMany { target, .. }
            | Association::BelongsToMany { target, .. } => target,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Association::BelongsTo { .. } | Association::HasOne { .. } => Cardinality::One,
            Association::HasMany { .. } | Association::BelongsToMany { .. } => Cardinality::Many,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Association::BelongsTo { .. } => "BELONGS_TO",
            Association::HasOne { .. } => "HAS_ONE",
            Association::HasMany { .. } => "HAS_MANY",
            Association::BelongsToMany { .. } => "BELONGS_TO_MANY",
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' -> {}", self.kind(), self.name(), self.target())
    }
}
