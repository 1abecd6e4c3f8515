//! Column validation.
//!
//! Rules are plain data attached to a [`ColumnDef`]; [`validate_value`] is the
//! single dispatcher that evaluates them. Per column the checks run in a fixed
//! order (type, then required, then rules) and the first failure wins.

use crate::schema::{ColumnDef, DataType};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Why a field failed validation.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Required,
    InvalidType,
    InvalidValue,
    MinValue,
    MaxValue,
    MinLength,
    MaxLength,
    Unique,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidValue => "INVALID_VALUE",
            Self::MinValue => "MIN_VALUE",
            Self::MaxValue => "MAX_VALUE",
            Self::MinLength => "MIN_LENGTH",
            Self::MaxLength => "MAX_LENGTH",
            Self::Unique => "UNIQUE",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ValidationReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Field → reason mapping, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, ValidationReason>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Record a failure; a field keeps its first reason.
    pub fn add(&mut self, field: impl Into<String>, reason: ValidationReason) {
        self.fields.entry(field.into()).or_insert(reason);
    }

    pub fn get(&self, field: &str) -> Option<ValidationReason> {
        self.fields.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ValidationReason)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, reason)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {reason}")?;
        }
        Ok(())
    }
}

/// A data-driven validation rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Minimum text length in characters.
    MinLength(usize),
    /// Maximum text length in characters.
    MaxLength(usize),
    /// Minimum numeric value (inclusive).
    Min(f64),
    /// Maximum numeric value (inclusive).
    Max(f64),
    #[cfg(feature = "validate")]
    Email,
    #[cfg(feature = "validate")]
    Url,
    #[cfg(feature = "validate")]
    Pattern(regex::Regex),
    /// The value must equal one of the listed values.
    OneOf(Vec<Value>),
}

impl Rule {
    /// Evaluate against a non-null value.
    pub fn check(&self, value: &Value) -> Result<(), ValidationReason> {
        match self {
            Rule::MinLength(min) => match value.as_str() {
                Some(s) if s.chars().count() < *min => Err(ValidationReason::MinLength),
                _ => Ok(()),
            },
            Rule::MaxLength(max) => match value.as_str() {
                Some(s) if s.chars().count() > *max => Err(ValidationReason::MaxLength),
                _ => Ok(()),
            },
            Rule::Min(min) => match value.as_f64() {
                Some(n) if n < *min => Err(ValidationReason::MinValue),
                _ => Ok(()),
            },
            Rule::Max(max) => match value.as_f64() {
                Some(n) if n > *max => Err(ValidationReason::MaxValue),
                _ => Ok(()),
            },
            #[cfg(feature = "validate")]
            Rule::Email => text_rule(value, is_email),
            #[cfg(feature = "validate")]
            Rule::Url => text_rule(value, is_url),
            #[cfg(feature = "validate")]
            Rule::Pattern(re) => text_rule(value, |s| re.is_match(s)),
            Rule::OneOf(allowed) => {
                if allowed.contains(value) {
                    Ok(())
                } else {
                    Err(ValidationReason::InvalidValue)
                }
            }
        }
    }
}

#[cfg(feature = "validate")]
fn text_rule(value: &Value, ok: impl Fn(&str) -> bool) -> Result<(), ValidationReason> {
    match value.as_str() {
        Some(s) if ok(s) => Ok(()),
        _ => Err(ValidationReason::InvalidValue),
    }
}

/// Best-effort email validation.
///
/// This is intentionally not fully RFC-compliant; use [`Rule::Pattern`] for
/// stricter rules.
#[cfg(feature = "validate")]
pub fn is_email(s: &str) -> bool {
    use std::sync::OnceLock;

    static EMAIL_RE: OnceLock<regex::Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| {
            regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid built-in email regex")
        })
        .is_match(s)
}

#[cfg(feature = "validate")]
pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

/// Which write the value is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The primary key may be missing (it can be generated by the database).
    Insert,
    /// The primary key is required.
    Update,
}

/// Whether `value` is storable in a column of `data_type`.
fn type_matches(data_type: DataType, value: &Value) -> bool {
    match data_type {
        DataType::Varchar | DataType::Text | DataType::LongText => matches!(value, Value::Text(_)),
        DataType::TinyInt
        | DataType::SmallInt
        | DataType::MediumInt
        | DataType::Int
        | DataType::BigInt => matches!(value, Value::Int(_)),
        DataType::Decimal => matches!(value, Value::Int(_) | Value::Float(_) | Value::Decimal(_)),
        DataType::Date | DataType::DateTime => match value {
            Value::Date(_) | Value::DateTime(_) => true,
            Value::Text(s) => Value::parse_datetime(s).is_some(),
            _ => false,
        },
        DataType::Boolean => matches!(value, Value::Bool(_) | Value::Int(0 | 1)),
    }
}

/// Validate one value for one column.
///
/// `None` and `Value::Null` are both "absent".
pub fn validate_value(
    column: &ColumnDef,
    value: Option<&Value>,
    mode: Mode,
) -> Result<(), ValidationReason> {
    let value = value.filter(|v| !v.is_null());

    if let Some(v) = value
        && !type_matches(column.data_type, v)
    {
        return Err(ValidationReason::InvalidType);
    }

    let required = if column.primary_key {
        mode == Mode::Update
    } else {
        column.required
    };
    let Some(value) = value else {
        return if required {
            Err(ValidationReason::Required)
        } else {
            Ok(())
        };
    };

    column.rules.iter().try_for_each(|rule| rule.check(value))
}
