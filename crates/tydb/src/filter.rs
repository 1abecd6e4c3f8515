//! Filter descriptions for WHERE clauses.
//!
//! A [`Filter`] is an ordered list of clauses that are ANDed together. A clause is
//! either a column condition or one of the two combinators (`$and`, `$or`), each
//! holding nested filters.
//!
//! Filters can be built in code:
//!
//! ```ignore
//! use tydb::{Filter, Op};
//!
//! let f = Filter::new()
//!     .eq("name", "Luis")
//!     .or(vec![
//!         Filter::new().eq("status", 1),
//!         Filter::new().eq("status", 2).eq("isDeleted", false),
//!     ]);
//! ```
//!
//! or parsed from the JSON mini-language:
//!
//! ```ignore
//! let f = Filter::from_json(&serde_json::json!({
//!     "name": "Luis",
//!     "age": {"$between": {"$from": 18, "$to": 30}},
//!     "$or": [{"status": 1}, {"status": 2}]
//! }))?;
//! ```

use crate::error::{OrmError, OrmResult};
use crate::ident::ColumnRef;
use crate::value::Value;
use serde_json::{Map, Value as Json};

/// Comparison operator applied to one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `col IS NULL`
    IsNull,
    /// `col = ?`
    Eq(Value),
    /// `col <> ?`
    Ne(Value),
    /// `col > ?`
    Gt(Value),
    /// `col >= ?`
    Gte(Value),
    /// `col < ?`
    Lt(Value),
    /// `col <= ?`
    Lte(Value),
    /// `col IS ?`
    Is(Value),
    /// `col IS NOT ?`
    IsNot(Value),
    /// `(col BETWEEN ? AND ?)`
    Between(Value, Value),
    /// `(col NOT BETWEEN ? AND ?)`
    NotBetween(Value, Value),
    /// `col IN (?, ...)`
    In(Vec<Value>),
    /// `col NOT IN (?, ...)`
    NotIn(Vec<Value>),
    /// `col LIKE ?`
    Like(Value),
    /// `col NOT LIKE ?`
    NotLike(Value),
}

/// Operator keys in dispatch order: when an operator object carries several keys,
/// the first one in this list wins.
const OPERATOR_KEYS: &[&str] = &[
    "$eq", "$neq", "$gt", "$gte", "$lt", "$lte", "$is", "$not", "$between", "$nbetween", "$in",
    "$nin", "$like", "$nlike",
];

impl Op {
    /// Number of bind parameters this operator contributes.
    pub fn param_count(&self) -> usize {
        match self {
            Op::IsNull => 0,
            Op::Between(..) | Op::NotBetween(..) => 2,
            Op::In(vals) | Op::NotIn(vals) => vals.len(),
            _ => 1,
        }
    }

    fn from_json_object(key: &str, obj: &Map<String, Json>) -> OrmResult<Self> {
        let Some((op_key, arg)) = OPERATOR_KEYS
            .iter()
            .find_map(|k| obj.get(*k).map(|v| (*k, v)))
        else {
            return Err(OrmError::invalid_query(format!(
                "Filter value for '{key}' is an object without a recognized operator"
            )));
        };

        let op = match op_key {
            "$eq" => Op::Eq(arg.into()),
            "$neq" => Op::Ne(arg.into()),
            "$gt" => Op::Gt(arg.into()),
            "$gte" => Op::Gte(arg.into()),
            "$lt" => Op::Lt(arg.into()),
            "$lte" => Op::Lte(arg.into()),
            "$is" => Op::Is(arg.into()),
            "$not" => Op::IsNot(arg.into()),
            "$between" => {
                let (from, to) = range_bounds(key, op_key, arg)?;
                Op::Between(from, to)
            }
            "$nbetween" => {
                let (from, to) = range_bounds(key, op_key, arg)?;
                Op::NotBetween(from, to)
            }
            "$in" => Op::In(list_values(key, op_key, arg)?),
            "$nin" => Op::NotIn(list_values(key, op_key, arg)?),
            "$like" => Op::Like(arg.into()),
            _ => Op::NotLike(arg.into()),
        };
        Ok(op)
    }

    fn to_json(&self) -> Json {
        let single = |k: &str, v: &Value| {
            let mut m = Map::new();
            m.insert(k.to_string(), v.to_json());
            Json::Object(m)
        };
        let range = |k: &str, from: &Value, to: &Value| {
            let mut bounds = Map::new();
            bounds.insert("$from".to_string(), from.to_json());
            bounds.insert("$to".to_string(), to.to_json());
            let mut m = Map::new();
            m.insert(k.to_string(), Json::Object(bounds));
            Json::Object(m)
        };
        let list = |k: &str, vals: &[Value]| {
            let mut m = Map::new();
            m.insert(
                k.to_string(),
                Json::Array(vals.iter().map(Value::to_json).collect()),
            );
            Json::Object(m)
        };
        match self {
            Op::IsNull => Json::Null,
            Op::Eq(v) => v.to_json(),
            Op::Ne(v) => single("$neq", v),
            Op::Gt(v) => single("$gt", v),
            Op::Gte(v) => single("$gte", v),
            Op::Lt(v) => single("$lt", v),
            Op::Lte(v) => single("$lte", v),
            Op::Is(v) => single("$is", v),
            Op::IsNot(v) => single("$not", v),
            Op::Between(a, b) => range("$between", a, b),
            Op::NotBetween(a, b) => range("$nbetween", a, b),
            Op::In(vals) => list("$in", vals),
            Op::NotIn(vals) => list("$nin", vals),
            Op::Like(v) => single("$like", v),
            Op::NotLike(v) => single("$nlike", v),
        }
    }
}

fn range_bounds(key: &str, op: &str, arg: &Json) -> OrmResult<(Value, Value)> {
    let bounds = arg.as_object().ok_or_else(|| {
        OrmError::invalid_query(format!(
            "'{op}' on '{key}' expects an object with '$from' and '$to'"
        ))
    })?;
    let from = bounds.get("$from").unwrap_or(&Json::Null);
    let to = bounds.get("$to").unwrap_or(&Json::Null);
    Ok((from.into(), to.into()))
}

fn list_values(key: &str, op: &str, arg: &Json) -> OrmResult<Vec<Value>> {
    match arg {
        Json::Array(items) => Ok(items.iter().map(Value::from).collect()),
        _ => Err(OrmError::invalid_query(format!(
            "'{op}' on '{key}' expects an array"
        ))),
    }
}

/// One term of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// A condition on one column.
    Column(ColumnRef, Op),
    /// Every nested filter must hold; each compiles as its own parenthesized group.
    And(Vec<Filter>),
    /// At least one nested filter must hold.
    Or(Vec<Filter>),
}

/// An ordered, implicitly ANDed list of clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// An empty filter (matches everything; compiles to no WHERE clause).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Append a clause.
    pub fn push(&mut self, clause: Clause) -> &mut Self {
        self.clauses.push(clause);
        self
    }

    /// Add a condition on a column. `column` accepts `$t.table.column` keys via
    /// [`ColumnRef::parse`] when given as a [`ColumnRef`].
    pub fn condition(mut self, column: impl Into<ColumnRef>, op: Op) -> Self {
        self.clauses.push(Clause::Column(column.into(), op));
        self
    }

    /// `col = ?`, or `col IS NULL` when the value is null.
    pub fn eq(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            self.condition(column, Op::IsNull)
        } else {
            self.condition(column, Op::Eq(value))
        }
    }

    pub fn ne(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.condition(column, Op::Ne(value.into()))
    }

    pub fn gt(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.condition(column, Op::Gt(value.into()))
    }

    pub fn gte(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.condition(column, Op::Gte(value.into()))
    }

    pub fn lt(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.condition(column, Op::Lt(value.into()))
    }

    pub fn lte(self, column: impl Into<ColumnRef>, value: impl Into<Value>) -> Self {
        self.condition(column, Op::Lte(value.into()))
    }

    pub fn is_null(self, column: impl Into<ColumnRef>) -> Self {
        self.condition(column, Op::IsNull)
    }

    pub fn between(
        self,
        column: impl Into<ColumnRef>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.condition(column, Op::Between(from.into(), to.into()))
    }

    pub fn not_between(
        self,
        column: impl Into<ColumnRef>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        self.condition(column, Op::NotBetween(from.into(), to.into()))
    }

    pub fn in_list<T: Into<Value>>(
        self,
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.condition(column, Op::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<T: Into<Value>>(
        self,
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.condition(
            column,
            Op::NotIn(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn like(self, column: impl Into<ColumnRef>, pattern: impl Into<Value>) -> Self {
        self.condition(column, Op::Like(pattern.into()))
    }

    pub fn not_like(self, column: impl Into<ColumnRef>, pattern: impl Into<Value>) -> Self {
        self.condition(column, Op::NotLike(pattern.into()))
    }

    /// `$and`: each nested filter becomes a parenthesized group joined by `AND`.
    pub fn and(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.clauses.push(Clause::And(filters.into_iter().collect()));
        self
    }

    /// `$or`: each nested filter becomes a parenthesized group joined by `OR`.
    pub fn or(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.clauses.push(Clause::Or(filters.into_iter().collect()));
        self
    }

    /// Number of `?` placeholders this filter compiles to.
    pub fn param_count(&self) -> usize {
        self.clauses
            .iter()
            .map(|c| match c {
                Clause::Column(_, op) => op.param_count(),
                Clause::And(fs) | Clause::Or(fs) => fs.iter().map(Filter::param_count).sum(),
            })
            .sum()
    }

    /// Rewrite every column reference, recursing into combinators.
    pub fn map_columns(&self, f: &impl Fn(&ColumnRef) -> ColumnRef) -> Filter {
        let clauses = self
            .clauses
            .iter()
            .map(|c| match c {
                Clause::Column(col, op) => Clause::Column(f(col), op.clone()),
                Clause::And(fs) => Clause::And(fs.iter().map(|x| x.map_columns(f)).collect()),
                Clause::Or(fs) => Clause::Or(fs.iter().map(|x| x.map_columns(f)).collect()),
            })
            .collect();
        Filter { clauses }
    }

    /// Parse the JSON filter mini-language.
    ///
    /// Keys are visited in document order. Plain scalars mean equality, `null` means
    /// `IS NULL`, objects must carry an operator key (`$eq`, `$neq`, `$gt`, `$gte`,
    /// `$lt`, `$lte`, `$is`, `$not`, `$between`, `$nbetween`, `$in`, `$nin`, `$like`,
    /// `$nlike`). `$and` takes an object or an array of objects, `$or` an array.
    pub fn from_json(json: &Json) -> OrmResult<Self> {
        let obj = json
            .as_object()
            .ok_or_else(|| OrmError::invalid_query("Filter must be a JSON object"))?;

        let mut filter = Filter::new();
        for (key, value) in obj {
            match key.as_str() {
                "$and" => {
                    let nested = match value {
                        Json::Array(items) => items
                            .iter()
                            .map(Filter::from_json)
                            .collect::<OrmResult<Vec<_>>>()?,
                        Json::Object(_) => vec![Filter::from_json(value)?],
                        Json::Null => Vec::new(),
                        _ => {
                            return Err(OrmError::invalid_query(
                                "'$and' expects an object or an array of objects",
                            ));
                        }
                    };
                    filter.clauses.push(Clause::And(nested));
                }
                "$or" => {
                    let Json::Array(items) = value else {
                        return Err(OrmError::invalid_query(
                            "'$or' expects an array of objects",
                        ));
                    };
                    let nested = items
                        .iter()
                        .map(Filter::from_json)
                        .collect::<OrmResult<Vec<_>>>()?;
                    filter.clauses.push(Clause::Or(nested));
                }
                _ => {
                    let column = ColumnRef::parse(key)?;
                    let op = match value {
                        Json::Null => Op::IsNull,
                        Json::Object(inner) => Op::from_json_object(key, inner)?,
                        scalar => Op::Eq(scalar.into()),
                    };
                    filter.clauses.push(Clause::Column(column, op));
                }
            }
        }
        Ok(filter)
    }

    /// Render back to the JSON mini-language.
    ///
    /// Repeated keys at one level are folded into an `$and` array so nothing is lost.
    pub fn to_json(&self) -> Json {
        let mut out = Map::new();
        let mut overflow: Vec<Json> = Vec::new();
        for clause in &self.clauses {
            let (key, value) = match clause {
                Clause::Column(col, op) => (col.to_key(), op.to_json()),
                Clause::And(fs) => (
                    "$and".to_string(),
                    Json::Array(fs.iter().map(Filter::to_json).collect()),
                ),
                Clause::Or(fs) => (
                    "$or".to_string(),
                    Json::Array(fs.iter().map(Filter::to_json).collect()),
                ),
            };
            if out.contains_key(&key) {
                let mut single = Map::new();
                single.insert(key, value);
                overflow.push(Json::Object(single));
            } else {
                out.insert(key, value);
            }
        }
        if !overflow.is_empty() {
            match out.get_mut("$and") {
                Some(Json::Array(existing)) => existing.extend(overflow),
                _ => {
                    out.insert("$and".to_string(), Json::Array(overflow));
                }
            }
        }
        Json::Object(out)
    }
}

impl TryFrom<&Json> for Filter {
    type Error = OrmError;

    fn try_from(json: &Json) -> OrmResult<Self> {
        Filter::from_json(json)
    }
}

impl TryFrom<Json> for Filter {
    type Error = OrmError;

    fn try_from(json: Json) -> OrmResult<Self> {
        Filter::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_null_and_operator_values() {
        let f = Filter::from_json(&json!({
            "name": "Luis",
            "deletedAt": null,
            "age": {"$gte": 18}
        }))
        .unwrap();
        assert_eq!(
            f.clauses(),
            &[
                Clause::Column(ColumnRef::new("name"), Op::Eq("Luis".into())),
                Clause::Column(ColumnRef::new("deletedAt"), Op::IsNull),
                Clause::Column(ColumnRef::new("age"), Op::Gte(18.into())),
            ]
        );
    }

    #[test]
    fn between_reads_bounds_by_name() {
        let f = Filter::from_json(&json!({"age": {"$between": {"$to": 30, "$from": 18}}})).unwrap();
        assert_eq!(
            f.clauses(),
            &[Clause::Column(
                ColumnRef::new("age"),
                Op::Between(18.into(), 30.into())
            )]
        );
        assert_eq!(f.param_count(), 2);
    }

    #[test]
    fn operator_precedence_is_fixed() {
        // `$gt` precedes `$like` in dispatch order regardless of document order.
        let f = Filter::from_json(&json!({"a": {"$like": "x%", "$gt": 1}})).unwrap();
        assert_eq!(
            f.clauses(),
            &[Clause::Column(ColumnRef::new("a"), Op::Gt(1.into()))]
        );
    }

    #[test]
    fn nlike_uses_its_own_argument() {
        let f = Filter::from_json(&json!({"a": {"$nlike": "%x"}})).unwrap();
        assert_eq!(
            f.clauses(),
            &[Clause::Column(ColumnRef::new("a"), Op::NotLike("%x".into()))]
        );
    }

    #[test]
    fn table_qualified_keys() {
        let f = Filter::from_json(&json!({"$t.users.lastName": "2"})).unwrap();
        assert_eq!(
            f.clauses(),
            &[Clause::Column(
                ColumnRef::qualified("users", "lastName"),
                Op::Eq("2".into())
            )]
        );
    }

    #[test]
    fn and_accepts_object_or_array() {
        let single = Filter::from_json(&json!({"$and": {"a": 1}})).unwrap();
        let list = Filter::from_json(&json!({"$and": [{"a": 1}]})).unwrap();
        assert_eq!(single, list);
    }

    #[test]
    fn malformed_descriptions_are_rejected() {
        assert!(Filter::from_json(&json!({"$or": {"a": 1}})).is_err());
        assert!(Filter::from_json(&json!({"a": {"b": 1}})).is_err());
        assert!(Filter::from_json(&json!({"a": {"$in": 1}})).is_err());
        assert!(Filter::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn eq_null_builds_is_null() {
        let f = Filter::new().eq("a", Value::Null);
        assert_eq!(f.clauses(), &[Clause::Column(ColumnRef::new("a"), Op::IsNull)]);
    }

    #[test]
    fn json_round_trip_keeps_structure() {
        let src = json!({
            "name": "Luis",
            "$or": [{"status": 1}, {"status": 2, "isDeleted": false}]
        });
        let f = Filter::from_json(&src).unwrap();
        assert_eq!(f.to_json(), src);
    }
}
