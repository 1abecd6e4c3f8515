//! WHERE clause compilation.

use crate::error::OrmResult;
use crate::filter::{Clause, Filter, Op};
use crate::ident::ColumnRef;
use crate::sql::Sql;
use crate::value::Value;

/// Compile a filter into a boolean SQL expression.
///
/// - An empty filter yields an empty fragment (no `WHERE`).
/// - Top level (`nested == false`) emits a leading ` WHERE `.
/// - Nested groups (`$and`/`$or` branches) are wrapped in parentheses and never
///   emit `WHERE`.
///
/// Parameters are appended in emission order, so the `?` placeholders and
/// `params()` always line up.
pub fn compile_where(filter: &Filter, nested: bool) -> OrmResult<Sql> {
    let terms = compile_terms(filter)?;
    let mut out = Sql::empty();
    if terms.is_empty() {
        return Ok(out);
    }

    out.push(if nested { "(" } else { " WHERE " });
    for (i, term) in terms.into_iter().enumerate() {
        if i > 0 {
            out.push(" AND ");
        }
        out.push_sql(term);
    }
    if nested {
        out.push(")");
    }
    Ok(out)
}

/// Compile each clause of one level into an ANDed term.
fn compile_terms(filter: &Filter) -> OrmResult<Vec<Sql>> {
    let siblings = filter.clauses().len();
    let mut terms = Vec::with_capacity(siblings);

    for clause in filter.clauses() {
        match clause {
            Clause::Column(column, op) => terms.push(compile_condition(column, op)?),
            Clause::And(filters) => {
                // `$and` flattens into successive ANDed groups.
                for nested in filters {
                    let group = compile_where(nested, true)?;
                    if !group.is_empty() {
                        terms.push(group);
                    }
                }
            }
            Clause::Or(filters) => {
                let mut groups = Vec::with_capacity(filters.len());
                for nested in filters {
                    let group = compile_where(nested, true)?;
                    if !group.is_empty() {
                        groups.push(group);
                    }
                }
                if groups.is_empty() {
                    continue;
                }

                // The OR chain binds as a unit only when it shares its level with
                // other clauses; alone it needs no extra wrapping.
                let wrap = siblings > 1;
                let mut term = Sql::empty();
                if wrap {
                    term.push("(");
                }
                for (i, group) in groups.into_iter().enumerate() {
                    if i > 0 {
                        term.push(" OR ");
                    }
                    term.push_sql(group);
                }
                if wrap {
                    term.push(")");
                }
                terms.push(term);
            }
        }
    }
    Ok(terms)
}

/// Render a single column condition.
pub(crate) fn compile_condition(column: &ColumnRef, op: &Op) -> OrmResult<Sql> {
    let mut q = Sql::empty();
    match op {
        Op::Between(from, to) => push_range(&mut q, column, " BETWEEN ", from, to)?,
        Op::NotBetween(from, to) => push_range(&mut q, column, " NOT BETWEEN ", from, to)?,
        Op::IsNull => {
            q.push_column(column)?.push(" IS NULL");
        }
        Op::In(vals) => {
            q.push_column(column)?
                .push(" IN (")
                .push_bind_list(vals.iter().cloned())
                .push(")");
        }
        Op::NotIn(vals) => {
            q.push_column(column)?
                .push(" NOT IN (")
                .push_bind_list(vals.iter().cloned())
                .push(")");
        }
        Op::Eq(v) => push_binary(&mut q, column, " = ", v)?,
        Op::Ne(v) => push_binary(&mut q, column, " <> ", v)?,
        Op::Gt(v) => push_binary(&mut q, column, " > ", v)?,
        Op::Gte(v) => push_binary(&mut q, column, " >= ", v)?,
        Op::Lt(v) => push_binary(&mut q, column, " < ", v)?,
        Op::Lte(v) => push_binary(&mut q, column, " <= ", v)?,
        Op::Is(v) => push_binary(&mut q, column, " IS ", v)?,
        Op::IsNot(v) => push_binary(&mut q, column, " IS NOT ", v)?,
        Op::Like(v) => push_binary(&mut q, column, " LIKE ", v)?,
        Op::NotLike(v) => push_binary(&mut q, column, " NOT LIKE ", v)?,
    }
    Ok(q)
}

fn push_binary(q: &mut Sql, column: &ColumnRef, operator: &str, value: &Value) -> OrmResult<()> {
    q.push_column(column)?.push(operator).push_bind(value.clone());
    Ok(())
}

/// `(col BETWEEN ? AND ?)`: always two params, `from` first.
fn push_range(
    q: &mut Sql,
    column: &ColumnRef,
    keyword: &str,
    from: &Value,
    to: &Value,
) -> OrmResult<()> {
    q.push("(");
    q.push_column(column)?
        .push(keyword)
        .push_bind(from.clone())
        .push(" AND ")
        .push_bind(to.clone())
        .push(")");
    Ok(())
}
