use super::*;
use crate::filter::Filter;
use crate::ident::ColumnRef;
use crate::value::Value;
use serde_json::json;

fn placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}

#[test]
fn test_empty_filter_has_no_where() {
    let q = compile_where(&Filter::new(), false).unwrap();
    assert!(q.is_empty());
    assert!(q.params().is_empty());

    let q = compile_where(&Filter::new(), true).unwrap();
    assert_eq!(q.sql(), "");
}

#[test]
fn test_simple_equality() {
    let f = Filter::new().eq("name", "Luis");
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE `name` = ?");
    assert_eq!(q.params(), &[Value::from("Luis")]);
}

#[test]
fn test_nested_group_is_parenthesized() {
    let f = Filter::new().eq("a", 1).eq("b", 2);
    let q = compile_where(&f, true).unwrap();
    assert_eq!(q.sql(), "(`a` = ? AND `b` = ?)");
}

#[test]
fn test_or_after_sibling_binds_as_unit() {
    let f = Filter::from_json(&json!({
        "name": "Luis",
        "$or": [{"status": 1}, {"status": 2, "isDeleted": false}]
    }))
    .unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(
        q.sql(),
        " WHERE `name` = ? AND ((`status` = ?) OR (`status` = ? AND `isDeleted` = ?))"
    );
    assert_eq!(
        q.params(),
        &[
            Value::from("Luis"),
            Value::Int(1),
            Value::Int(2),
            Value::Bool(false)
        ]
    );
}

#[test]
fn test_lone_or_has_no_redundant_wrapping() {
    let f = Filter::from_json(&json!({"$or": [{"a": 1}, {"b": 2}]})).unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE (`a` = ?) OR (`b` = ?)");
}

#[test]
fn test_leading_or_with_sibling_is_still_wrapped() {
    let f = Filter::from_json(&json!({"$or": [{"a": 1}, {"b": 2}], "c": 3})).unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE ((`a` = ?) OR (`b` = ?)) AND `c` = ?");
    assert_eq!(q.params(), &[Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn test_and_array_flattens_into_groups() {
    let f = Filter::from_json(&json!({
        "$and": [{"a": 1, "b": 2}, {"c": {"$gt": 3}}],
        "d": null
    }))
    .unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(
        q.sql(),
        " WHERE (`a` = ? AND `b` = ?) AND (`c` > ?) AND `d` IS NULL"
    );
    assert_eq!(q.params().len(), 3);
}

#[test]
fn test_and_object_form() {
    let f = Filter::from_json(&json!({"$and": {"a": 1}})).unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE (`a` = ?)");
}

#[test]
fn test_between_params_follow_from_to_order() {
    // `$to` listed first in the document; params still come out from, to.
    let f = Filter::from_json(&json!({
        "age": {"$between": {"$to": 30, "$from": 18}},
        "score": {"$nbetween": {"$from": 1, "$to": 2}}
    }))
    .unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(
        q.sql(),
        " WHERE (`age` BETWEEN ? AND ?) AND (`score` NOT BETWEEN ? AND ?)"
    );
    assert_eq!(
        q.params(),
        &[Value::Int(18), Value::Int(30), Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn test_every_operator() {
    let f = Filter::from_json(&json!({
        "a": {"$eq": 1},
        "b": {"$neq": 2},
        "c": {"$gt": 3},
        "d": {"$gte": 4},
        "e": {"$lt": 5},
        "f": {"$lte": 6},
        "g": {"$is": null},
        "h": {"$not": null},
        "i": {"$in": [1, 2, 3]},
        "j": {"$nin": ["x"]},
        "k": {"$like": "L%"},
        "l": {"$nlike": "%z"}
    }))
    .unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(
        q.sql(),
        " WHERE `a` = ? AND `b` <> ? AND `c` > ? AND `d` >= ? AND `e` < ? AND `f` <= ? \
         AND `g` IS ? AND `h` IS NOT ? AND `i` IN (?, ?, ?) AND `j` NOT IN (?) \
         AND `k` LIKE ? AND `l` NOT LIKE ?"
    );
    assert_eq!(placeholders(q.sql()), q.params().len());
    assert_eq!(q.params().len(), f.param_count());
}

#[test]
fn test_empty_in_list_renders_null() {
    let f = Filter::new().in_list("id", Vec::<i64>::new());
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE `id` IN (NULL)");
    assert!(q.params().is_empty());
}

#[test]
fn test_qualified_key() {
    let f = Filter::from_json(&json!({"$t.users.lastName": "Diaz"})).unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE `users`.`lastName` = ?");
}

#[test]
fn test_deeply_nested_placeholders_match_params() {
    let f = Filter::from_json(&json!({
        "a": 1,
        "$or": [
            {"b": {"$in": [1, 2]}, "$and": [{"c": 3}, {"$or": [{"d": 4}, {"e": {"$between": {"$from": 5, "$to": 6}}}]}]},
            {"f": null}
        ],
        "g": {"$like": "%q%"}
    }))
    .unwrap();
    let q = compile_where(&f, false).unwrap();
    assert_eq!(placeholders(q.sql()), q.params().len());
    assert_eq!(
        q.params(),
        &[
            Value::Int(1),
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
            Value::Int(5),
            Value::Int(6),
            Value::from("%q%"),
        ]
    );
}

#[test]
fn test_empty_or_branches_are_skipped() {
    let f = Filter::new().eq("a", 1).or(vec![Filter::new(), Filter::new()]);
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE `a` = ?");
}

#[test]
fn test_select_star_and_items() {
    assert_eq!(compile_select(&[]).unwrap().sql(), "SELECT *");

    let items = vec![
        SelectItem::new("id"),
        SelectItem::new("name").alias("n").table("users"),
        SelectItem::new("*").aggregate(Aggregate::Count).alias("total"),
        SelectItem::new("role").aggregate(Aggregate::Distinct),
        SelectItem::all_of("roles"),
    ];
    assert_eq!(
        compile_select(&items).unwrap().sql(),
        "SELECT `id`, `users`.`name` AS `n`, COUNT(*) AS `total`, DISTINCT(`role`), `roles`.*"
    );
}

#[test]
fn test_join_variants() {
    let joins = vec![
        Join::inner("roles", ("users", "roleId"), ("roles", "id")),
        Join::new(
            JoinType::Left,
            TableRef::new("teams").alias("t"),
            ("users", "teamId"),
            ("t", "id"),
        ),
        Join::new(JoinType::Right, "logs", "userId", "id"),
    ];
    assert_eq!(
        compile_join(&joins).unwrap().sql(),
        " INNER JOIN `roles` ON `users`.`roleId` = `roles`.`id` \
         LEFT JOIN `teams` AS `t` ON `users`.`teamId` = `t`.`id` \
         RIGHT JOIN `logs` ON `userId` = `id`"
    );
    assert!(compile_join(&[]).unwrap().is_empty());
}

#[test]
fn test_group_and_order() {
    let q = compile_group_by(&[ColumnRef::new("role"), ColumnRef::qualified("users", "team")])
        .unwrap();
    assert_eq!(q.sql(), " GROUP BY `role`, `users`.`team`");
    assert!(compile_group_by(&[]).unwrap().is_empty());

    let q = compile_order_by(&[OrderBy::desc(("users", "createdAt")), OrderBy::asc("id")])
        .unwrap();
    assert_eq!(q.sql(), " ORDER BY `users`.`createdAt` DESC, `id` ASC");
    assert!(compile_order_by(&[]).unwrap().is_empty());
}

#[test]
fn test_limit_offset() {
    let q = compile_limit(Pagination::default());
    assert_eq!(q.sql(), " LIMIT ? OFFSET ?");
    assert_eq!(q.params(), &[Value::Int(1000), Value::Int(0)]);

    let q = compile_limit(Pagination::new(3, 20));
    assert_eq!(q.params(), &[Value::Int(20), Value::Int(40)]);

    // page 0 reads as the first page
    let q = compile_limit(Pagination::new(0, 10));
    assert_eq!(q.params(), &[Value::Int(10), Value::Int(0)]);

    let q = compile_limit(Pagination::single());
    assert_eq!(q.params(), &[Value::Int(1), Value::Int(0)]);
}

#[test]
fn test_backticks_in_identifiers_are_doubled() {
    let f = Filter::new().eq("we`ird", 1);
    let q = compile_where(&f, false).unwrap();
    assert_eq!(q.sql(), " WHERE `we``ird` = ?");
    assert!(compile_select(&[SelectItem::new("")]).is_err());
}
