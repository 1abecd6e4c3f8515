use super::*;
use crate::builder::{Aggregate, Direction};
use crate::config::DbConfig;
use crate::schema::{Cardinality, ColumnOptions, DataType, EntityBuilder, Registry, RegistryBuilder};
use std::sync::Arc;

fn registry() -> Arc<Registry> {
    let pk = || ColumnOptions::new(DataType::Int).primary_key().auto_increment();
    RegistryBuilder::new()
        .register(
            EntityBuilder::new("User", "users")
                .column_with("id", pk())
                .column("firstName", DataType::Varchar)
                .column_with(
                    "lastName",
                    ColumnOptions::new(DataType::Varchar)
                        .column("last_name")
                        .required(),
                )
                .has_many("comments", "Comment", "userId")
                .has_one("profile", "Profile", "userId"),
        )
        .register(
            EntityBuilder::new("Comment", "comments")
                .column_with("id", pk())
                .column("userId", DataType::Int)
                .column("body", DataType::Text)
                .belongs_to("author", "User", "userId"),
        )
        .register(
            EntityBuilder::new("Profile", "profiles")
                .column_with("id", pk())
                .column("userId", DataType::Int),
        )
        .register(
            EntityBuilder::new("Actor", "actors")
                .column_with("id", pk())
                .belongs_to_many("movies", "Movie", "Cast"),
        )
        .register(EntityBuilder::new("Movie", "movies").column_with("id", pk()))
        .register(
            EntityBuilder::new("Cast", "cast")
                .column_with("id", pk())
                .column_with("actorId", ColumnOptions::new(DataType::Int).column("actor_id"))
                .column_with("movieId", ColumnOptions::new(DataType::Int).column("movie_id"))
                .belongs_to("actor", "Actor", "actorId")
                .belongs_to("movie", "Movie", "movieId"),
        )
        .build()
        .unwrap()
}

// ==================== Raw queries ====================

#[test]
fn find_with_default_page() {
    let q = compile_find("users", &Filter::new().eq("name", "Luis"), &FindOptions::default())
        .unwrap();
    assert_eq!(
        q.sql(),
        "SELECT * FROM `users` WHERE `name` = ? LIMIT ? OFFSET ?;"
    );
    assert_eq!(
        q.params(),
        &[Value::from("Luis"), Value::Int(1000), Value::Int(0)]
    );
}

#[test]
fn find_with_every_clause() {
    let options = FindOptions::new()
        .select(SelectItem::new("name").table("u"))
        .select(SelectItem::new("id").aggregate(Aggregate::Count).alias("n"))
        .join(Join::inner(
            TableRef::new("comments").alias("c"),
            ("u", "id"),
            ("c", "userId"),
        ))
        .group_by(ColumnRef::qualified("u", "name"))
        .order_by(OrderBy::desc("n"))
        .paginate(3, 20);
    let q = compile_find(TableRef::new("users").alias("u"), &Filter::new(), &options).unwrap();
    assert_eq!(
        q.sql(),
        "SELECT `u`.`name`, COUNT(`id`) AS `n` FROM `users` AS `u` \
         INNER JOIN `comments` AS `c` ON `u`.`id` = `c`.`userId` \
         GROUP BY `u`.`name` ORDER BY `n` DESC LIMIT ? OFFSET ?;"
    );
    assert_eq!(q.params(), &[Value::Int(20), Value::Int(40)]);
}

#[test]
fn find_one_limits_to_one_row() {
    let q = compile_find_one("users", &Filter::new().eq("id", 4), &FindOptions::new().paginate(5, 50))
        .unwrap();
    assert_eq!(q.sql(), "SELECT * FROM `users` WHERE `id` = ? LIMIT ? OFFSET ?;");
    assert_eq!(q.params(), &[Value::Int(4), Value::Int(1), Value::Int(0)]);
}

#[test]
fn count_statements() {
    let q = compile_count("users", &Filter::new().gt("age", 18), &CountOptions::new()).unwrap();
    assert_eq!(
        q.sql(),
        "SELECT COUNT(*) AS `total` FROM `users` WHERE `age` > ?;"
    );

    let q = compile_count("users", &Filter::new(), &CountOptions::new().count_by("email"))
        .unwrap();
    assert_eq!(q.sql(), "SELECT COUNT(`email`) AS `total` FROM `users`;");
}

#[test]
fn insert_update_delete() {
    let q = compile_insert(
        "users",
        [
            ("firstName", Value::from("Luis")),
            ("lastName", Value::from("Diaz")),
            ("email", Value::Null),
        ],
    )
    .unwrap();
    assert_eq!(
        q.sql(),
        "INSERT INTO `users` (`firstName`, `lastName`, `email`) VALUES (?, ?, ?);"
    );
    assert_eq!(q.params().len(), 3);

    let q = compile_update(
        "users",
        [("firstName", Value::from("Ana")), ("email", Value::Null)],
        &Filter::new().eq("id", 7),
    )
    .unwrap();
    assert_eq!(
        q.sql(),
        "UPDATE `users` SET `firstName` = ?, `email` = ? WHERE `id` = ?;"
    );
    assert_eq!(q.params()[2], Value::Int(7));

    let q = compile_delete("users", &Filter::new().eq("id", 7)).unwrap();
    assert_eq!(q.sql(), "DELETE FROM `users` WHERE `id` = ?;");
}

#[test]
fn empty_insert_and_update_are_rejected() {
    let none: Vec<(&str, Value)> = Vec::new();
    assert!(compile_insert("users", none.clone()).is_err());
    assert!(compile_update("users", none, &Filter::new().eq("id", 1)).is_err());
}

// ==================== Entity plans ====================

#[test]
fn entity_find_maps_fields_to_storage() {
    let registry = registry();
    let q = plan_find(
        &registry,
        "User",
        &Filter::new().eq("lastName", "Diaz"),
        &EntityFindOptions::new().order_by(OrderBy::asc("lastName")),
        &DbConfig::default(),
    )
    .unwrap();
    assert!(!q.grouped());
    assert_eq!(
        q.statement.sql(),
        "SELECT * FROM `users` WHERE `last_name` = ? ORDER BY `last_name` ASC LIMIT ? OFFSET ?;"
    );
}

#[test]
fn has_many_join_with_auto_order() {
    let registry = registry();
    let q = plan_find(
        &registry,
        "User",
        &Filter::new().eq("lastName", "Diaz"),
        &EntityFindOptions::new().populate("Comment"),
        &DbConfig::default(),
    )
    .unwrap();
    assert_eq!(
        q.statement.sql(),
        "SELECT `users`.*, `comments`.* FROM `users` \
         INNER JOIN `comments` ON `users`.`id` = `comments`.`userId` \
         WHERE `users`.`last_name` = ? \
         ORDER BY `users`.`id` ASC, `comments`.`id` ASC LIMIT ? OFFSET ?;"
    );
    assert!(q.grouped());

    let level = &q.plan.levels[1];
    assert_eq!(level.label, "comments");
    assert_eq!(level.parent, Some(0));
    assert_eq!(level.association.as_deref(), Some("comments"));
    assert_eq!(level.cardinality, Cardinality::Many);
}

#[test]
fn belongs_to_and_nested_populate_alias_repeated_tables() {
    let registry = registry();
    let config = DbConfig::new().auto_order_populated(false);
    let q = plan_find(
        &registry,
        "Comment",
        &Filter::new(),
        &EntityFindOptions::new().populate(Populate::new("author").with("comments")),
        &config,
    )
    .unwrap();
    assert_eq!(
        q.statement.sql(),
        "SELECT `comments`.*, `users`.*, `comments_2`.* FROM `comments` \
         INNER JOIN `users` ON `comments`.`userId` = `users`.`id` \
         INNER JOIN `comments` AS `comments_2` ON `users`.`id` = `comments_2`.`userId` \
         LIMIT ? OFFSET ?;"
    );
    assert_eq!(q.plan.levels[1].cardinality, Cardinality::One);
    assert_eq!(q.plan.levels[2].parent, Some(1));
}

#[test]
fn belongs_to_many_joins_through_junction() {
    let registry = registry();
    let q = plan_find(
        &registry,
        "Actor",
        &Filter::new(),
        &EntityFindOptions::new().populate("movies"),
        &DbConfig::new().auto_order_populated(false),
    )
    .unwrap();
    assert_eq!(
        q.statement.sql(),
        "SELECT `actors`.*, `movies`.* FROM `actors` \
         INNER JOIN `cast` ON `actors`.`id` = `cast`.`actor_id` \
         INNER JOIN `movies` ON `cast`.`movie_id` = `movies`.`id` \
         LIMIT ? OFFSET ?;"
    );
    assert_eq!(q.plan.levels.len(), 2);
}

#[test]
fn caller_order_comes_first_and_is_not_repeated() {
    let registry = registry();
    let q = plan_find(
        &registry,
        "User",
        &Filter::new(),
        &EntityFindOptions::new()
            .populate("profile")
            .order_by(OrderBy {
                column: ColumnRef::qualified("users", "id"),
                direction: Direction::Desc,
            }),
        &DbConfig::default(),
    )
    .unwrap();
    assert!(q.statement.sql().ends_with(
        "ORDER BY `users`.`id` DESC, `profiles`.`id` ASC LIMIT ? OFFSET ?;"
    ));
}

#[test]
fn qualified_filter_keys_on_joined_levels_are_mapped() {
    let registry = registry();
    let filter = Filter::from_json(&serde_json::json!({"$t.comments.body": {"$like": "%hi%"}}))
        .unwrap();
    let q = plan_find(
        &registry,
        "User",
        &filter,
        &EntityFindOptions::new().populate("comments"),
        &DbConfig::new().auto_order_populated(false),
    )
    .unwrap();
    assert!(q.statement.sql().contains("WHERE `comments`.`body` LIKE ?"));
}

#[test]
fn unknown_association_names_both_entities() {
    let registry = registry();
    let err = plan_find(
        &registry,
        "Comment",
        &Filter::new(),
        &EntityFindOptions::new().populate("Movie"),
        &DbConfig::default(),
    )
    .unwrap_err();
    assert!(err.is_definition());
    assert!(err.to_string().contains("'Comment'"));
    assert!(err.to_string().contains("'Movie'"));
}

#[test]
fn find_one_page_depends_on_populate() {
    let registry = registry();
    let config = DbConfig::default();
    let q = plan_find_one(&registry, "User", &Filter::new(), &EntityFindOptions::new(), &config)
        .unwrap();
    assert_eq!(&q.statement.params()[..], &[Value::Int(1), Value::Int(0)]);

    let q = plan_find_one(
        &registry,
        "User",
        &Filter::new(),
        &EntityFindOptions::new().populate("comments"),
        &config,
    )
    .unwrap();
    assert_eq!(&q.statement.params()[..], &[Value::Int(1000), Value::Int(0)]);
}

#[test]
fn entity_count() {
    let registry = registry();
    let q = plan_count(&registry, "User", &Filter::new().eq("lastName", "Diaz")).unwrap();
    assert_eq!(
        q.sql(),
        "SELECT COUNT(*) AS `total` FROM `users` WHERE `last_name` = ?;"
    );
    assert!(plan_count(&registry, "Ghost", &Filter::new()).is_err());
}
