mod common;

use async_trait::async_trait;
use common::{MockExecutor, registry};
use std::sync::{Arc, Mutex};
use tydb::migrate::{HISTORY_TABLE, Migration, MigrationHandler};
use tydb::{Db, Executor, OrmError, OrmResult, Value, flat_row};

/// Records which steps ran.
struct Step {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    fail_up: bool,
}

#[async_trait]
impl<E: Executor> Migration<E> for Step {
    fn name(&self) -> &str {
        self.name
    }

    async fn up(&self, db: &Db<E>) -> OrmResult<()> {
        if self.fail_up {
            return Err(OrmError::core("syntax error"));
        }
        let ddl = db.schema("User")?.create_table()?;
        db.run(&ddl).await?;
        self.log.lock().unwrap().push(format!("up {}", self.name));
        Ok(())
    }

    async fn down(&self, _db: &Db<E>) -> OrmResult<()> {
        self.log.lock().unwrap().push(format!("down {}", self.name));
        Ok(())
    }
}

fn handler(log: &Arc<Mutex<Vec<String>>>, fail: Option<&'static str>) -> MigrationHandler<MockExecutor> {
    let step = |name| Step {
        name,
        log: Arc::clone(log),
        fail_up: fail == Some(name),
    };
    MigrationHandler::new()
        .add(step("CreateUsers"))
        .add(step("AddComments"))
        .add(step("AddIndexes"))
}

/// History rows exist for the given names only.
fn with_history(applied: &'static [&'static str]) -> MockExecutor {
    MockExecutor::new().respond(move |sql, params| {
        let hit = sql.contains(HISTORY_TABLE)
            && sql.starts_with("SELECT")
            && matches!(params.first(), Some(Value::Text(name)) if applied.contains(&name.as_str()));
        let rows = if hit {
            vec![flat_row([("id", Value::Int(9))])]
        } else {
            Vec::new()
        };
        Ok(tydb::ExecResult::rows(rows))
    })
}

#[tokio::test]
async fn prepare_creates_history_table() {
    let executor = MockExecutor::new();
    let db = Db::new(executor.clone(), registry());
    let log = Arc::new(Mutex::new(Vec::new()));
    handler(&log, None).prepare(&db).await.unwrap();

    assert_eq!(
        executor.sqls(),
        vec![
            "CREATE TABLE IF NOT EXISTS `db_migration_history` (\
             `id` INT NOT NULL AUTO_INCREMENT, PRIMARY KEY (`id`), \
             `migration_name` TEXT NOT NULL, \
             `implemented_at` DATETIME NOT NULL);"
        ]
    );
}

#[tokio::test]
async fn migrate_skips_applied_and_records_new() {
    let executor = with_history(&["CreateUsers"]);
    let db = Db::new(executor.clone(), registry());
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = handler(&log, None);
    assert_eq!(
        handler.names().collect::<Vec<_>>(),
        vec!["CreateUsers", "AddComments", "AddIndexes"]
    );

    handler.migrate(&db).await.unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["up AddComments".to_string(), "up AddIndexes".to_string()]
    );

    let inserts: Vec<_> = executor
        .calls()
        .into_iter()
        .filter(|c| c.sql.starts_with("INSERT"))
        .collect();
    assert_eq!(inserts.len(), 2);
    assert_eq!(
        inserts[0].sql,
        "INSERT INTO `db_migration_history` (`migration_name`, `implemented_at`) VALUES (?, ?);"
    );
    assert_eq!(inserts[0].params[0], Value::from("AddComments"));
    assert!(matches!(inserts[0].params[1], Value::DateTime(_)));
}

#[tokio::test]
async fn migrate_stops_at_failure() {
    let executor = with_history(&[]);
    let db = Db::new(executor.clone(), registry());
    let log = Arc::new(Mutex::new(Vec::new()));

    let err = handler(&log, Some("AddComments"))
        .migrate(&db)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("syntax error"));
    assert_eq!(*log.lock().unwrap(), vec!["up CreateUsers".to_string()]);
    let inserts = executor
        .sqls()
        .into_iter()
        .filter(|s| s.starts_with("INSERT"))
        .count();
    assert_eq!(inserts, 1);
}

#[tokio::test]
async fn rollback_undoes_latest_only() {
    let executor = with_history(&["CreateUsers", "AddComments"]);
    let db = Db::new(executor.clone(), registry());
    let log = Arc::new(Mutex::new(Vec::new()));

    handler(&log, None).rollback(&db).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["down AddComments".to_string()]);

    let calls = executor.calls();
    let delete = calls.last().unwrap();
    assert_eq!(
        delete.sql,
        "DELETE FROM `db_migration_history` WHERE `id` = ?;"
    );
    assert_eq!(delete.params, vec![Value::Int(9)]);
}

#[tokio::test]
async fn rollback_with_nothing_applied_is_a_no_op() {
    let executor = with_history(&[]);
    let db = Db::new(executor.clone(), registry());
    let log = Arc::new(Mutex::new(Vec::new()));

    handler(&log, None).rollback(&db).await.unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert!(executor.sqls().iter().all(|s| s.starts_with("SELECT")));
    assert_eq!(executor.calls().len(), 3);
}
