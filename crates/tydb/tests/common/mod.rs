#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tydb::{
    ColumnOptions, DataType, EntityBuilder, ExecResult, Executor, OrmResult, Registry,
    RegistryBuilder, Row, Rule, Value,
};

/// One statement seen by [`MockExecutor`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<Value>,
    pub grouped: bool,
}

type Responder = Box<dyn Fn(&str, &[Value]) -> OrmResult<ExecResult> + Send + Sync>;

/// Records every statement and answers from a queue, then from a responder.
#[derive(Clone, Default)]
pub struct MockExecutor {
    calls: Arc<Mutex<Vec<Call>>>,
    queue: Arc<Mutex<VecDeque<OrmResult<ExecResult>>>>,
    responder: Option<Arc<Responder>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for the next unanswered statement.
    pub fn push(&self, result: OrmResult<ExecResult>) -> &Self {
        self.queue.lock().unwrap().push_back(result);
        self
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.push(Ok(ExecResult::rows(rows)))
    }

    /// Answer statements the queue does not cover.
    pub fn respond(
        mut self,
        f: impl Fn(&str, &[Value]) -> OrmResult<ExecResult> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Arc::new(Box::new(f)));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sqls(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.sql).collect()
    }
}

impl Executor for MockExecutor {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        grouped: bool,
    ) -> impl std::future::Future<Output = OrmResult<ExecResult>> + Send {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
            grouped,
        });
        let queued = self.queue.lock().unwrap().pop_front();
        let result = match (queued, &self.responder) {
            (Some(result), _) => result,
            (None, Some(responder)) => responder(sql, params),
            (None, None) => Ok(ExecResult::default()),
        };
        std::future::ready(result)
    }
}

/// Users with comments, plus a unique email.
pub fn registry() -> Arc<Registry> {
    RegistryBuilder::new()
        .register(
            EntityBuilder::new("User", "users")
                .column_with(
                    "id",
                    ColumnOptions::new(DataType::Int)
                        .primary_key()
                        .auto_increment(),
                )
                .column("firstName", DataType::Varchar)
                .column_with("lastName", ColumnOptions::new(DataType::Varchar).required())
                .column_with(
                    "email",
                    ColumnOptions::new(DataType::Varchar)
                        .unique()
                        .rule(Rule::MaxLength(64)),
                )
                .has_many("comments", "Comment", "userId"),
        )
        .register(
            EntityBuilder::new("Comment", "comments")
                .column_with("id", ColumnOptions::new(DataType::Int).primary_key())
                .column("userId", DataType::Int)
                .column("body", DataType::Text)
                .belongs_to("user", "User", "userId"),
        )
        .build()
        .unwrap()
}

/// A table-grouped row.
pub fn grouped_row(slices: Vec<(&str, Vec<(&str, Value)>)>) -> Row {
    slices
        .into_iter()
        .map(|(label, cols)| {
            let record = cols
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            (label.to_string(), record)
        })
        .collect()
}
