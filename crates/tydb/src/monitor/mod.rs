//! Statement hooks for observability.
//!
//! Every statement a [`Db`](crate::Db) sends to its executor passes through the
//! configured [`QueryHook`]: `before_query` can veto it, `after_query` sees the
//! outcome and duration.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tydb::monitor::{CompositeHook, StatsHook, TracingSqlHook};
//!
//! let stats = Arc::new(StatsHook::new());
//! let hook = CompositeHook::new()
//!     .add(TracingSqlHook::new().max_sql_length(500))
//!     .add_arc(stats.clone());
//! let db = Db::new(executor, registry).with_hook(hook);
//! ```

mod hooks;
mod types;

#[cfg(feature = "tracing")]
mod tracing_hook;

pub use hooks::{CompositeHook, QueryStats, StatsHook};
pub use types::{HookAction, QueryContext, QueryHook, QueryResult, QueryType};

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingSqlHook;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
