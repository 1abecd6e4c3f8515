use crate::builder::DEFAULT_PAGE_SIZE;

/// Configuration for a [`Db`](crate::Db) handle.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Page size used when a find has no pagination (the unrestricted ceiling).
    pub default_page_size: u64,
    /// Append `ORDER BY` over every level's primary key when populating.
    pub auto_order_populated: bool,
    /// Refuse raw `DELETE` statements without a `WHERE` clause.
    pub reject_unfiltered_delete: bool,
    /// Log every statement through `tracing` (needs the `tracing` feature).
    pub sql_logging: bool,
    /// Truncate logged SQL to this many bytes.
    pub max_logged_sql_length: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            auto_order_populated: true,
            reject_unfiltered_delete: true,
            sql_logging: false,
            max_logged_sql_length: 200,
        }
    }
}

impl DbConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default page size; zero is treated as one.
    pub fn page_size(mut self, per: u64) -> Self {
        self.default_page_size = per.max(1);
        self
    }

    pub fn auto_order_populated(mut self, enabled: bool) -> Self {
        self.auto_order_populated = enabled;
        self
    }

    pub fn reject_unfiltered_delete(mut self, enabled: bool) -> Self {
        self.reject_unfiltered_delete = enabled;
        self
    }

    /// Enable SQL logging.
    pub fn with_sql_logging(mut self) -> Self {
        self.sql_logging = true;
        self
    }

    /// Set the maximum logged SQL length in bytes.
    pub fn max_logged_sql_length(mut self, len: usize) -> Self {
        self.max_logged_sql_length = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_builder() {
        let config = DbConfig::new();
        assert_eq!(config.default_page_size, 1000);
        assert!(config.auto_order_populated);
        assert!(config.reject_unfiltered_delete);
        assert!(!config.sql_logging);

        let config = DbConfig::new()
            .page_size(0)
            .auto_order_populated(false)
            .with_sql_logging()
            .max_logged_sql_length(80);
        assert_eq!(config.default_page_size, 1);
        assert!(!config.auto_order_populated);
        assert!(config.sql_logging);
        assert_eq!(config.max_logged_sql_length, 80);
    }
}
