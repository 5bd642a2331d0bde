//! Database schema analyzer
//!
//! This module assembles live column snapshots from the executor's
//! introspection primitives. Snapshots are never cached: every call reads the
//! database again.

use crate::db::executor::Executor;
use crate::error::Result;
use crate::schema::types::LiveColumn;

/// Schema analyzer for database schema introspection
pub struct SchemaAnalyzer<'a> {
    executor: &'a dyn Executor,
}

impl<'a> SchemaAnalyzer<'a> {
    /// Create a new schema analyzer
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    /// Names of all tables currently in the database
    pub async fn tables(&self) -> Result<Vec<String>> {
        self.executor.introspect_tables().await
    }

    /// Live columns of a table, with unique and primary key membership
    pub async fn live_columns(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let mut columns = self.executor.introspect_columns(table).await?;

        for column in &mut columns {
            column.primary = self
                .executor
                .introspect_primary_key(table, &column.name)
                .await?;
            column.unique_index = self
                .executor
                .introspect_unique_index(table, &column.name)
                .await?;
        }

        tracing::trace!(table, columns = columns.len(), "Analyzed live columns");
        Ok(columns)
    }
}
