//! SQL executor
//!
//! The execution capability the synchronization core runs against. The core
//! never opens or closes connections; it only issues statements and
//! introspection reads through this trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::generator::literal;
use crate::schema::types::{LiveColumn, Row, SqlValue};

/// Statement execution and metadata introspection
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one statement and return the rows it produced, if any
    async fn execute(&self, sql: &str) -> Result<Vec<Row>>;

    /// Names of all base tables in the current schema
    async fn introspect_tables(&self) -> Result<Vec<String>>;

    /// Columns of a table in ordinal order. Key membership flags are filled
    /// in by [`crate::schema::SchemaAnalyzer`].
    async fn introspect_columns(&self, table: &str) -> Result<Vec<LiveColumn>>;

    /// Name of the non-primary unique index covering the column, if any
    async fn introspect_unique_index(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>>;

    /// Whether the column is part of the primary key
    async fn introspect_primary_key(&self, table: &str, column: &str) -> Result<bool>;

    /// Render a value as a literal of this engine
    fn escape_literal(&self, value: &SqlValue) -> String {
        literal(value)
    }
}

/// Execute multiple SQL statements in order, stopping at the first failure
pub async fn execute_batch(executor: &dyn Executor, statements: &[String]) -> Result<()> {
    for statement in statements {
        tracing::debug!(sql = %statement, "Executing statement");
        executor.execute(statement).await?;
    }

    Ok(())
}
