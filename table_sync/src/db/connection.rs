//! Database connection handling
//!
//! This module provides the MySQL connection pool and its implementation of
//! the [`Executor`] capability.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::{Column as _, Executor as _, FromRow, MySqlPool, Row as _, TypeInfo as _, ValueRef as _};

use crate::config::DatabaseConfig;
use crate::db::executor::Executor;
use crate::error::Result;
use crate::schema::catalog::TypeCatalog;
use crate::schema::types::{LiveColumn, Row, SqlValue};

/// MySQL connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: MySqlPool,
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(10);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
}

#[derive(FromRow)]
struct CountRow {
    matches: i64,
}

#[async_trait]
impl Executor for DatabaseConnection {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        // A bare &str goes over the text protocol, which accepts any DDL.
        let rows = self.pool.fetch_all(sql).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn introspect_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = DATABASE()
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn introspect_columns(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(data_type AS CHAR) AS data_type,
                CAST(column_type AS CHAR) AS column_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_default AS CHAR) AS column_default
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|col| LiveColumn {
                name: col.column_name,
                enum_values: TypeCatalog::enum_values(&col.column_type),
                data_type: col.data_type,
                nullable: col.is_nullable == "YES",
                default: col.column_default,
                unique_index: None,
                primary: false,
            })
            .collect())
    }

    async fn introspect_unique_index(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        let sql = r#"
            SELECT CAST(index_name AS CHAR) AS index_name
            FROM information_schema.statistics
            WHERE table_schema = DATABASE()
              AND table_name = ?
              AND column_name = ?
              AND non_unique = 0
              AND index_name <> 'PRIMARY'
            ORDER BY index_name
            LIMIT 1
        "#;

        let row = sqlx::query_as::<_, IndexRow>(sql)
            .bind(table)
            .bind(column)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.index_name))
    }

    async fn introspect_primary_key(&self, table: &str, column: &str) -> Result<bool> {
        let sql = r#"
            SELECT COUNT(*) AS matches
            FROM information_schema.statistics
            WHERE table_schema = DATABASE()
              AND table_name = ?
              AND column_name = ?
              AND index_name = 'PRIMARY'
        "#;

        let row = sqlx::query_as::<_, CountRow>(sql)
            .bind(table)
            .bind(column)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.matches > 0)
    }
}

fn decode_row(row: &MySqlRow) -> Result<Row> {
    let mut decoded = Row::new();

    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            SqlValue::Null
        } else {
            decode_value(row, index, column.type_info().name())?
        };
        decoded.insert(column.name().to_string(), value);
    }

    Ok(decoded)
}

fn decode_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue> {
    let value = match type_name {
        "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let value = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(value)
                .map(SqlValue::Int)
                .unwrap_or_else(|_| SqlValue::Text(value.to_string()))
        }
        "FLOAT" | "DOUBLE" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?)
        }
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}
