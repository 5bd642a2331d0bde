//! DDL generator
//!
//! This module renders the statements a synchronization pass issues. Every
//! identifier is backtick-quoted and every literal goes through [`literal`].

use crate::error::Result;
use crate::schema::compiler::{ColumnCompiler, ExistingKeys};
use crate::schema::diff::ColumnRename;
use crate::schema::types::{FieldDescriptor, LiveColumn, Row, SqlValue, TableSchema};

/// Quote an identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Render a value as a MySQL literal
pub fn literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlValue::Int(i) => i.to_string(),
        SqlValue::Float(f) if f.is_finite() => f.to_string(),
        SqlValue::Float(_) => "NULL".to_string(),
        SqlValue::Text(s) => {
            let mut escaped = String::with_capacity(s.len() + 2);
            escaped.push('\'');
            for c in s.chars() {
                match c {
                    '\0' => escaped.push_str("\\0"),
                    '\n' => escaped.push_str("\\n"),
                    '\r' => escaped.push_str("\\r"),
                    '\x1a' => escaped.push_str("\\Z"),
                    '\\' => escaped.push_str("\\\\"),
                    '\'' => escaped.push_str("\\'"),
                    '"' => escaped.push_str("\\\""),
                    _ => escaped.push(c),
                }
            }
            escaped.push('\'');
            escaped
        }
        SqlValue::Bytes(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2 + 3);
            hex.push_str("X'");
            for byte in bytes {
                hex.push_str(&format!("{:02x}", byte));
            }
            hex.push('\'');
            hex
        }
    }
}

/// DDL statement generator
pub struct DdlGenerator<'a> {
    compiler: ColumnCompiler<'a>,
}

impl<'a> DdlGenerator<'a> {
    /// Create a new DDL generator
    pub fn new(compiler: ColumnCompiler<'a>) -> Self {
        Self { compiler }
    }

    /// Generate SQL to create a table if it does not exist yet
    pub fn create_table_sql(&self, schema: &TableSchema) -> Result<String> {
        let table = schema.name();
        let mut definitions = Vec::new();

        for (name, desc) in schema.fields() {
            definitions.push(format!(
                "  {} {}",
                quote_identifier(name),
                self.compiler.compile(table, name, desc)?
            ));
        }

        for (name, desc) in schema.fields() {
            if let Some(fk) = &desc.foreign_key {
                definitions.push(format!(
                    "  FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_identifier(name),
                    quote_identifier(&fk.table),
                    quote_identifier(&fk.column)
                ));
            }
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n) DEFAULT CHARACTER SET=utf8mb4;",
            quote_identifier(table),
            definitions.join(",\n")
        ))
    }

    /// Generate SQL to rename a live column, converging its definition at the same time
    pub fn rename_column_sql(
        &self,
        table: &str,
        rename: &ColumnRename,
        desc: &FieldDescriptor,
    ) -> Result<Vec<String>> {
        let mut statements = self.key_removals(table, &rename.from, desc);
        let existing = existing_keys(&rename.from, desc);

        statements.push(format!(
            "ALTER TABLE {} CHANGE COLUMN {} {} {};",
            quote_identifier(table),
            quote_identifier(&rename.from.name),
            quote_identifier(&rename.to),
            self.compiler.compile_against(table, &rename.to, desc, existing)?
        ));

        Ok(statements)
    }

    /// Generate SQL to add a column, plus its foreign key constraint
    pub fn add_column_sql(
        &self,
        table: &str,
        column: &str,
        desc: &FieldDescriptor,
    ) -> Result<Vec<String>> {
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD COLUMN {} {};",
            quote_identifier(table),
            quote_identifier(column),
            self.compiler.compile(table, column, desc)?
        )];

        if let Some(fk) = &desc.foreign_key {
            statements.push(format!(
                "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({});",
                quote_identifier(table),
                quote_identifier(column),
                quote_identifier(&fk.table),
                quote_identifier(&fk.column)
            ));
        }

        Ok(statements)
    }

    /// Generate SQL to bring a live column in line with its declaration
    pub fn modify_column_sql(
        &self,
        table: &str,
        live: &LiveColumn,
        desc: &FieldDescriptor,
    ) -> Result<Vec<String>> {
        let mut statements = self.key_removals(table, live, desc);
        let existing = existing_keys(live, desc);

        statements.push(format!(
            "ALTER TABLE {} MODIFY COLUMN {} {};",
            quote_identifier(table),
            quote_identifier(&live.name),
            self.compiler.compile_against(table, &live.name, desc, existing)?
        ));

        Ok(statements)
    }

    /// Generate SQL to drop a column
    pub fn drop_column_sql(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {};",
            quote_identifier(table),
            quote_identifier(column)
        )
    }

    /// Keys the live column has but the declaration no longer wants
    fn key_removals(&self, table: &str, live: &LiveColumn, desc: &FieldDescriptor) -> Vec<String> {
        let mut statements = Vec::new();

        if live.primary && !desc.primary_key {
            statements.push(format!(
                "ALTER TABLE {} DROP PRIMARY KEY;",
                quote_identifier(table)
            ));
        }

        // The index keeps its original name across CHANGE COLUMN.
        if let Some(index) = live.unique_index.as_deref().filter(|_| !desc.unique) {
            statements.push(format!(
                "ALTER TABLE {} DROP INDEX {};",
                quote_identifier(table),
                quote_identifier(index)
            ));
        }

        statements
    }
}

fn existing_keys(live: &LiveColumn, desc: &FieldDescriptor) -> ExistingKeys {
    ExistingKeys {
        unique: live.is_unique() && desc.unique,
        primary: live.primary && desc.primary_key,
    }
}

/// Generate SQL to drop a table
pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {};", quote_identifier(table))
}

/// Generate SQL reading every row of a table
pub fn select_all_sql(table: &str) -> String {
    format!("SELECT * FROM {};", quote_identifier(table))
}

/// Render rows as one multi-row INSERT statement. `None` when there are no rows.
pub fn insert_rows_sql<F>(table: &str, rows: &[Row], escape: F) -> Option<String>
where
    F: Fn(&SqlValue) -> String,
{
    let first = rows.first()?;
    let columns: Vec<&String> = first.keys().collect();

    let values: Vec<String> = rows
        .iter()
        .map(|row| {
            let row_values: Vec<String> = columns
                .iter()
                .map(|column| match row.get(*column) {
                    Some(value) if !value.is_null() => escape(value),
                    _ => "NULL".to_string(),
                })
                .collect();
            format!("({})", row_values.join(", "))
        })
        .collect();

    let column_list: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();

    Some(format!(
        "INSERT INTO {} ({}) VALUES {};",
        quote_identifier(table),
        column_list.join(", "),
        values.join(", ")
    ))
}
