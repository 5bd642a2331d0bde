//! Column definition compiler
//!
//! Renders one declared field as the engine-native column clause used by
//! `CREATE TABLE`, `ADD COLUMN`, `MODIFY COLUMN` and `CHANGE COLUMN`.

use crate::error::{Error, Result};
use crate::schema::catalog::{TypeCatalog, DEFAULT_LENGTH};
use crate::schema::generator::literal;
use crate::schema::types::{DefaultValue, FieldDescriptor, SqlValue};

/// Keys the live column already carries. Clauses compiled against an existing
/// column leave these out so the statement does not create a duplicate key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExistingKeys {
    pub unique: bool,
    pub primary: bool,
}

/// Compiles field descriptors into column clauses
#[derive(Debug, Clone, Copy)]
pub struct ColumnCompiler<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> ColumnCompiler<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    /// Reject declarations the engine would refuse or silently reinterpret
    pub fn validate(&self, table: &str, field: &str, desc: &FieldDescriptor) -> Result<()> {
        if desc.primary_key && desc.unique {
            return Err(Error::ConflictingConstraint {
                table: table.to_string(),
                field: field.to_string(),
                reason: "a primary key is already unique; remove `unique`".to_string(),
            });
        }

        if desc.not_null() && desc.default == Some(DefaultValue::Null) {
            return Err(Error::ConflictingConstraint {
                table: table.to_string(),
                field: field.to_string(),
                reason: "NOT NULL column cannot default to NULL".to_string(),
            });
        }

        self.native_type(table, field, desc).map(|_| ())
    }

    /// Native type of the column, with its length or enum values
    pub fn native_type(&self, table: &str, field: &str, desc: &FieldDescriptor) -> Result<String> {
        if !desc.enum_values.is_empty() {
            let values: Vec<String> = desc
                .enum_values
                .iter()
                .map(|v| literal(&SqlValue::Text(v.clone())))
                .collect();
            return Ok(format!("ENUM({})", values.join(", ")));
        }

        let native = self
            .catalog
            .lookup(desc.field_type)
            .ok_or_else(|| Error::UnsupportedType {
                table: table.to_string(),
                field: field.to_string(),
                field_type: desc.field_type.to_string(),
            })?;

        if native.sized && !native.name.contains('(') {
            let length = match desc.length {
                Some(length) if length > 0 => length,
                _ => DEFAULT_LENGTH,
            };
            Ok(format!("{}({})", native.name, length))
        } else {
            Ok(native.name.clone())
        }
    }

    /// Compile the clause for a column that does not exist yet
    pub fn compile(&self, table: &str, field: &str, desc: &FieldDescriptor) -> Result<String> {
        self.compile_against(table, field, desc, ExistingKeys::default())
    }

    /// Compile the clause for a column that already exists with `existing` keys
    pub fn compile_against(
        &self,
        table: &str,
        field: &str,
        desc: &FieldDescriptor,
        existing: ExistingKeys,
    ) -> Result<String> {
        self.validate(table, field, desc)?;

        // Order is significant to the engine.
        let mut parts = vec![self.native_type(table, field, desc)?];

        if desc.not_null() {
            parts.push("NOT NULL".to_string());
        }

        match &desc.default {
            Some(DefaultValue::Null) => parts.push("DEFAULT NULL".to_string()),
            Some(DefaultValue::Value(value)) => match value.canonical() {
                Some(text) => parts.push(format!("DEFAULT {}", literal(&SqlValue::Text(text)))),
                None => parts.push("DEFAULT NULL".to_string()),
            },
            None => {}
        }

        if desc.unique && !existing.unique {
            parts.push("UNIQUE".to_string());
        }

        if desc.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if desc.primary_key && !existing.primary {
            parts.push("PRIMARY KEY".to_string());
        }

        if let Some(customize) = desc.customize.as_deref().map(str::trim) {
            if !customize.is_empty() {
                parts.push(customize.to_string());
            }
        }

        Ok(parts.join(" "))
    }
}
