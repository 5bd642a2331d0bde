//! Schema registry for table_sync
//!
//! This module holds the table declarations a synchronization pass works on.
//! Declarations are validated when they are registered, so a pass never starts
//! with a configuration error pending.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::schema::catalog::TypeCatalog;
use crate::schema::compiler::ColumnCompiler;
use crate::schema::types::{FieldDescriptor, TableSchema};
use crate::utils::naming::{get_table_name, validate_identifier, validate_table_name};

/// A Rust type that declares a table, usually through `#[derive(Model)]`
pub trait Model {
    /// Name of the Rust type
    fn model_name() -> &'static str;

    /// Explicit table name, if the model sets one
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Declared fields in declaration order
    fn fields() -> Vec<(String, FieldDescriptor)>;

    /// Table name used when registering the model
    fn resolved_table_name() -> String {
        Self::table_name()
            .map(str::to_string)
            .unwrap_or_else(|| get_table_name(Self::model_name(), "snake_case", true))
    }
}

/// Registry of declared tables, in registration order
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<TableSchema>>,
    catalog: TypeCatalog,
}

impl SchemaRegistry {
    /// Create an empty registry resolving types through `catalog`
    pub fn new(catalog: TypeCatalog) -> Self {
        Self {
            schemas: Vec::new(),
            catalog,
        }
    }

    /// Validate and register a table declaration
    pub fn register_schema(
        &mut self,
        table: &str,
        fields: IndexMap<String, FieldDescriptor>,
    ) -> Result<Arc<TableSchema>> {
        validate_table_name(table)?;

        if self.get(table).is_some() {
            return Err(Error::ConfigError(format!(
                "Table '{}' is already registered",
                table
            )));
        }

        if fields.is_empty() {
            return Err(Error::ConfigError(format!(
                "Table '{}' declares no fields",
                table
            )));
        }

        let compiler = ColumnCompiler::new(&self.catalog);
        for (name, desc) in &fields {
            validate_identifier(name)?;
            compiler.validate(table, name, desc)?;

            if let Some(fk) = &desc.foreign_key {
                validate_identifier(&fk.table)?;
                validate_identifier(&fk.column)?;
            }
            if let Some(old_name) = &desc.old_name {
                validate_identifier(old_name)?;
            }
        }

        let schema = Arc::new(TableSchema::new(table, fields));
        self.schemas.push(schema.clone());
        tracing::debug!(table, fields = schema.fields().len(), "Registered schema");

        Ok(schema)
    }

    /// Register the table a model declares
    pub fn register_model<M: Model>(&mut self) -> Result<Arc<TableSchema>> {
        let table = M::resolved_table_name();
        let fields: IndexMap<String, FieldDescriptor> = M::fields().into_iter().collect();
        self.register_schema(&table, fields)
    }

    /// Declarations as of now, for one pass
    pub fn snapshot(&self) -> Vec<Arc<TableSchema>> {
        self.schemas.clone()
    }

    pub fn get(&self, table: &str) -> Option<&Arc<TableSchema>> {
        self.schemas.iter().find(|s| s.name() == table)
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
