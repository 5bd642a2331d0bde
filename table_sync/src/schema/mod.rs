//! Schema module for table_sync
//!
//! This module handles declared table definitions, live schema introspection,
//! column diffing and DDL generation.

pub mod analyzer;
pub mod catalog;
pub mod compiler;
pub mod dependency;
pub mod diff;
pub mod generator;
pub mod types;

// Re-export key types
pub use analyzer::SchemaAnalyzer;
pub use catalog::{NativeType, TypeCatalog};
pub use compiler::{ColumnCompiler, ExistingKeys};
pub use dependency::DependencyGraph;
pub use diff::{ColumnChange, ColumnPlan, ColumnRename, ModifyReason, SchemaDiffEngine};
pub use generator::DdlGenerator;
pub use types::{
    DefaultValue, FieldDescriptor, FieldType, ForeignKeyRef, LiveColumn, Row, SqlValue,
    TableSchema,
};
