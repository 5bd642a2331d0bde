//! Models module for table_sync
//!
//! This module handles table registration, from Rust models or schema files.

pub mod loader;
pub mod registry;

pub use loader::{load_schema_file, parse_schema_str, register_declarations, Declarations};
pub use registry::{Model, SchemaRegistry};
