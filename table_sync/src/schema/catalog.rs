//! Abstract field type to native column type mapping

use std::collections::HashMap;

use crate::config::TypeMappingConfig;
use crate::error::{Error, Result};
use crate::schema::types::FieldType;

/// Length used for sized types when a field declares none (or a non-positive one)
pub const DEFAULT_LENGTH: i64 = 255;

/// A native column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeType {
    pub name: String,
    /// Whether the type takes a `(length)` qualifier
    pub sized: bool,
}

impl NativeType {
    pub fn new(name: &str, sized: bool) -> Self {
        Self {
            name: name.to_string(),
            sized,
        }
    }
}

/// Lookup table from abstract field types to native types
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    entries: HashMap<FieldType, NativeType>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        let entries = [
            (FieldType::String, NativeType::new("VARCHAR", true)),
            (FieldType::Number, NativeType::new("INT", true)),
            (FieldType::Boolean, NativeType::new("BOOLEAN", false)),
            (FieldType::Date, NativeType::new("DATE", false)),
            (FieldType::Object, NativeType::new("JSON", false)),
            (FieldType::Array, NativeType::new("JSON", false)),
            (FieldType::Float, NativeType::new("FLOAT", false)),
            (FieldType::Text, NativeType::new("TEXT", false)),
            (FieldType::DateTime, NativeType::new("DATETIME", false)),
            (FieldType::Timestamp, NativeType::new("TIMESTAMP", false)),
        ]
        .into_iter()
        .collect();

        Self { entries }
    }
}

impl TypeCatalog {
    /// A catalog with no entries; every non-enum field is unsupported
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build the default catalog with overrides from configuration applied
    pub fn from_config(config: &TypeMappingConfig) -> Result<Self> {
        let mut catalog = Self::default();

        for (field_type, native) in config.override_.iter().flatten() {
            let field_type: FieldType = field_type.parse().map_err(|t| {
                Error::ConfigError(format!("Unknown field type in type_mapping: {}", t))
            })?;
            catalog.set(field_type, NativeType::new(native, is_sized(native)));
        }

        Ok(catalog)
    }

    pub fn set(&mut self, field_type: FieldType, native: NativeType) {
        self.entries.insert(field_type, native);
    }

    pub fn lookup(&self, field_type: FieldType) -> Option<&NativeType> {
        self.entries.get(&field_type)
    }

    /// Normalize a native type name for comparison: lowercase, no length or
    /// precision suffix, engine aliases folded together.
    pub fn base_type(native: &str) -> String {
        let stripped = native
            .trim()
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match stripped.as_str() {
            "boolean" | "bool" => "tinyint".to_string(),
            "integer" => "int".to_string(),
            "character" => "char".to_string(),
            "real" => "double".to_string(),
            _ => stripped,
        }
    }

    /// Compare two native types the way the diff engine does
    pub fn same_type(expected: &str, actual: &str) -> bool {
        Self::base_type(expected) == Self::base_type(actual)
    }

    /// Member values of an `ENUM(...)` column type, in declaration order.
    /// Accepts both doubled and backslash-escaped quotes.
    pub fn enum_values(native: &str) -> Vec<String> {
        if Self::base_type(native) != "enum" {
            return Vec::new();
        }

        let mut values = Vec::new();
        let mut chars = native.chars().peekable();
        let mut current: Option<String> = None;

        while let Some(c) = chars.next() {
            let Some(value) = current.as_mut() else {
                if c == '\'' {
                    current = Some(String::new());
                }
                continue;
            };

            match c {
                '\\' => value.extend(chars.next()),
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                '\'' => values.extend(current.take()),
                _ => value.push(c),
            }
        }

        values
    }
}

/// Variable-width and integer types take a length qualifier
fn is_sized(native: &str) -> bool {
    matches!(
        TypeCatalog::base_type(native).as_str(),
        "varchar" | "char" | "varbinary" | "binary" | "int" | "tinyint" | "smallint"
            | "mediumint" | "bigint"
    )
}
