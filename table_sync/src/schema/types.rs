//! Type definitions for declared and live schema objects

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract field types a declaration may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
    Float,
    Text,
    DateTime,
    Timestamp,
}

impl FieldType {
    pub const ALL: [FieldType; 10] = [
        FieldType::String,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Date,
        FieldType::Object,
        FieldType::Array,
        FieldType::Float,
        FieldType::Text,
        FieldType::DateTime,
        FieldType::Timestamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
            FieldType::Object => "Object",
            FieldType::Array => "Array",
            FieldType::Float => "Float",
            FieldType::Text => "Text",
            FieldType::DateTime => "DateTime",
            FieldType::Timestamp => "Timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// A scalar value as stored in a row or declared as a column default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw bytes of a binary, blob or bit column
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Canonical text form, as the engine reports it back from introspection.
    /// `None` for NULL.
    pub fn canonical(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

/// One row of a table, column name to value, in column order
pub type Row = IndexMap<String, SqlValue>;

/// Declared default of a field. Absence is `Option::None` on the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    Null,
    Value(SqlValue),
}

/// Foreign key reference from a field to `table.column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
}

impl ForeignKeyRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl FromStr for ForeignKeyRef {
    type Err = String;

    /// Parses `table.column`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                Ok(ForeignKeyRef::new(table.trim(), column.trim()))
            }
            _ => Err(format!("expected 'table.column', got '{}'", s)),
        }
    }
}

/// One column's declared intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub field_type: FieldType,
    pub length: Option<i64>,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub unique: bool,
    pub auto_increment: bool,
    pub primary_key: bool,
    pub foreign_key: Option<ForeignKeyRef>,
    pub enum_values: IndexSet<String>,
    pub old_name: Option<String>,
    pub customize: Option<String>,
}

impl FieldDescriptor {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            length: None,
            required: false,
            default: None,
            unique: false,
            auto_increment: false,
            primary_key: false,
            foreign_key: None,
            enum_values: IndexSet::new(),
            old_name: None,
            customize: None,
        }
    }

    pub fn length(mut self, length: i64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_null(mut self) -> Self {
        self.default = Some(DefaultValue::Null);
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn foreign_key(mut self, table: &str, column: &str) -> Self {
        self.foreign_key = Some(ForeignKeyRef::new(table, column));
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn old_name(mut self, old_name: &str) -> Self {
        self.old_name = Some(old_name.to_string());
        self
    }

    pub fn customize(mut self, customize: &str) -> Self {
        self.customize = Some(customize.to_string());
        self
    }

    /// Whether the column must be NOT NULL
    pub fn not_null(&self) -> bool {
        self.required || self.primary_key
    }
}

/// A declared table: name plus ordered fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    fields: IndexMap<String, FieldDescriptor>,
}

impl TableSchema {
    pub fn new(name: &str, fields: IndexMap<String, FieldDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &IndexMap<String, FieldDescriptor> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Tables this one references through foreign keys, in field order
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.fields
            .values()
            .filter_map(|f| f.foreign_key.as_ref())
            .map(|fk| fk.table.as_str())
    }
}

impl AsRef<TableSchema> for TableSchema {
    fn as_ref(&self) -> &TableSchema {
        self
    }
}

/// Snapshot of one existing database column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Name of the non-primary unique index covering the column
    pub unique_index: Option<String>,
    /// Members of an ENUM column, empty for other types
    pub enum_values: Vec<String>,
    /// Part of the primary key
    pub primary: bool,
}

impl LiveColumn {
    /// Create a new nullable column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
            unique_index: None,
            enum_values: Vec::new(),
            primary: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Mark the column unique through an index named after it
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique_index = unique.then(|| self.name.clone());
        self
    }

    pub fn unique_index(mut self, index: &str) -> Self {
        self.unique_index = Some(index.to_string());
        self
    }

    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_unique(&self) -> bool {
        self.unique_index.is_some()
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }
}
