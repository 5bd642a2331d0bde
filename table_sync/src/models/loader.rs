//! Schema file loader
//!
//! Table declarations can be written in YAML, one mapping per table:
//!
//! ```yaml
//! roles:
//!   id: { type: Number, primary_key: true, auto_increment: true }
//!   name: { type: String, length: 50, unique: true }
//! users:
//!   id: { type: Number, primary_key: true, auto_increment: true }
//!   email: String
//!   roleId: { type: Number, foreign_key: roles.id }
//! ```
//!
//! A field is either a bare type name or a full descriptor. Both forms are
//! normalized into [`FieldDescriptor`] here, once.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::registry::SchemaRegistry;
use crate::schema::types::{DefaultValue, FieldDescriptor, FieldType, ForeignKeyRef, SqlValue};

/// Table name to ordered field declarations
pub type Declarations = IndexMap<String, IndexMap<String, FieldDescriptor>>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    Short(String),
    Full(Box<FullField>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FullField {
    #[serde(rename = "type")]
    field_type: Option<String>,
    length: Option<i64>,
    #[serde(default)]
    required: bool,
    #[serde(default, deserialize_with = "present")]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    unique: bool,
    #[serde(default)]
    auto_increment: bool,
    #[serde(default)]
    primary_key: bool,
    foreign_key: Option<RawForeignKey>,
    #[serde(default, rename = "enum", alias = "enum_values")]
    enum_values: Vec<String>,
    old_name: Option<String>,
    customize: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawForeignKey {
    Dotted(String),
    Parts { table: String, column: String },
}

/// Keeps an explicit `default: null` apart from an absent key
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<serde_yaml::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_yaml::Value::deserialize(deserializer).map(Some)
}

/// Load declarations from a YAML file
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Declarations> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!(
            "Failed to read schema file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_schema_str(&text)
}

/// Parse declarations from YAML text
pub fn parse_schema_str(text: &str) -> Result<Declarations> {
    let raw: IndexMap<String, IndexMap<String, RawField>> = serde_yaml::from_str(text)?;
    let mut declarations = Declarations::new();

    for (table, raw_fields) in raw {
        let mut fields = IndexMap::new();
        for (name, raw_field) in raw_fields {
            let desc = normalize(&table, &name, raw_field)?;
            fields.insert(name, desc);
        }
        declarations.insert(table, fields);
    }

    Ok(declarations)
}

/// Register every declaration, in file order
pub fn register_declarations(
    registry: &mut SchemaRegistry,
    declarations: Declarations,
) -> Result<()> {
    for (table, fields) in declarations {
        registry.register_schema(&table, fields)?;
    }

    Ok(())
}

fn normalize(table: &str, field: &str, raw: RawField) -> Result<FieldDescriptor> {
    let full = match raw {
        RawField::Short(type_name) => {
            return Ok(FieldDescriptor::new(parse_type(table, field, &type_name)?));
        }
        RawField::Full(full) => *full,
    };

    let field_type = match (&full.field_type, full.enum_values.is_empty()) {
        (Some(type_name), _) => parse_type(table, field, type_name)?,
        // Enum values decide the column type on their own
        (None, false) => FieldType::String,
        (None, true) => {
            return Err(Error::ConfigError(format!(
                "Field {}.{} declares neither a type nor enum values",
                table, field
            )))
        }
    };

    let mut desc = FieldDescriptor::new(field_type)
        .required(full.required)
        .unique(full.unique)
        .auto_increment(full.auto_increment)
        .primary_key(full.primary_key)
        .enum_values(full.enum_values);

    if let Some(length) = full.length {
        desc = desc.length(length);
    }

    if let Some(value) = full.default {
        desc.default = Some(default_value(table, field, value)?);
    }

    if let Some(fk) = full.foreign_key {
        desc.foreign_key = Some(match fk {
            RawForeignKey::Dotted(text) => text.parse::<ForeignKeyRef>().map_err(|e| {
                Error::ConfigError(format!("Invalid foreign key on {}.{}: {}", table, field, e))
            })?,
            RawForeignKey::Parts { table, column } => ForeignKeyRef::new(&table, &column),
        });
    }

    if let Some(old_name) = &full.old_name {
        desc = desc.old_name(old_name);
    }

    if let Some(customize) = &full.customize {
        desc = desc.customize(customize);
    }

    Ok(desc)
}

fn parse_type(table: &str, field: &str, type_name: &str) -> Result<FieldType> {
    type_name
        .parse()
        .map_err(|field_type| Error::UnsupportedType {
            table: table.to_string(),
            field: field.to_string(),
            field_type,
        })
}

fn default_value(table: &str, field: &str, value: serde_yaml::Value) -> Result<DefaultValue> {
    let value = match value {
        serde_yaml::Value::Null => return Ok(DefaultValue::Null),
        serde_yaml::Value::Bool(b) => SqlValue::Bool(b),
        serde_yaml::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => SqlValue::Int(i),
            (None, Some(f)) if f.is_finite() => SqlValue::Float(f),
            _ => {
                return Err(Error::ConfigError(format!(
                    "Default of {}.{} must be a finite number, got {}",
                    table, field, n
                )))
            }
        },
        serde_yaml::Value::String(s) => SqlValue::Text(s),
        // Object and Array defaults are stored as JSON text
        value @ (serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_)) => {
            SqlValue::Text(serde_json::to_string(&value)?)
        }
        serde_yaml::Value::Tagged(_) => {
            return Err(Error::ConfigError(format!(
                "Unsupported default on {}.{}",
                table, field
            )))
        }
    };

    Ok(DefaultValue::Value(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SCHEMA: &str = r#"
roles:
  id: { type: Number, primary_key: true, auto_increment: true }
  name: { type: String, length: 50, unique: true }
users:
  id: { type: Number, primary_key: true, auto_increment: true }
  email: string
  status: { enum: [active, banned], default: active }
  nickname: { type: String, default: null }
  score: { type: Float, default: 0 }
  settings: { type: Object, default: { theme: dark } }
  role: { type: String, old_name: rang }
  roleId: { type: Number, foreign_key: roles.id }
  ownerId: { type: Number, foreign_key: { table: users, column: id } }
"#;

    #[test]
    fn parses_short_and_full_forms() {
        let declarations = parse_schema_str(SCHEMA).unwrap();
        assert_eq!(
            declarations.keys().collect::<Vec<_>>(),
            vec!["roles", "users"]
        );

        let users = &declarations["users"];
        assert_eq!(users["email"], FieldDescriptor::new(FieldType::String));
        assert_eq!(
            users["roleId"].foreign_key,
            Some(ForeignKeyRef::new("roles", "id"))
        );
        assert_eq!(
            users["ownerId"].foreign_key,
            Some(ForeignKeyRef::new("users", "id"))
        );
        assert_eq!(users["role"].old_name.as_deref(), Some("rang"));
        assert_eq!(
            users["status"].enum_values.iter().collect::<Vec<_>>(),
            vec!["active", "banned"]
        );
        assert_eq!(declarations["roles"]["name"].length, Some(50));
    }

    #[test]
    fn distinguishes_null_and_absent_defaults() {
        let declarations = parse_schema_str(SCHEMA).unwrap();
        let users = &declarations["users"];

        assert_eq!(users["nickname"].default, Some(DefaultValue::Null));
        assert_eq!(users["email"].default, None);
        assert_eq!(users["role"].default, None);
        assert_eq!(
            users["score"].default,
            Some(DefaultValue::Value(SqlValue::Int(0)))
        );
        assert_eq!(
            users["settings"].default,
            Some(DefaultValue::Value(SqlValue::Text(
                r#"{"theme":"dark"}"#.to_string()
            )))
        );
    }

    #[test]
    fn rejects_unknown_types() {
        let result = parse_schema_str("things:\n  blob: Binary\n");
        assert!(matches!(
            result,
            Err(Error::UnsupportedType { table, field, field_type })
                if table == "things" && field == "blob" && field_type == "Binary"
        ));
    }

    #[rstest]
    #[case(".nan")]
    #[case(".inf")]
    #[case("-.inf")]
    fn rejects_non_finite_defaults(#[case] default: &str) {
        let yaml = format!("things:\n  ratio: {{ type: Float, default: {} }}\n", default);
        let result = parse_schema_str(&yaml);
        assert!(matches!(result, Err(Error::ConfigError(message)) if message.contains("things.ratio")));
    }

    #[test]
    fn registers_in_file_order() {
        let mut registry = SchemaRegistry::default();
        register_declarations(&mut registry, parse_schema_str(SCHEMA).unwrap()).unwrap();
        assert_eq!(registry.table_names(), vec!["roles", "users"]);
    }
}
