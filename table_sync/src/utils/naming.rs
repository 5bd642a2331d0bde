//! Naming utilities for table_sync
//!
//! Table name derivation for models and identifier validation for declared
//! tables and columns.

use inflector::Inflector;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// MySQL identifiers are limited to 64 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Apply a naming convention to a string
pub fn apply_naming_convention(name: &str, convention: &str) -> String {
    match convention {
        "snake_case" => name.to_snake_case(),
        "camel_case" => name.to_camel_case(),
        "pascal_case" => name.to_pascal_case(),
        "screaming_snake_case" => name.to_screaming_snake_case(),
        _ => name.to_string(),
    }
}

/// Get table name from a model name according to convention
pub fn get_table_name(model_name: &str, style: &str, pluralize: bool) -> String {
    let name = apply_naming_convention(model_name, style);

    if pluralize {
        self::pluralize(&name)
    } else {
        name
    }
}

/// Convert a singular name to plural
pub fn pluralize(name: &str) -> String {
    // The inflector misses a few irregular nouns
    match name.to_lowercase().as_str() {
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        "man" => "men".to_string(),
        "woman" => "women".to_string(),
        "mouse" => "mice".to_string(),
        _ => name.to_plural(),
    }
}

/// Check if a name is a reserved SQL keyword
pub fn is_sql_keyword(name: &str) -> bool {
    const SQL_KEYWORDS: &[&str] = &[
        "add", "all", "alter", "and", "any", "as", "asc", "between", "by", "case", "check",
        "column", "constraint", "create", "database", "default", "delete", "desc", "distinct",
        "drop", "else", "end", "exists", "foreign", "from", "full", "group", "having", "in",
        "index", "inner", "insert", "into", "is", "join", "key", "left", "like", "limit", "not",
        "null", "on", "or", "order", "outer", "primary", "procedure", "references", "right",
        "select", "set", "table", "truncate", "union", "unique", "update", "values", "view",
        "where", "with",
    ];

    SQL_KEYWORDS.contains(&name.to_lowercase().as_str())
}

/// Validate a table or column identifier
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.len() > MAX_IDENTIFIER_LENGTH || !IDENTIFIER.is_match(name) {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}

/// Validate a table name: a valid identifier that is not a reserved keyword
pub fn validate_table_name(name: &str) -> Result<()> {
    validate_identifier(name)?;

    if is_sql_keyword(name) {
        return Err(Error::ReservedTableName(name.to_string()));
    }

    Ok(())
}
