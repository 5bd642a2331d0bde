//! Schema difference calculator
//!
//! This module compares a declared table against its live columns and
//! calculates the column operations needed to converge them.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

use crate::error::Result;
use crate::schema::catalog::TypeCatalog;
use crate::schema::compiler::ColumnCompiler;
use crate::schema::types::{DefaultValue, FieldDescriptor, LiveColumn, TableSchema};

/// A live column that takes a declared field's name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRename {
    pub from: LiveColumn,
    pub to: String,
}

/// Why an existing column has to be modified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyReason {
    Type { expected: String, actual: String },
    EnumValues { expected: Vec<String>, actual: Vec<String> },
    Nullability { expected_nullable: bool },
    Default { expected: Option<String>, actual: Option<String> },
    Unique { expected: bool },
    PrimaryKey { expected: bool },
}

impl fmt::Display for ModifyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModifyReason::Type { expected, actual } => {
                write!(f, "type {} -> {}", actual, expected)
            }
            ModifyReason::EnumValues { expected, actual } => write!(
                f,
                "enum ({}) -> ({})",
                actual.join(", "),
                expected.join(", ")
            ),
            ModifyReason::Nullability { expected_nullable } => {
                if *expected_nullable {
                    write!(f, "NOT NULL -> NULL")
                } else {
                    write!(f, "NULL -> NOT NULL")
                }
            }
            ModifyReason::Default { expected, actual } => write!(
                f,
                "default {} -> {}",
                actual.as_deref().unwrap_or("NULL"),
                expected.as_deref().unwrap_or("NULL")
            ),
            ModifyReason::Unique { expected } => write!(f, "unique -> {}", expected),
            ModifyReason::PrimaryKey { expected } => write!(f, "primary key -> {}", expected),
        }
    }
}

/// Represents a column change
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChange {
    pub column_name: String,
    pub from: LiveColumn,
    pub reasons: Vec<ModifyReason>,
}

/// Ordered column operations for one table. Apply in field order:
/// renames, adds, modifies, drops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnPlan {
    pub table: String,
    pub renames: Vec<ColumnRename>,
    pub adds: Vec<String>,
    pub modifies: Vec<ColumnChange>,
    pub drops: Vec<String>,
    /// Orphan columns left in place because destructive sync is off
    pub suppressed_drops: Vec<String>,
    /// Warnings for the operator, such as rename hints that are now stale
    pub lints: Vec<String>,
}

impl ColumnPlan {
    /// Check if the plan is empty (no changes needed)
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
            && self.adds.is_empty()
            && self.modifies.is_empty()
            && self.drops.is_empty()
    }
}

/// Computes column plans
pub struct SchemaDiffEngine<'a> {
    compiler: ColumnCompiler<'a>,
}

impl<'a> SchemaDiffEngine<'a> {
    pub fn new(compiler: ColumnCompiler<'a>) -> Self {
        Self { compiler }
    }

    /// Diff a declared table against its live columns
    pub fn diff(
        &self,
        declared: &TableSchema,
        live: &[LiveColumn],
        dangerous_sync: bool,
    ) -> Result<ColumnPlan> {
        let table = declared.name();
        let mut plan = ColumnPlan {
            table: table.to_string(),
            ..ColumnPlan::default()
        };

        let live_columns: IndexMap<&str, &LiveColumn> =
            live.iter().map(|col| (col.name.as_str(), col)).collect();
        let mut claimed: HashSet<&str> = HashSet::new();

        for (name, desc) in declared.fields() {
            if let Some(current) = live_columns.get(name.as_str()) {
                if let Some(old_name) = &desc.old_name {
                    plan.lints.push(format!(
                        "{}.{} still declares old_name '{}'; the rename is applied, remove the hint",
                        table, name, old_name
                    ));
                }

                let reasons = self.modify_reasons(table, name, desc, current)?;
                if !reasons.is_empty() {
                    plan.modifies.push(ColumnChange {
                        column_name: name.clone(),
                        from: (*current).clone(),
                        reasons,
                    });
                }
                continue;
            }

            let rename_source = desc.old_name.as_deref().and_then(|old| {
                let source = live_columns.get(old)?;
                let free = !claimed.contains(old) && declared.field(old).is_none();
                free.then_some(*source)
            });

            match rename_source {
                Some(source) => {
                    claimed.insert(source.name.as_str());
                    plan.renames.push(ColumnRename {
                        from: source.clone(),
                        to: name.clone(),
                    });
                }
                None => plan.adds.push(name.clone()),
            }
        }

        for column in live {
            let declared_here = declared.field(&column.name).is_some();
            if declared_here || claimed.contains(column.name.as_str()) {
                continue;
            }

            if dangerous_sync {
                plan.drops.push(column.name.clone());
            } else {
                plan.suppressed_drops.push(column.name.clone());
            }
        }

        Ok(plan)
    }

    fn modify_reasons(
        &self,
        table: &str,
        name: &str,
        desc: &FieldDescriptor,
        live: &LiveColumn,
    ) -> Result<Vec<ModifyReason>> {
        let mut reasons = Vec::new();

        let expected_type = self.compiler.native_type(table, name, desc)?;
        if !TypeCatalog::same_type(&expected_type, &live.data_type) {
            reasons.push(ModifyReason::Type {
                expected: expected_type,
                actual: live.data_type.clone(),
            });
        } else if !desc.enum_values.iter().eq(live.enum_values.iter()) {
            reasons.push(ModifyReason::EnumValues {
                expected: desc.enum_values.iter().cloned().collect(),
                actual: live.enum_values.clone(),
            });
        }

        let expected_nullable = !desc.not_null();
        if expected_nullable != live.nullable {
            reasons.push(ModifyReason::Nullability { expected_nullable });
        }

        if let Some(default) = &desc.default {
            let expected = match default {
                DefaultValue::Null => None,
                DefaultValue::Value(value) => value.canonical(),
            };
            let actual = normalize_live_default(live.default.as_deref());
            if expected != actual {
                reasons.push(ModifyReason::Default { expected, actual });
            }
        }

        if desc.unique != live.is_unique() {
            reasons.push(ModifyReason::Unique {
                expected: desc.unique,
            });
        }

        if desc.primary_key != live.primary {
            reasons.push(ModifyReason::PrimaryKey {
                expected: desc.primary_key,
            });
        }

        Ok(reasons)
    }
}

/// Introspected defaults come back as `NULL`, bare text, or quoted text
/// depending on server flavor; fold them to one representation.
fn normalize_live_default(default: Option<&str>) -> Option<String> {
    let default = default?;
    if default.eq_ignore_ascii_case("null") {
        return None;
    }

    let unquoted = default
        .strip_prefix('\'')
        .and_then(|d| d.strip_suffix('\''))
        .map(|d| d.replace("''", "'"))
        .unwrap_or_else(|| default.to_string());

    Some(unquoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{FieldType, SqlValue};
    use pretty_assertions::assert_eq;

    fn engine_diff(declared: &TableSchema, live: &[LiveColumn], dangerous: bool) -> ColumnPlan {
        let catalog = TypeCatalog::default();
        SchemaDiffEngine::new(ColumnCompiler::new(&catalog))
            .diff(declared, live, dangerous)
            .unwrap()
    }

    fn table(fields: Vec<(&str, FieldDescriptor)>) -> TableSchema {
        TableSchema::new(
            "users",
            fields
                .into_iter()
                .map(|(name, desc)| (name.to_string(), desc))
                .collect(),
        )
    }

    fn users() -> TableSchema {
        table(vec![
            (
                "id",
                FieldDescriptor::new(FieldType::Number)
                    .primary_key(true)
                    .auto_increment(true),
            ),
            (
                "email",
                FieldDescriptor::new(FieldType::String)
                    .length(100)
                    .required(true)
                    .unique(true),
            ),
            (
                "active",
                FieldDescriptor::new(FieldType::Boolean).default_value(true),
            ),
            ("bio", FieldDescriptor::new(FieldType::Text).default_null()),
        ])
    }

    fn users_live() -> Vec<LiveColumn> {
        vec![
            LiveColumn::new("id", "int").nullable(false).primary(true),
            LiveColumn::new("email", "varchar").nullable(false).unique(true),
            LiveColumn::new("active", "tinyint").default("1"),
            LiveColumn::new("bio", "text"),
        ]
    }

    #[test]
    fn identical_table_yields_empty_plan() {
        let plan = engine_diff(&users(), &users_live(), true);
        assert!(plan.is_empty(), "{:?}", plan);
        assert!(plan.suppressed_drops.is_empty());
        assert!(plan.lints.is_empty());
    }

    #[test]
    fn detects_type_change() {
        let declared = table(vec![(
            "name",
            FieldDescriptor::new(FieldType::String).length(50),
        )]);
        let live = vec![LiveColumn::new("name", "text")];

        let plan = engine_diff(&declared, &live, false);
        assert_eq!(plan.modifies.len(), 1);
        assert_eq!(
            plan.modifies[0].reasons,
            vec![ModifyReason::Type {
                expected: "VARCHAR(50)".to_string(),
                actual: "text".to_string(),
            }]
        );
    }

    #[test]
    fn detects_enum_value_changes() {
        let declared = table(vec![(
            "status",
            FieldDescriptor::new(FieldType::String).enum_values(["active", "banned", "muted"]),
        )]);
        let live = vec![LiveColumn::new("status", "enum").enum_values(["active", "banned"])];

        let plan = engine_diff(&declared, &live, false);
        assert_eq!(plan.modifies.len(), 1);
        assert_eq!(
            plan.modifies[0].reasons,
            vec![ModifyReason::EnumValues {
                expected: vec!["active".into(), "banned".into(), "muted".into()],
                actual: vec!["active".into(), "banned".into()],
            }]
        );

        let same = vec![LiveColumn::new("status", "enum").enum_values(["active", "banned", "muted"])];
        assert!(engine_diff(&declared, &same, false).is_empty());
    }

    #[test]
    fn length_differences_are_not_type_changes() {
        let declared = table(vec![(
            "name",
            FieldDescriptor::new(FieldType::String).length(50),
        )]);
        let live = vec![LiveColumn::new("name", "VARCHAR(20)")];

        assert!(engine_diff(&declared, &live, false).is_empty());
    }

    #[test]
    fn detects_nullability_default_and_key_changes() {
        let mut live = users_live();
        live[1].nullable = true;
        live[1].unique_index = None;
        live[2].default = Some("0".to_string());
        live[0].primary = false;

        let plan = engine_diff(&users(), &live, false);
        let reasons: Vec<(String, Vec<ModifyReason>)> = plan
            .modifies
            .into_iter()
            .map(|c| (c.column_name, c.reasons))
            .collect();

        assert_eq!(
            reasons,
            vec![
                (
                    "id".to_string(),
                    vec![ModifyReason::PrimaryKey { expected: true }]
                ),
                (
                    "email".to_string(),
                    vec![
                        ModifyReason::Nullability {
                            expected_nullable: false
                        },
                        ModifyReason::Unique { expected: true },
                    ]
                ),
                (
                    "active".to_string(),
                    vec![ModifyReason::Default {
                        expected: Some("1".to_string()),
                        actual: Some("0".to_string()),
                    }]
                ),
            ]
        );
    }

    #[test]
    fn absent_default_is_never_compared() {
        let declared = table(vec![("name", FieldDescriptor::new(FieldType::Text))]);
        let live = vec![LiveColumn::new("name", "text").default("anything")];
        assert!(engine_diff(&declared, &live, false).is_empty());
    }

    #[test]
    fn quoted_live_defaults_match() {
        let declared = table(vec![(
            "status",
            FieldDescriptor::new(FieldType::String).default_value(SqlValue::Text("it's".into())),
        )]);
        let live = vec![LiveColumn::new("status", "varchar").default("'it''s'")];
        assert!(engine_diff(&declared, &live, false).is_empty());
    }

    #[test]
    fn rename_takes_precedence_over_add_and_drop() {
        let declared = table(vec![
            ("id", FieldDescriptor::new(FieldType::Number).primary_key(true)),
            (
                "role",
                FieldDescriptor::new(FieldType::String).old_name("rang"),
            ),
        ]);
        let live = vec![
            LiveColumn::new("id", "int").nullable(false).primary(true),
            LiveColumn::new("rang", "varchar"),
        ];

        let plan = engine_diff(&declared, &live, true);
        assert_eq!(plan.renames.len(), 1);
        assert_eq!(plan.renames[0].from.name, "rang");
        assert_eq!(plan.renames[0].to, "role");
        assert!(plan.adds.is_empty());
        assert!(plan.drops.is_empty());
        assert!(plan.modifies.is_empty());
    }

    #[test]
    fn rename_source_is_claimed_once() {
        let declared = table(vec![
            ("first", FieldDescriptor::new(FieldType::String).old_name("name")),
            ("second", FieldDescriptor::new(FieldType::String).old_name("name")),
        ]);
        let live = vec![LiveColumn::new("name", "varchar")];

        let plan = engine_diff(&declared, &live, true);
        assert_eq!(plan.renames.len(), 1);
        assert_eq!(plan.renames[0].to, "first");
        assert_eq!(plan.adds, vec!["second".to_string()]);
        assert!(plan.drops.is_empty());
    }

    #[test]
    fn stale_rename_hint_is_linted() {
        let declared = table(vec![(
            "role",
            FieldDescriptor::new(FieldType::String).old_name("rang"),
        )]);
        let live = vec![LiveColumn::new("role", "varchar")];

        let plan = engine_diff(&declared, &live, false);
        assert!(plan.is_empty());
        assert_eq!(plan.lints.len(), 1);
        assert!(plan.lints[0].contains("old_name 'rang'"));
    }

    #[test]
    fn drops_require_dangerous_sync() {
        let mut live = users_live();
        live.push(LiveColumn::new("legacy", "varchar"));

        let safe = engine_diff(&users(), &live, false);
        assert!(safe.drops.is_empty());
        assert_eq!(safe.suppressed_drops, vec!["legacy".to_string()]);

        let dangerous = engine_diff(&users(), &live, true);
        assert_eq!(dangerous.drops, vec!["legacy".to_string()]);
        assert!(dangerous.suppressed_drops.is_empty());
    }

    #[test]
    fn missing_columns_are_added_in_declaration_order() {
        let plan = engine_diff(&users(), &users_live()[..1], false);
        assert_eq!(
            plan.adds,
            vec!["email".to_string(), "active".to_string(), "bio".to_string()]
        );
    }
}
