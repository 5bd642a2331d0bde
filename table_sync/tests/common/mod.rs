//! In-memory stand-in for a MySQL database
//!
//! Interprets exactly the statements table_sync generates and keeps a log of
//! every statement it was asked to run.

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Mutex;

use table_sync::error::{Error, Result};
use table_sync::schema::catalog::TypeCatalog;
use table_sync::schema::types::{LiveColumn, Row, SqlValue};
use table_sync::Executor;

static CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^CREATE TABLE IF NOT EXISTS `([^`]+)` \(\n(.*)\n\) DEFAULT CHARACTER SET=utf8mb4;$")
        .unwrap()
});
static ADD_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ALTER TABLE `([^`]+)` ADD COLUMN `([^`]+)` (.*);$").unwrap());
static MODIFY_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ALTER TABLE `([^`]+)` MODIFY COLUMN `([^`]+)` (.*);$").unwrap());
static CHANGE_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ALTER TABLE `([^`]+)` CHANGE COLUMN `([^`]+)` `([^`]+)` (.*);$").unwrap()
});
static DROP_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ALTER TABLE `([^`]+)` DROP COLUMN `([^`]+)`;$").unwrap());
static DROP_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ALTER TABLE `([^`]+)` DROP INDEX `([^`]+)`;$").unwrap());
static DROP_PRIMARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ALTER TABLE `([^`]+)` DROP PRIMARY KEY;$").unwrap());
static ADD_FOREIGN_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ALTER TABLE `([^`]+)` ADD FOREIGN KEY \(`([^`]+)`\) REFERENCES `([^`]+)` \(`([^`]+)`\);$")
        .unwrap()
});
static DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DROP TABLE IF EXISTS `([^`]+)`;$").unwrap());
static SELECT_ALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SELECT \* FROM `([^`]+)`;$").unwrap());
static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^INSERT INTO `([^`]+)` \(([^)]*)\) VALUES (.*);$").unwrap()
});
static DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DEFAULT (NULL|'(?:[^'\\]|\\.)*')").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct FakeColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Name of the unique index on the column
    pub unique_index: Option<String>,
    pub enum_values: Vec<String>,
    pub primary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<FakeColumn>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct State {
    tables: IndexMap<String, FakeTable>,
    log: Vec<String>,
    fail_on: Option<String>,
}

#[derive(Debug, Default)]
pub struct FakeDatabase {
    state: Mutex<State>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `needle`
    pub fn fail_on(&self, needle: &str) {
        self.state.lock().unwrap().fail_on = Some(needle.to_string());
    }

    pub fn clear_failure(&self) {
        self.state.lock().unwrap().fail_on = None;
    }

    /// Every statement executed so far, failed ones included
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Run a seeding statement that must succeed
    pub async fn run_statement(&self, sql: &str) {
        self.execute(sql).await.unwrap();
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.state.lock().unwrap().tables.contains_key(table)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.state.lock().unwrap().tables.keys().cloned().collect()
    }

    pub fn column(&self, table: &str, column: &str) -> Option<FakeColumn> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .cloned()
    }

    pub fn column_names(&self, table: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)
            .map(|t| t.columns.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn run(&self, sql: &str) -> std::result::Result<Vec<Row>, String> {
        let mut state = self.state.lock().unwrap();
        state.log.push(sql.to_string());

        if let Some(needle) = &state.fail_on {
            if sql.contains(needle.as_str()) {
                return Err(format!("injected failure on: {}", sql));
            }
        }

        let tables = &mut state.tables;

        if let Some(caps) = CREATE.captures(sql) {
            let table = caps[1].to_string();
            if tables.contains_key(&table) {
                return Ok(Vec::new());
            }
            let mut columns = Vec::new();
            for line in caps[2].split(",\n") {
                let line = line.trim();
                if line.starts_with("FOREIGN KEY") {
                    continue;
                }
                let (name, clause) = line
                    .strip_prefix('`')
                    .and_then(|l| l.split_once("` "))
                    .ok_or_else(|| format!("bad column line: {}", line))?;
                columns.push(parse_clause(name, clause, None));
            }
            tables.insert(table, FakeTable { columns, rows: Vec::new() });
            return Ok(Vec::new());
        }

        if let Some(caps) = ADD_COLUMN.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            if table.columns.iter().any(|c| c.name == caps[2]) {
                return Err(format!("Duplicate column name '{}'", &caps[2]));
            }
            let column = parse_clause(&caps[2], &caps[3], None);
            let fill = column
                .default
                .clone()
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null);
            for row in &mut table.rows {
                row.insert(column.name.clone(), fill.clone());
            }
            table.columns.push(column);
            return Ok(Vec::new());
        }

        if let Some(caps) = MODIFY_COLUMN.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            let index = column_index(table, &caps[2])?;
            let previous = table.columns[index].clone();
            table.columns[index] = parse_clause(&caps[2], &caps[3], Some(&previous));
            return Ok(Vec::new());
        }

        if let Some(caps) = CHANGE_COLUMN.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            let index = column_index(table, &caps[2])?;
            let previous = table.columns[index].clone();
            let (old, new) = (caps[2].to_string(), caps[3].to_string());
            table.columns[index] = parse_clause(&new, &caps[4], Some(&previous));
            for row in &mut table.rows {
                let renamed: Row = row
                    .drain(..)
                    .map(|(k, v)| if k == old { (new.clone(), v) } else { (k, v) })
                    .collect();
                *row = renamed;
            }
            return Ok(Vec::new());
        }

        if let Some(caps) = DROP_COLUMN.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            let index = column_index(table, &caps[2])?;
            table.columns.remove(index);
            for row in &mut table.rows {
                row.shift_remove(&caps[2]);
            }
            return Ok(Vec::new());
        }

        if let Some(caps) = DROP_INDEX.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            let column = table
                .columns
                .iter_mut()
                .find(|c| c.unique_index.as_deref() == Some(&caps[2]))
                .ok_or_else(|| format!("Can't DROP '{}'; check that it exists", &caps[2]))?;
            column.unique_index = None;
            return Ok(Vec::new());
        }

        if let Some(caps) = DROP_PRIMARY.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            for column in &mut table.columns {
                column.primary = false;
            }
            return Ok(Vec::new());
        }

        if let Some(caps) = ADD_FOREIGN_KEY.captures(sql) {
            let target = caps[3].to_string();
            let table = table_mut(tables, &caps[1])?;
            column_index(table, &caps[2])?;
            if !tables.contains_key(&target) {
                return Err(format!("Failed to open the referenced table '{}'", target));
            }
            return Ok(Vec::new());
        }

        if let Some(caps) = DROP_TABLE.captures(sql) {
            tables.shift_remove(&caps[1]);
            return Ok(Vec::new());
        }

        if let Some(caps) = SELECT_ALL.captures(sql) {
            return Ok(table_mut(tables, &caps[1])?.rows.clone());
        }

        if let Some(caps) = INSERT.captures(sql) {
            let table = table_mut(tables, &caps[1])?;
            let names: Vec<String> = caps[2]
                .split(',')
                .map(|c| c.trim().trim_matches('`').to_string())
                .collect();
            for name in &names {
                column_index(table, name)?;
            }

            let mut inserted = Vec::new();
            for values in parse_tuples(&caps[3])? {
                if values.len() != names.len() {
                    return Err("Column count doesn't match value count".to_string());
                }
                let mut row = Row::new();
                for column in &table.columns {
                    let value = names
                        .iter()
                        .position(|n| *n == column.name)
                        .map(|i| values[i].clone())
                        .unwrap_or(SqlValue::Null);
                    row.insert(column.name.clone(), value);
                }
                inserted.push(row);
            }
            table.rows.extend(inserted);
            return Ok(Vec::new());
        }

        Err(format!("unsupported statement: {}", sql))
    }
}

#[async_trait]
impl Executor for FakeDatabase {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.run(sql).map_err(Error::DatabaseError)
    }

    async fn introspect_tables(&self) -> Result<Vec<String>> {
        let mut names = self.table_names();
        names.sort();
        Ok(names)
    }

    async fn introspect_columns(&self, table: &str) -> Result<Vec<LiveColumn>> {
        let state = self.state.lock().unwrap();
        let Some(table) = state.tables.get(table) else {
            return Ok(Vec::new());
        };

        Ok(table
            .columns
            .iter()
            .map(|c| {
                let mut live = LiveColumn::new(&c.name, &c.data_type)
                    .nullable(c.nullable)
                    .enum_values(c.enum_values.clone());
                live.default = c.default.clone();
                live
            })
            .collect())
    }

    async fn introspect_unique_index(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Option<String>> {
        Ok(self.column(table, column).and_then(|c| c.unique_index))
    }

    async fn introspect_primary_key(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.column(table, column).map_or(false, |c| c.primary))
    }
}

fn table_mut<'a>(
    tables: &'a mut IndexMap<String, FakeTable>,
    name: &str,
) -> std::result::Result<&'a mut FakeTable, String> {
    tables
        .get_mut(name)
        .ok_or_else(|| format!("Table '{}' doesn't exist", name))
}

fn column_index(table: &FakeTable, name: &str) -> std::result::Result<usize, String> {
    table
        .columns
        .iter()
        .position(|c| c.name == name)
        .ok_or_else(|| format!("Unknown column '{}'", name))
}

/// Interpret a column clause the way information_schema would report it
fn parse_clause(name: &str, clause: &str, previous: Option<&FakeColumn>) -> FakeColumn {
    let (native, rest) = split_type(clause);
    let data_type = match native
        .split('(')
        .next()
        .unwrap_or_default()
        .to_lowercase()
        .as_str()
    {
        "boolean" | "bool" => "tinyint".to_string(),
        "integer" => "int".to_string(),
        other => other.to_string(),
    };

    let default = DEFAULT.captures(rest).and_then(|caps| {
        let literal = caps.get(1)?.as_str();
        if literal == "NULL" {
            None
        } else {
            Some(unescape(&literal[1..literal.len() - 1]))
        }
    });
    let flags = DEFAULT.replace(rest, "");
    let primary = flags.contains("PRIMARY KEY");

    FakeColumn {
        name: name.to_string(),
        data_type,
        nullable: !flags.contains("NOT NULL") && !primary,
        default,
        // An existing index survives MODIFY and CHANGE under its old name
        unique_index: previous
            .and_then(|p| p.unique_index.clone())
            .or_else(|| flags.contains("UNIQUE").then(|| name.to_string())),
        enum_values: TypeCatalog::enum_values(native),
        primary: primary || previous.map_or(false, |p| p.primary),
    }
}

/// Split `ENUM('a', 'b') NOT NULL` into the type and the rest
fn split_type(clause: &str) -> (&str, &str) {
    let mut depth = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in clause.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ' ' if !quoted && depth == 0 => return (&clause[..i], &clause[i + 1..]),
            _ => {}
        }
    }

    (clause, "")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('Z') => out.push('\x1a'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}

/// Parse `(1, 'a'), (2, NULL)` into value tuples
fn parse_tuples(text: &str) -> std::result::Result<Vec<Vec<SqlValue>>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut tuples = Vec::new();

    let skip_ws = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].is_whitespace() {
            *pos += 1;
        }
    };

    loop {
        skip_ws(&mut pos);
        if pos >= chars.len() {
            break;
        }
        if chars[pos] != '(' {
            return Err(format!("expected '(' at {}", pos));
        }
        pos += 1;

        let mut values = Vec::new();
        loop {
            skip_ws(&mut pos);
            if pos >= chars.len() {
                return Err("unterminated tuple".to_string());
            }

            if chars[pos] == 'X' && chars.get(pos + 1) == Some(&'\'') {
                pos += 2;
                let start = pos;
                while pos < chars.len() && chars[pos] != '\'' {
                    pos += 1;
                }
                let hex: String = chars[start..pos].iter().collect();
                pos += 1;
                let bytes = (0..hex.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                    .collect::<std::result::Result<Vec<u8>, _>>()
                    .map_err(|e| format!("bad hex literal '{}': {}", hex, e))?;
                values.push(SqlValue::Bytes(bytes));
            } else if chars[pos] == '\'' {
                pos += 1;
                let mut raw = String::new();
                while pos < chars.len() && chars[pos] != '\'' {
                    if chars[pos] == '\\' && pos + 1 < chars.len() {
                        raw.push(chars[pos]);
                        pos += 1;
                    }
                    raw.push(chars[pos]);
                    pos += 1;
                }
                pos += 1;
                values.push(SqlValue::Text(unescape(&raw)));
            } else {
                let start = pos;
                while pos < chars.len() && chars[pos] != ',' && chars[pos] != ')' {
                    pos += 1;
                }
                let token: String = chars[start..pos].iter().collect();
                let token = token.trim();
                let value = if token == "NULL" {
                    SqlValue::Null
                } else if let Ok(i) = token.parse::<i64>() {
                    SqlValue::Int(i)
                } else if let Ok(f) = token.parse::<f64>() {
                    SqlValue::Float(f)
                } else {
                    return Err(format!("bad literal '{}'", token));
                };
                values.push(value);
            }

            skip_ws(&mut pos);
            match chars.get(pos) {
                Some(',') => pos += 1,
                Some(')') => {
                    pos += 1;
                    break;
                }
                _ => return Err("expected ',' or ')'".to_string()),
            }
        }
        tuples.push(values);

        skip_ws(&mut pos);
        if chars.get(pos) == Some(&',') {
            pos += 1;
        }
    }

    Ok(tuples)
}
