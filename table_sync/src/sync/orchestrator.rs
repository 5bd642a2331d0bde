//! Synchronization pass
//!
//! One pass walks `Init -> Resolved -> TablesEnsured -> OrphansHandled ->
//! PerTableSync(i) -> Done`. A failure moves to a terminal error state and
//! aborts the rest of the pass. Nothing already applied is rolled back.
//! Failures reading the table list carry an empty table name.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::db::executor::{execute_batch, Executor};
use crate::error::{Error, Result};
use crate::models::registry::SchemaRegistry;
use crate::schema::analyzer::SchemaAnalyzer;
use crate::schema::compiler::ColumnCompiler;
use crate::schema::dependency::DependencyGraph;
use crate::schema::diff::{ColumnPlan, SchemaDiffEngine};
use crate::schema::generator::DdlGenerator;
use crate::schema::types::TableSchema;
use crate::sync::backup::BackupStore;
use crate::sync::orphans::{DroppedOrphan, OrphanTableManager, RestoreOutcome};
use crate::sync::prompt::DecisionProvider;

/// Options of one synchronization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Apply column drops instead of only reporting them
    pub dangerous_sync: bool,
}

/// Where a pass currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Init,
    Resolved,
    TablesEnsured,
    OrphansHandled,
    PerTableSync(usize),
    Done,
    CycleError,
    CreateError(String),
    DiffApplyError { table: String, operation: String },
}

impl SyncState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncState::Done
                | SyncState::CycleError
                | SyncState::CreateError(_)
                | SyncState::DiffApplyError { .. }
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Init => write!(f, "init"),
            SyncState::Resolved => write!(f, "resolved"),
            SyncState::TablesEnsured => write!(f, "tables-ensured"),
            SyncState::OrphansHandled => write!(f, "orphans-handled"),
            SyncState::PerTableSync(i) => write!(f, "per-table-sync({})", i),
            SyncState::Done => write!(f, "done"),
            SyncState::CycleError => write!(f, "cycle-error"),
            SyncState::CreateError(table) => write!(f, "create-error({})", table),
            SyncState::DiffApplyError { table, operation } => {
                write!(f, "diff-apply-error({}, {})", table, operation)
            }
        }
    }
}

/// Summary of a completed pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Declared tables in creation order
    pub order: Vec<String>,
    /// Declared tables that did not exist before the pass
    pub created_tables: Vec<String>,
    pub dropped_orphans: Vec<DroppedOrphan>,
    pub restores: Vec<(String, RestoreOutcome)>,
    pub plans: Vec<ColumnPlan>,
}

impl SyncReport {
    /// Number of column operations applied across all tables
    pub fn applied_operations(&self) -> usize {
        self.plans
            .iter()
            .map(|p| p.renames.len() + p.adds.len() + p.modifies.len() + p.drops.len())
            .sum()
    }

    /// Column drops that were detected but not applied
    pub fn suppressed_drops(&self) -> Vec<String> {
        self.plans
            .iter()
            .flat_map(|p| p.suppressed_drops.iter().map(move |c| format!("{}.{}", p.table, c)))
            .collect()
    }
}

/// Drives a synchronization pass against one executor
pub struct SyncOrchestrator<'a> {
    executor: &'a dyn Executor,
    store: &'a dyn BackupStore,
    decisions: &'a dyn DecisionProvider,
    state: SyncState,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        store: &'a dyn BackupStore,
        decisions: &'a dyn DecisionProvider,
    ) -> Self {
        Self {
            executor,
            store,
            decisions,
            state: SyncState::Init,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    fn transition(&mut self, next: SyncState) {
        tracing::debug!(from = %self.state, to = %next, "Sync state transition");
        self.state = next;
    }

    /// Pass `result` through, moving to `DiffApplyError` when it failed
    fn check<T>(&mut self, table: &str, operation: &str, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.transition(SyncState::DiffApplyError {
                table: table.to_string(),
                operation: operation.to_string(),
            });
        }
        result
    }

    /// Run one synchronization pass over every registered schema
    pub async fn sync(
        &mut self,
        registry: &SchemaRegistry,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        self.transition(SyncState::Init);

        let schemas = registry.snapshot();
        let compiler = ColumnCompiler::new(registry.catalog());
        let generator = DdlGenerator::new(compiler);
        let analyzer = SchemaAnalyzer::new(self.executor);

        let order = match DependencyGraph::build(schemas.as_slice()).order() {
            Ok(order) => order,
            Err(e) => {
                self.transition(SyncState::CycleError);
                return Err(e);
            }
        };
        tracing::info!(tables = ?order, "Resolved table order");
        self.transition(SyncState::Resolved);

        let by_name: HashMap<&str, &Arc<TableSchema>> =
            schemas.iter().map(|s| (s.name(), s)).collect();
        let mut report = SyncReport {
            order: order.clone(),
            ..SyncReport::default()
        };

        // Tables
        let existing = analyzer.tables().await;
        let existing: HashSet<String> = self
            .check("", "introspect", existing)?
            .into_iter()
            .collect();
        for table in &order {
            let Some(schema) = by_name.get(table.as_str()) else {
                continue;
            };
            let sql = match generator.create_table_sql(schema) {
                Ok(sql) => sql,
                Err(e) => {
                    self.transition(SyncState::CreateError(table.clone()));
                    return Err(e);
                }
            };
            tracing::debug!(table = %table, sql = %sql, "Ensuring table");

            if let Err(e) = self.executor.execute(&sql).await {
                self.transition(SyncState::CreateError(table.clone()));
                return Err(Error::CreateTable {
                    table: table.clone(),
                    message: e.to_string(),
                });
            }

            if !existing.contains(table) {
                tracing::info!(table = %table, "Created table");
                report.created_tables.push(table.clone());
            }
        }
        self.transition(SyncState::TablesEnsured);

        // Orphans
        let orphans = OrphanTableManager::new(self.executor, self.store, self.decisions);
        let live = analyzer.tables().await;
        let live = self.check("", "introspect", live)?;
        for table in OrphanTableManager::find_orphans(&live, &order) {
            match orphans.backup_and_drop(&table).await {
                Ok(dropped) => report.dropped_orphans.push(dropped),
                Err(e) => {
                    self.transition(SyncState::DiffApplyError {
                        table: table.clone(),
                        operation: "drop table".to_string(),
                    });
                    return Err(e);
                }
            }
        }
        self.transition(SyncState::OrphansHandled);

        // Columns
        let engine = SchemaDiffEngine::new(compiler);
        for (index, table) in order.iter().enumerate() {
            self.transition(SyncState::PerTableSync(index));
            let Some(schema) = by_name.get(table.as_str()) else {
                continue;
            };

            let outcome = orphans.offer_restore(table).await;
            let outcome = self.check(table, "restore", outcome)?;
            if outcome != RestoreOutcome::NoBackup {
                report.restores.push((table.clone(), outcome));
            }

            let live_columns = analyzer.live_columns(table).await;
            let live_columns = self.check(table, "introspect", live_columns)?;
            let plan = engine.diff(schema, &live_columns, options.dangerous_sync);
            let plan = self.check(table, "diff", plan)?;
            log_plan(&plan);

            self.apply_plan(&generator, schema, &plan).await?;
            report.plans.push(plan);
        }

        self.transition(SyncState::Done);
        tracing::info!(
            created = report.created_tables.len(),
            dropped = report.dropped_orphans.len(),
            operations = report.applied_operations(),
            "Synchronization complete"
        );

        Ok(report)
    }

    async fn apply_plan(
        &mut self,
        generator: &DdlGenerator<'_>,
        schema: &TableSchema,
        plan: &ColumnPlan,
    ) -> Result<()> {
        let table = schema.name();

        for rename in &plan.renames {
            let Some(desc) = schema.field(&rename.to) else {
                continue;
            };
            let statements = generator.rename_column_sql(table, rename, desc);
            let statements = self.check(table, "rename", statements)?;
            self.apply(table, &rename.to, "rename", &statements).await?;
        }

        for column in &plan.adds {
            let Some(desc) = schema.field(column) else {
                continue;
            };
            let statements = generator.add_column_sql(table, column, desc);
            let statements = self.check(table, "add", statements)?;
            self.apply(table, column, "add", &statements).await?;
        }

        for change in &plan.modifies {
            let Some(desc) = schema.field(&change.column_name) else {
                continue;
            };
            let statements = generator.modify_column_sql(table, &change.from, desc);
            let statements = self.check(table, "modify", statements)?;
            self.apply(table, &change.column_name, "modify", &statements)
                .await?;
        }

        for column in &plan.drops {
            let statements = vec![generator.drop_column_sql(table, column)];
            self.apply(table, column, "drop", &statements).await?;
        }

        Ok(())
    }

    async fn apply(
        &mut self,
        table: &str,
        column: &str,
        operation: &str,
        statements: &[String],
    ) -> Result<()> {
        if let Err(e) = execute_batch(self.executor, statements).await {
            self.transition(SyncState::DiffApplyError {
                table: table.to_string(),
                operation: operation.to_string(),
            });
            return Err(Error::DdlApply {
                table: table.to_string(),
                column: column.to_string(),
                operation: operation.to_string(),
                message: e.to_string(),
            });
        }

        tracing::info!(table, column, operation, "Applied column change");
        Ok(())
    }
}

fn log_plan(plan: &ColumnPlan) {
    for lint in &plan.lints {
        tracing::warn!(table = %plan.table, "{}", lint);
    }

    for column in &plan.suppressed_drops {
        tracing::warn!(
            table = %plan.table,
            column = %column,
            "Column is no longer declared; enable dangerous sync to drop it"
        );
    }

    for change in &plan.modifies {
        let reasons: Vec<String> = change.reasons.iter().map(|r| r.to_string()).collect();
        tracing::debug!(
            table = %plan.table,
            column = %change.column_name,
            reasons = %reasons.join("; "),
            "Column differs from declaration"
        );
    }
}
