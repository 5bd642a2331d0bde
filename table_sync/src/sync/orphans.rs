//! Orphan table handling
//!
//! An orphan is a live table with no declared schema. Orphans are dumped to a
//! backup artifact and dropped. When a table of the same name is declared
//! again, the newest pending artifact is offered for replay.

use crate::db::executor::Executor;
use crate::error::{Error, Result};
use crate::schema::generator::{drop_table_sql, insert_rows_sql, select_all_sql};
use crate::sync::backup::{BackupRecord, BackupStore};
use crate::sync::prompt::DecisionProvider;

/// Result of dropping one orphan table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedOrphan {
    pub table: String,
    pub rows: usize,
    /// `None` when the backup could not be written
    pub backup: Option<BackupRecord>,
}

/// What happened when a backup was offered for a declared table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No pending artifact exists for the table
    NoBackup,
    /// The operator answered both questions
    Resolved {
        record: BackupRecord,
        restored: bool,
        deleted: bool,
    },
    /// Replaying the artifact failed; the artifact was left as is
    ReplayFailed { record: BackupRecord, message: String },
}

/// Finds, backs up, drops and restores orphan tables
pub struct OrphanTableManager<'a> {
    executor: &'a dyn Executor,
    store: &'a dyn BackupStore,
    decisions: &'a dyn DecisionProvider,
}

impl<'a> OrphanTableManager<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        store: &'a dyn BackupStore,
        decisions: &'a dyn DecisionProvider,
    ) -> Self {
        Self {
            executor,
            store,
            decisions,
        }
    }

    /// Live tables without a declaration, in live order
    pub fn find_orphans<S: AsRef<str>>(live: &[String], declared: &[S]) -> Vec<String> {
        live.iter()
            .filter(|table| !declared.iter().any(|d| d.as_ref() == table.as_str()))
            .cloned()
            .collect()
    }

    /// Dump the table's rows to a backup artifact, then drop the table
    pub async fn backup_and_drop(&self, table: &str) -> Result<DroppedOrphan> {
        let rows = self.executor.execute(&select_all_sql(table)).await?;
        let contents = insert_rows_sql(table, &rows, |value| self.executor.escape_literal(value))
            .unwrap_or_default();

        let backup = match self.store.write(table, &contents) {
            Ok(record) => Some(record),
            Err(e) => {
                let error = Error::BackupWrite {
                    table: table.to_string(),
                    message: e.to_string(),
                };
                tracing::warn!(table, error = %error, "Dropping orphan table without a backup");
                None
            }
        };

        self.executor
            .execute(&drop_table_sql(table))
            .await
            .map_err(|e| Error::DropTable {
                table: table.to_string(),
                message: e.to_string(),
            })?;

        tracing::info!(table, rows = rows.len(), "Dropped orphan table");

        Ok(DroppedOrphan {
            table: table.to_string(),
            rows: rows.len(),
            backup,
        })
    }

    /// Offer the newest pending backup of a declared table
    pub async fn offer_restore(&self, table: &str) -> Result<RestoreOutcome> {
        let Some(record) = self.store.list(table)?.into_iter().next() else {
            return Ok(RestoreOutcome::NoBackup);
        };

        let contents = self.store.read(&record)?;
        let name = record.display_name();
        let mut restored = false;

        if contents.trim().is_empty() {
            tracing::info!(table, backup = %name, "Backup holds no rows, nothing to restore");
        } else if self
            .decisions
            .ask(&format!(
                "Found backup {} for table '{}'. Restore it?",
                name, table
            ))
            .await?
        {
            if let Err(e) = self.executor.execute(&contents).await {
                let error = Error::RestoreReplay {
                    table: table.to_string(),
                    path: record.path.display().to_string(),
                    message: e.to_string(),
                };
                tracing::error!(table, error = %error, "Backup left in place for a manual retry");
                return Ok(RestoreOutcome::ReplayFailed {
                    record,
                    message: e.to_string(),
                });
            }

            tracing::info!(table, backup = %name, "Restored backup");
            restored = true;
        }

        let deleted = self
            .decisions
            .ask(&format!(
                "Delete backup {}? Answering no keeps it as {}{}",
                name,
                name,
                crate::sync::backup::IGNORED_SUFFIX
            ))
            .await?;

        let record = if deleted {
            self.store.delete(&record)?;
            record
        } else {
            self.store.mark_ignored(&record)?
        };

        Ok(RestoreOutcome::Resolved {
            record,
            restored,
            deleted,
        })
    }
}
