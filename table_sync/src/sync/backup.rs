//! Backup artifacts for dropped orphan tables
//!
//! Each artifact is a file named `backup_<table>_<epoch-millis>.sql` holding
//! either nothing (the table had no rows) or one multi-row INSERT statement.
//! Artifacts the operator chose to keep are renamed with an `.ignored` suffix
//! and are never offered again.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const BACKUP_PREFIX: &str = "backup_";
pub const BACKUP_EXTENSION: &str = ".sql";
pub const IGNORED_SUFFIX: &str = ".ignored";

/// Disposition of a backup artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    /// Freshly written, will be offered when the table reappears
    Pending,
    /// Kept on disk but never offered again
    Ignored,
}

/// A backup artifact of one dropped table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub table: String,
    pub timestamp_millis: i64,
    pub path: PathBuf,
    pub state: BackupState,
}

impl BackupRecord {
    /// File name of a pending artifact
    pub fn file_name(table: &str, timestamp_millis: i64) -> String {
        format!(
            "{}{}_{}{}",
            BACKUP_PREFIX, table, timestamp_millis, BACKUP_EXTENSION
        )
    }

    /// Parse a pending artifact file name for `table`. The timestamp part must be
    /// all digits, so `users` never matches another table's artifacts.
    pub fn parse_file_name(table: &str, file_name: &str) -> Option<i64> {
        let rest = file_name
            .strip_prefix(BACKUP_PREFIX)?
            .strip_prefix(table)?
            .strip_prefix('_')?
            .strip_suffix(BACKUP_EXTENSION)?;

        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        rest.parse().ok()
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Storage for backup artifacts
pub trait BackupStore: Send + Sync {
    /// Persist a new pending artifact for `table`
    fn write(&self, table: &str, contents: &str) -> Result<BackupRecord>;

    /// Read an artifact's statement text
    fn read(&self, record: &BackupRecord) -> Result<String>;

    /// Rename an artifact so it is never offered again
    fn mark_ignored(&self, record: &BackupRecord) -> Result<BackupRecord>;

    /// Remove an artifact
    fn delete(&self, record: &BackupRecord) -> Result<()>;

    /// Pending artifacts for `table`, newest first
    fn list(&self, table: &str) -> Result<Vec<BackupRecord>>;
}

/// Backup artifacts stored as files in one directory
#[derive(Debug, Clone)]
pub struct FsBackupStore {
    directory: PathBuf,
}

impl FsBackupStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl BackupStore for FsBackupStore {
    fn write(&self, table: &str, contents: &str) -> Result<BackupRecord> {
        fs::create_dir_all(&self.directory)?;

        let mut timestamp_millis = Utc::now().timestamp_millis();
        let mut path = self
            .directory
            .join(BackupRecord::file_name(table, timestamp_millis));
        while path.exists() {
            timestamp_millis += 1;
            path = self
                .directory
                .join(BackupRecord::file_name(table, timestamp_millis));
        }

        fs::write(&path, contents)?;
        tracing::info!(table, path = %path.display(), bytes = contents.len(), "Wrote backup");

        Ok(BackupRecord {
            table: table.to_string(),
            timestamp_millis,
            path,
            state: BackupState::Pending,
        })
    }

    fn read(&self, record: &BackupRecord) -> Result<String> {
        Ok(fs::read_to_string(&record.path)?)
    }

    fn mark_ignored(&self, record: &BackupRecord) -> Result<BackupRecord> {
        let mut ignored = record.path.clone().into_os_string();
        ignored.push(IGNORED_SUFFIX);
        let ignored = PathBuf::from(ignored);

        fs::rename(&record.path, &ignored)?;
        tracing::info!(table = %record.table, path = %ignored.display(), "Backup marked as ignored");

        Ok(BackupRecord {
            path: ignored,
            state: BackupState::Ignored,
            ..record.clone()
        })
    }

    fn delete(&self, record: &BackupRecord) -> Result<()> {
        fs::remove_file(&record.path)?;
        tracing::info!(table = %record.table, path = %record.path.display(), "Backup deleted");
        Ok(())
    }

    fn list(&self, table: &str) -> Result<Vec<BackupRecord>> {
        let pattern = self.directory.join(format!(
            "{}{}_*{}",
            BACKUP_PREFIX,
            glob::Pattern::escape(table),
            BACKUP_EXTENSION
        ));
        let pattern = pattern.to_string_lossy();

        let mut records = Vec::new();
        let paths = glob::glob(&pattern)
            .map_err(|e| Error::ConfigError(format!("Invalid backup pattern: {}", e)))?;

        for path in paths {
            let path = path.map_err(|e| Error::IoError(e.into_error()))?;
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(timestamp_millis) = BackupRecord::parse_file_name(table, file_name) {
                records.push(BackupRecord {
                    table: table.to_string(),
                    timestamp_millis,
                    path: path.clone(),
                    state: BackupState::Pending,
                });
            }
        }

        // Fixed-width epoch millis sort correctly as text.
        records.sort_by(|a, b| b.display_name().cmp(&a.display_name()));
        Ok(records)
    }
}
