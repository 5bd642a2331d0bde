//! Synchronization pass and orphan table recovery

pub mod backup;
pub mod orchestrator;
pub mod orphans;
pub mod prompt;

pub use backup::{BackupRecord, BackupState, BackupStore, FsBackupStore};
pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncReport, SyncState};
pub use orphans::{DroppedOrphan, OrphanTableManager, RestoreOutcome};
pub use prompt::{ConsolePrompt, DecisionProvider, ScriptedDecisions, StaticDecision};
