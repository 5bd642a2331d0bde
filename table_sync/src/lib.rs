//! table_sync: a lightweight ORM core that keeps a MySQL schema in sync with declared tables
//!
//! Tables are declared from Rust structs (`#[derive(Model)]`) or YAML schema
//! files. A synchronization pass creates missing tables in foreign-key order,
//! backs up and drops tables nobody declares anymore, offers to restore those
//! backups when a table comes back, and converges every column through
//! rename, add, modify and (opt-in) drop operations.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod sync;
pub mod utils;

use indexmap::IndexMap;
use std::sync::Arc;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::executor::Executor;
pub use error::{Error, Result};
pub use models::registry::{Model, SchemaRegistry};
pub use schema::catalog::TypeCatalog;
pub use schema::types::{DefaultValue, FieldDescriptor, FieldType, ForeignKeyRef, SqlValue, TableSchema};
pub use sync::{
    ConsolePrompt, DecisionProvider, FsBackupStore, ScriptedDecisions, StaticDecision,
    SyncOptions, SyncOrchestrator, SyncReport,
};
pub use table_sync_macros::Model;

/// Initialize table_sync with the specified configuration file
pub async fn init(config_path: &str) -> Result<TableSyncClient> {
    let config = config::load_from_file(config_path)?;
    TableSyncClient::new(config).await
}

/// The main client for interacting with table_sync
pub struct TableSyncClient {
    config: Config,
    connection: DatabaseConnection,
    registry: SchemaRegistry,
}

impl TableSyncClient {
    /// Create a new client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let catalog = TypeCatalog::from_config(&config.type_mapping)?;
        let connection = DatabaseConnection::connect(&config.database).await?;

        Ok(Self {
            config,
            connection,
            registry: SchemaRegistry::new(catalog),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Register a table declaration
    pub fn register_schema(
        &mut self,
        table: &str,
        fields: IndexMap<String, FieldDescriptor>,
    ) -> Result<Arc<TableSchema>> {
        self.registry.register_schema(table, fields)
    }

    /// Register the table a model declares
    pub fn register_model<M: Model>(&mut self) -> Result<Arc<TableSchema>> {
        self.registry.register_model::<M>()
    }

    /// Register every table of a YAML schema file
    pub fn register_schema_file(&mut self, path: &str) -> Result<()> {
        let declarations = models::loader::load_schema_file(path)?;
        models::loader::register_declarations(&mut self.registry, declarations)
    }

    /// Run one synchronization pass over every registered table
    pub async fn sync(
        &self,
        decisions: &dyn DecisionProvider,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        let store = FsBackupStore::new(&self.config.sync.backup_directory);
        let mut orchestrator = SyncOrchestrator::new(&self.connection, &store, decisions);

        orchestrator.sync(&self.registry, options).await
    }

    /// Options taken from the `[sync]` configuration section
    pub fn default_options(&self) -> SyncOptions {
        SyncOptions {
            dangerous_sync: self.config.sync.dangerous_sync,
        }
    }
}
