//! Database module for table_sync
//!
//! This module handles the MySQL connection and the execution capability the
//! synchronization core runs against.

pub mod connection;
pub mod executor;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::Executor;
