//! Utilities for table_sync
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

pub use logging::init_logging;
pub use naming::{get_table_name, validate_identifier, validate_table_name};
