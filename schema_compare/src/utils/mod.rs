//! Utilities for SchemaCompare
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{match_key, quote_column_list, quote_ident};
