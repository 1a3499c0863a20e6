//! Database module for SchemaCompare
//!
//! This module handles database connections and the live schema providers.

pub mod connection;
pub mod mysql;
pub mod postgres;

// Re-export key types
pub use connection::DatabaseConnection;
pub use mysql::MySqlProvider;
pub use postgres::PostgresProvider;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::schema::provider::SchemaProvider;
use crate::schema::snapshot::SnapshotProvider;

/// Build the provider for one configured side.
///
/// The `snapshot` driver reads a snapshot file from `url`; every other driver
/// opens a connection pool.
pub async fn connect_provider(config: &DatabaseConfig) -> Result<Box<dyn SchemaProvider>> {
    if config.kind()?.is_none() {
        return Ok(Box::new(SnapshotProvider::from_file(&config.url)?));
    }

    let connection = DatabaseConnection::connect(config).await?;
    connection.into_provider(config.schema.clone()).await
}
