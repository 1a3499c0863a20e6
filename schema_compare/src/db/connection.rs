//! Database connection handling
//!
//! This module opens the connection pool for one side of a comparison.

use sqlx::{mysql::MySqlPoolOptions, postgres::PgPoolOptions, MySql, Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::mysql::MySqlProvider;
use crate::db::postgres::PostgresProvider;
use crate::error::{Error, Result};
use crate::schema::provider::{DatabaseKind, SchemaProvider};

/// Enumeration of supported database pools
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(5);
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        let kind = config.kind()?.ok_or_else(|| {
            Error::DatabaseError(format!("Driver {} has no live connection", config.driver))
        })?;

        info!(driver = %kind, target = %config.label(), "Connecting");

        match kind {
            DatabaseKind::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Postgres(pool))
            }
            DatabaseKind::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::MySql(pool))
            }
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            DatabaseConnection::Postgres(_) => DatabaseKind::Postgres,
            DatabaseConnection::MySql(_) => DatabaseKind::MySql,
        }
    }

    /// Wrap the pool in the provider for its dialect
    pub async fn into_provider(self, schema: Option<String>) -> Result<Box<dyn SchemaProvider>> {
        match self {
            DatabaseConnection::Postgres(pool) => Ok(Box::new(PostgresProvider::new(pool, schema))),
            DatabaseConnection::MySql(pool) => Ok(Box::new(MySqlProvider::new(pool, schema).await?)),
        }
    }
}
