//! Schema provider contract
//!
//! A provider answers structural questions about one live or snapshotted
//! database. The comparison engine only ever talks to this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::schema::types::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition, RoutineDefinition,
    RoutineKind, TableDefinition, TriggerDefinition, ViewDefinition,
};

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Postgres,
    MySql,
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Postgres => write!(f, "postgres"),
            DatabaseKind::MySql => write!(f, "mysql"),
        }
    }
}

impl FromStr for DatabaseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DatabaseKind::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseKind::MySql),
            other => Err(Error::ConfigError(format!(
                "Unsupported database driver: {}",
                other
            ))),
        }
    }
}

/// Structural queries against one database
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Dialect of the database behind this provider
    fn kind(&self) -> DatabaseKind;

    /// Schema (or MySQL database) the provider reads from
    fn schema_name(&self) -> Option<&str>;

    async fn list_tables(&self) -> Result<Vec<String>>;

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>>;

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDefinition>>;

    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDefinition>>;

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>>;

    async fn get_create_table_script(&self, table: &str) -> Result<String>;

    /// Full definition of one table. The parts are fetched as one
    /// concurrent batch and awaited together.
    async fn get_table_definition(&self, table: &str) -> Result<TableDefinition> {
        let (columns, primary_keys, foreign_keys, indexes, create_script) = futures::try_join!(
            self.get_columns(table),
            self.get_primary_keys(table),
            self.get_foreign_keys(table),
            self.get_indexes(table),
            self.get_create_table_script(table),
        )?;

        Ok(TableDefinition {
            name: table.to_string(),
            columns,
            primary_keys,
            foreign_keys,
            indexes,
            create_script,
        })
    }

    /// Script that recreates the named primary key, `None` if it does not exist
    async fn get_primary_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>>;

    async fn get_foreign_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>>;

    async fn get_index_create_script(&self, table: &str, name: &str) -> Result<Option<String>>;

    /// Routines of one kind with their argument signatures; definitions are left empty.
    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<RoutineDefinition>>;

    /// Full definition text of a listed routine
    async fn get_routine_definition(&self, kind: RoutineKind, routine: &RoutineDefinition) -> Result<String>;

    async fn list_functions(&self) -> Result<Vec<RoutineDefinition>> {
        self.list_routines(RoutineKind::Function).await
    }

    async fn list_procedures(&self) -> Result<Vec<RoutineDefinition>> {
        self.list_routines(RoutineKind::Procedure).await
    }

    async fn list_views(&self) -> Result<Vec<ViewDefinition>>;

    async fn get_view_definition(&self, name: &str) -> Result<Option<String>>;

    async fn list_triggers(&self) -> Result<Vec<TriggerDefinition>>;

    async fn get_trigger_definition(&self, name: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("postgres", DatabaseKind::Postgres)]
    #[case("PostgreSQL", DatabaseKind::Postgres)]
    #[case("mysql", DatabaseKind::MySql)]
    #[case("mariadb", DatabaseKind::MySql)]
    fn test_parse_database_kind(#[case] input: &str, #[case] expected: DatabaseKind) {
        assert_eq!(input.parse::<DatabaseKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_database_kind() {
        assert!("sqlite".parse::<DatabaseKind>().is_err());
    }
}
