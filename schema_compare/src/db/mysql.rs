//! MySQL schema provider
//!
//! Structure comes from `information_schema`; table and routine text comes
//! from the matching `SHOW CREATE` statement.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{mysql::MySqlRow, FromRow, MySqlPool, Row};

use crate::error::{Error, Result};
use crate::schema::generator::ScriptGenerator;
use crate::schema::provider::{DatabaseKind, SchemaProvider};
use crate::schema::types::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition, RoutineDefinition,
    RoutineKind, TriggerDefinition, ViewDefinition,
};
use crate::utils::naming::{quote_ident, split_column_list};

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    column_default: Option<String>,
    character_maximum_length: Option<i64>,
    extra: Option<String>,
}

#[derive(FromRow)]
struct PrimaryKeyRow {
    constraint_name: String,
    column_names: String,
}

#[derive(FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_names: String,
    ref_table: String,
    ref_columns: String,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    column_name: Option<String>,
    non_unique: i64,
    index_type: String,
}

#[derive(FromRow)]
struct RoutineRow {
    name: String,
    arguments: String,
}

#[derive(FromRow)]
struct TriggerRow {
    name: String,
    table_name: String,
}

/// MySQL schema provider
pub struct MySqlProvider {
    pool: MySqlPool,
    schema: String,
    generator: ScriptGenerator,
}

impl MySqlProvider {
    /// Create a provider for `schema`, or the connection's default database
    pub async fn new(pool: MySqlPool, schema: Option<String>) -> Result<Self> {
        let schema = match schema {
            Some(schema) => schema,
            None => sqlx::query_scalar::<_, Option<String>>("SELECT DATABASE()")
                .fetch_one(&pool)
                .await?
                .ok_or_else(|| {
                    Error::ConfigError(
                        "No MySQL database selected; set `schema` or name one in the URL".to_string(),
                    )
                })?,
        };

        Ok(Self {
            pool,
            schema,
            generator: ScriptGenerator::new(DatabaseKind::MySql),
        })
    }

    fn qualified(&self, name: &str) -> String {
        format!(
            "{}.{}",
            quote_ident(DatabaseKind::MySql, &self.schema),
            quote_ident(DatabaseKind::MySql, name)
        )
    }

    /// Run a `SHOW CREATE <object>` and read the statement text at `column`
    async fn show_create(&self, object: &str, name: &str, column: usize) -> Result<Option<String>> {
        let sql = format!("SHOW CREATE {} {}", object, self.qualified(name));
        let row: Option<MySqlRow> = sqlx::query(&sql).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(row.try_get::<Option<String>, _>(column)?),
            None => Ok(None),
        }
    }
}

/// Whether `information_schema.columns.extra` marks a generated column.
///
/// MySQL 8 also reports `DEFAULT_GENERATED` for expression defaults such as
/// `DEFAULT CURRENT_TIMESTAMP`; those are ordinary columns.
fn is_generated_column(extra: &str) -> bool {
    let extra = extra.to_uppercase();
    extra.contains("VIRTUAL GENERATED") || extra.contains("STORED GENERATED")
}

#[async_trait]
impl SchemaProvider for MySqlProvider {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::MySql
    }

    fn schema_name(&self) -> Option<&str> {
        Some(self.schema.as_str())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = ?
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        Ok(sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(column_type AS CHAR) AS data_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_default AS CHAR) AS column_default,
                CAST(character_maximum_length AS SIGNED) AS character_maximum_length,
                CAST(extra AS CHAR) AS extra
            FROM information_schema.columns
            WHERE table_schema = ? AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let extra = row.extra.unwrap_or_default();
                ColumnDefinition {
                    name: row.column_name,
                    data_type: row.data_type,
                    nullable: row.is_nullable == "YES",
                    max_length: row.character_maximum_length,
                    default: row.column_default,
                    is_computed: is_generated_column(&extra),
                    is_identity: extra.to_lowercase().contains("auto_increment"),
                }
            })
            .collect())
    }

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDefinition>> {
        let sql = r#"
            SELECT
                CAST(constraint_name AS CHAR) AS constraint_name,
                CAST(GROUP_CONCAT(column_name ORDER BY ordinal_position SEPARATOR ',') AS CHAR) AS column_names
            FROM information_schema.key_column_usage
            WHERE table_schema = ? AND table_name = ? AND constraint_name = 'PRIMARY'
            GROUP BY constraint_name
        "#;

        let rows = sqlx::query_as::<_, PrimaryKeyRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PrimaryKeyDefinition {
                name: row.constraint_name,
                columns: split_column_list(&row.column_names),
                create_script: None,
            })
            .collect())
    }

    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDefinition>> {
        let sql = r#"
            SELECT
                CAST(constraint_name AS CHAR) AS constraint_name,
                CAST(GROUP_CONCAT(column_name ORDER BY ordinal_position SEPARATOR ',') AS CHAR) AS column_names,
                CAST(referenced_table_name AS CHAR) AS ref_table,
                CAST(GROUP_CONCAT(referenced_column_name ORDER BY ordinal_position SEPARATOR ',') AS CHAR) AS ref_columns
            FROM information_schema.key_column_usage
            WHERE table_schema = ? AND table_name = ? AND referenced_table_name IS NOT NULL
            GROUP BY constraint_name, referenced_table_name
            ORDER BY constraint_name
        "#;

        let rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ForeignKeyDefinition {
                name: row.constraint_name,
                column: row.column_names,
                referenced_table: row.ref_table,
                referenced_column: row.ref_columns,
            })
            .collect())
    }

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>> {
        let sql = r#"
            SELECT
                CAST(index_name AS CHAR) AS index_name,
                CAST(column_name AS CHAR) AS column_name,
                CAST(non_unique AS SIGNED) AS non_unique,
                CAST(index_type AS CHAR) AS index_type
            FROM information_schema.statistics
            WHERE table_schema = ? AND table_name = ? AND index_name <> 'PRIMARY'
            ORDER BY index_name, seq_in_index
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        let mut indexes: IndexMap<String, IndexDefinition> = IndexMap::new();
        for row in rows {
            let index = indexes
                .entry(row.index_name.clone())
                .or_insert_with(|| IndexDefinition {
                    name: row.index_name,
                    columns: Vec::new(),
                    is_unique: row.non_unique == 0,
                    index_type: Some(row.index_type),
                });
            // Functional key parts have no column name
            if let Some(column) = row.column_name {
                index.columns.push(column);
            }
        }

        Ok(indexes.into_values().collect())
    }

    async fn get_create_table_script(&self, table: &str) -> Result<String> {
        self.show_create("TABLE", table, 1)
            .await?
            .ok_or_else(|| Error::not_found("Table", table))
    }

    async fn get_primary_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let primary_keys = self.get_primary_keys(table).await?;
        Ok(self.generator.primary_key_script(table, &primary_keys, name))
    }

    async fn get_foreign_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let foreign_keys = self.get_foreign_keys(table).await?;
        Ok(self.generator.foreign_key_script(table, &foreign_keys, name))
    }

    async fn get_index_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let indexes = self.get_indexes(table).await?;
        Ok(self.generator.index_script(table, &indexes, name))
    }

    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<RoutineDefinition>> {
        let sql = r#"
            SELECT
                CAST(r.routine_name AS CHAR) AS name,
                CAST(COALESCE((
                    SELECT GROUP_CONCAT(p.dtd_identifier ORDER BY p.ordinal_position SEPARATOR ', ')
                    FROM information_schema.parameters p
                    WHERE p.specific_schema = r.routine_schema
                      AND p.specific_name = r.specific_name
                      AND p.ordinal_position > 0
                ), '') AS CHAR) AS arguments
            FROM information_schema.routines r
            WHERE r.routine_schema = ? AND r.routine_type = ?
            ORDER BY r.routine_name
        "#;

        let rows = sqlx::query_as::<_, RoutineRow>(sql)
            .bind(&self.schema)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| RoutineDefinition::new(&row.name, &row.arguments))
            .collect())
    }

    async fn get_routine_definition(&self, kind: RoutineKind, routine: &RoutineDefinition) -> Result<String> {
        // The text column is NULL when the user lacks privileges on the routine
        self.show_create(kind.as_str(), &routine.name, 2)
            .await?
            .ok_or_else(|| {
                Error::ProviderError(format!(
                    "Definition of {} {} could not be read",
                    kind,
                    routine.signature()
                ))
            })
    }

    async fn list_views(&self) -> Result<Vec<ViewDefinition>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS name
            FROM information_schema.views
            WHERE table_schema = ?
            ORDER BY table_name
        "#;

        let names = sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(names
            .into_iter()
            .map(|name| ViewDefinition {
                name,
                definition: None,
            })
            .collect())
    }

    async fn get_view_definition(&self, name: &str) -> Result<Option<String>> {
        self.show_create("VIEW", name, 1).await
    }

    async fn list_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        let sql = r#"
            SELECT
                CAST(trigger_name AS CHAR) AS name,
                CAST(event_object_table AS CHAR) AS table_name
            FROM information_schema.triggers
            WHERE trigger_schema = ?
            ORDER BY trigger_name
        "#;

        let rows = sqlx::query_as::<_, TriggerRow>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| TriggerDefinition {
                name: row.name,
                table: row.table_name,
                definition: None,
            })
            .collect())
    }

    async fn get_trigger_definition(&self, name: &str) -> Result<Option<String>> {
        self.show_create("TRIGGER", name, 2).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("VIRTUAL GENERATED", true)]
    #[case("STORED GENERATED", true)]
    #[case("DEFAULT_GENERATED", false)]
    #[case("DEFAULT_GENERATED on update CURRENT_TIMESTAMP", false)]
    #[case("auto_increment", false)]
    #[case("", false)]
    fn test_is_generated_column(#[case] extra: &str, #[case] expected: bool) {
        assert_eq!(is_generated_column(extra), expected);
    }
}
