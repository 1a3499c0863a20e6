//! PostgreSQL schema provider
//!
//! Reads `information_schema` and `pg_catalog`. Postgres cannot render a
//! CREATE TABLE statement server-side, so the table script is synthesized
//! from the fetched definition. Key and index scripts are rendered the same
//! way, which keeps them free of the source schema's qualification.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{FromRow, PgPool};

use crate::error::{Error, Result};
use crate::schema::generator::ScriptGenerator;
use crate::schema::provider::{DatabaseKind, SchemaProvider};
use crate::schema::types::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition, RoutineDefinition,
    RoutineKind, TableDefinition, TriggerDefinition, ViewDefinition,
};
use crate::utils::naming::{split_column_list, unqualify_type};

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: bool,
    column_default: Option<String>,
    character_maximum_length: Option<i64>,
    is_identity: Option<bool>,
    is_generated: Option<bool>,
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
    column_name: String,
    is_unique: Option<bool>,
    index_method: String,
}

#[derive(FromRow)]
struct RoutineRow {
    name: String,
    arguments: String,
}

#[derive(FromRow)]
struct ViewRow {
    name: String,
    definition: Option<String>,
}

#[derive(FromRow)]
struct TriggerRow {
    name: String,
    table_name: String,
    definition: Option<String>,
}

/// PostgreSQL schema provider
pub struct PostgresProvider {
    pool: PgPool,
    schema: String,
    generator: ScriptGenerator,
}

impl PostgresProvider {
    /// Create a provider for `schema`, `public` when not given
    pub fn new(pool: PgPool, schema: Option<String>) -> Self {
        Self {
            pool,
            schema: schema.unwrap_or_else(|| "public".to_string()),
            generator: ScriptGenerator::new(DatabaseKind::Postgres),
        }
    }
}

fn prokind(kind: RoutineKind) -> &'static str {
    match kind {
        RoutineKind::Function => "f",
        RoutineKind::Procedure => "p",
    }
}

#[async_trait]
impl SchemaProvider for PostgresProvider {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgres
    }

    fn schema_name(&self) -> Option<&str> {
        Some(self.schema.as_str())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        Ok(sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        // format_type keeps precision, array dimensions and user-defined type names
        let sql = r#"
            SELECT
                a.attname::text AS column_name,
                format_type(a.atttypid, a.atttypmod) AS data_type,
                NOT (a.attnotnull OR (t.typtype = 'd'::"char" AND t.typnotnull)) AS is_nullable,
                CASE WHEN a.attgenerated = ''::"char" THEN pg_get_expr(d.adbin, d.adrelid) END AS column_default,
                information_schema._pg_char_max_length(coalesce(et.oid, t.oid), a.atttypmod)::bigint
                    AS character_maximum_length,
                (a.attidentity <> ''::"char") AS is_identity,
                (a.attgenerated <> ''::"char") AS is_generated
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN pg_type t ON t.oid = a.atttypid
            LEFT JOIN pg_type et ON et.oid = t.typelem AND et.typarray = t.oid
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped
            ORDER BY a.attnum
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ColumnDefinition {
                name: row.column_name,
                data_type: unqualify_type(&row.data_type, &self.schema),
                nullable: row.is_nullable,
                max_length: row.character_maximum_length,
                default: row.column_default,
                is_computed: row.is_generated.unwrap_or(false),
                is_identity: row.is_identity.unwrap_or(false),
            })
            .collect())
    }

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDefinition>> {
        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                string_agg(a.attname::text, ',' ORDER BY k.ord) AS column_names
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE con.contype = 'p' AND n.nspname = $1 AND t.relname = $2
            GROUP BY con.conname
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
        // One row per constraint; composite keys come back comma-joined
        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                string_agg(a.attname::text, ',' ORDER BY k.ord) AS column_names,
                rt.relname::text AS ref_table,
                string_agg(ra.attname::text, ',' ORDER BY k.ord) AS ref_columns
            FROM pg_constraint con
            JOIN pg_class t ON t.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_class rt ON rt.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, ord)
            JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
            JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum
            WHERE con.contype = 'f' AND n.nspname = $1 AND t.relname = $2
            GROUP BY con.conname, rt.relname
            ORDER BY con.conname
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
                i.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique,
                am.amname::text AS index_method
            FROM
                pg_index ix
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_am am ON am.oid = i.relam
            WHERE
                t.relname = $1
                AND n.nspname = $2
                AND NOT ix.indisprimary
            ORDER BY i.relname, array_position(ix.indkey::int2[], a.attnum)
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(table)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        let mut indexes: IndexMap<String, IndexDefinition> = IndexMap::new();
        for row in rows {
            indexes
                .entry(row.index_name.clone())
                .or_insert_with(|| IndexDefinition {
                    name: row.index_name,
                    columns: Vec::new(),
                    is_unique: row.is_unique.unwrap_or(false),
                    index_type: Some(row.index_method),
                })
                .columns
                .push(row.column_name);
        }

        Ok(indexes.into_values().collect())
    }

    async fn get_create_table_script(&self, table: &str) -> Result<String> {
        Ok(self.get_table_definition(table).await?.create_script)
    }

    async fn get_table_definition(&self, table: &str) -> Result<TableDefinition> {
        let (columns, primary_keys, foreign_keys, indexes) = futures::try_join!(
            self.get_columns(table),
            self.get_primary_keys(table),
            self.get_foreign_keys(table),
            self.get_indexes(table),
        )?;

        let mut definition = TableDefinition {
            name: table.to_string(),
            columns,
            primary_keys,
            foreign_keys,
            indexes,
            create_script: String::new(),
        };
        definition.create_script = self.generator.create_table_sql(&definition);

        Ok(definition)
    }

    async fn get_primary_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let keys = self.get_primary_keys(table).await?;
        Ok(self.generator.primary_key_script(table, &keys, name))
    }

    async fn get_foreign_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let keys = self.get_foreign_keys(table).await?;
        Ok(self.generator.foreign_key_script(table, &keys, name))
    }

    async fn get_index_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let indexes = self.get_indexes(table).await?;
        Ok(self.generator.index_script(table, &indexes, name))
    }

    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<RoutineDefinition>> {
        let sql = r#"
            SELECT
                p.proname::text AS name,
                pg_get_function_identity_arguments(p.oid) AS arguments
            FROM pg_proc p
            JOIN pg_namespace n ON n.oid = p.pronamespace
            WHERE n.nspname = $1 AND p.prokind::text = $2
            ORDER BY p.proname, arguments
        "#;

        let rows = sqlx::query_as::<_, RoutineRow>(sql)
            .bind(&self.schema)
            .bind(prokind(kind))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| RoutineDefinition::new(&row.name, &row.arguments))
            .collect())
    }

    async fn get_routine_definition(&self, kind: RoutineKind, routine: &RoutineDefinition) -> Result<String> {
        let sql = r#"
            SELECT pg_get_functiondef(p.oid)
            FROM pg_proc p
            JOIN pg_namespace n ON n.oid = p.pronamespace
            WHERE n.nspname = $1
                AND p.proname = $2
                AND pg_get_function_identity_arguments(p.oid) = $3
                AND p.prokind::text = $4
        "#;

        let definition = sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .bind(&routine.name)
            .bind(&routine.arguments)
            .bind(prokind(kind))
            .fetch_optional(&self.pool)
            .await?;

        definition.ok_or_else(|| {
            Error::ProviderError(format!(
                "Definition of {} {} could not be read",
                kind,
                routine.signature()
            ))
        })
    }

    async fn list_views(&self) -> Result<Vec<ViewDefinition>> {
        let sql = r#"
            SELECT viewname::text AS name, definition
            FROM pg_views
            WHERE schemaname = $1
            ORDER BY viewname
        "#;

        let rows = sqlx::query_as::<_, ViewRow>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| ViewDefinition {
                name: row.name,
                definition: row.definition,
            })
            .collect())
    }

    async fn get_view_definition(&self, name: &str) -> Result<Option<String>> {
        let sql = r#"
            SELECT definition
            FROM pg_views
            WHERE schemaname = $1 AND viewname = $2
        "#;

        let definition = sqlx::query_scalar::<_, Option<String>>(sql)
            .bind(&self.schema)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(definition.flatten())
    }

    async fn list_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        let sql = r#"
            SELECT
                tg.tgname::text AS name,
                t.relname::text AS table_name,
                pg_get_triggerdef(tg.oid) AS definition
            FROM pg_trigger tg
            JOIN pg_class t ON t.oid = tg.tgrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND NOT tg.tgisinternal
            ORDER BY tg.tgname
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
                definition: row.definition,
            })
            .collect())
    }

    async fn get_trigger_definition(&self, name: &str) -> Result<Option<String>> {
        let sql = r#"
            SELECT pg_get_triggerdef(tg.oid)
            FROM pg_trigger tg
            JOIN pg_class t ON t.oid = tg.tgrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            WHERE n.nspname = $1 AND tg.tgname = $2 AND NOT tg.tgisinternal
        "#;

        Ok(sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }
}
