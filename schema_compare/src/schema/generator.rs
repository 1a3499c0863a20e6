//! Remediation script generator
//!
//! Renders the dialect-specific SQL attached to comparison sub-results and
//! synthesizes recreate scripts where a provider has no server-side rendering.

use crate::schema::provider::DatabaseKind;
use crate::schema::types::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition, TableDefinition,
};
use crate::utils::naming::{quote_column_list, quote_ident, split_column_list};

const CHARACTER_TYPES: &[&str] = &["varchar", "char", "character varying", "character", "nvarchar", "nchar"];

/// SQL generator for one dialect
#[derive(Debug, Clone, Copy)]
pub struct ScriptGenerator {
    kind: DatabaseKind,
}

impl ScriptGenerator {
    /// Create a new script generator
    pub fn new(kind: DatabaseKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    fn quote(&self, name: &str) -> String {
        quote_ident(self.kind, name)
    }

    /// Column type including its length, unless the type already spells one out.
    ///
    /// Only character types take a length; `text` family lengths are informational.
    pub fn column_type(&self, column: &ColumnDefinition) -> String {
        let takes_length = CHARACTER_TYPES
            .iter()
            .any(|name| column.data_type.eq_ignore_ascii_case(name));
        match column.max_length {
            Some(length) if length > 0 && takes_length => {
                format!("{}({})", column.data_type, length)
            }
            _ => column.data_type.clone(),
        }
    }

    /// Column clause as used in CREATE TABLE and ADD COLUMN
    pub fn column_definition(&self, column: &ColumnDefinition) -> String {
        let mut sql = format!("{} {}", self.quote(&column.name), self.column_type(column));

        if column.is_identity {
            match self.kind {
                DatabaseKind::Postgres => sql.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                DatabaseKind::MySql => sql.push_str(" AUTO_INCREMENT"),
            }
        }

        if let Some(default_val) = column.default.as_deref().filter(|d| !d.trim().is_empty()) {
            if !column.is_identity {
                sql.push_str(&format!(" DEFAULT {}", default_val));
            }
        }

        if !column.nullable {
            sql.push_str(" NOT NULL");
        }

        sql
    }

    /// Generate SQL to add a column to a table
    pub fn add_column_sql(&self, table_name: &str, column: &ColumnDefinition) -> String {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {};",
            self.quote(table_name),
            self.column_definition(column)
        );

        if column.is_computed {
            sql = format!(
                "-- {} is a computed column; review the generation expression before applying.\n{}",
                column.name, sql
            );
        }

        sql
    }

    /// Generate SQL to create a table with its keys and indexes
    pub fn create_table_sql(&self, table: &TableDefinition) -> String {
        let mut column_defs: Vec<String> = table
            .columns
            .iter()
            .map(|column| format!("  {}", self.column_definition(column)))
            .collect();

        if let Some(pk) = table.primary_key() {
            column_defs.push(format!(
                "  CONSTRAINT {} PRIMARY KEY ({})",
                self.quote(&pk.name),
                quote_column_list(self.kind, &pk.columns)
            ));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n);\n",
            self.quote(&table.name),
            column_defs.join(",\n")
        );

        for fk in &table.foreign_keys {
            sql.push_str(&self.foreign_key_sql(&table.name, fk));
            sql.push('\n');
        }

        for index in &table.indexes {
            sql.push_str(&self.create_index_sql(&table.name, index));
            sql.push('\n');
        }

        sql
    }

    /// Generate SQL to add a primary key
    pub fn primary_key_sql(&self, table_name: &str, pk: &PrimaryKeyDefinition) -> String {
        match self.kind {
            DatabaseKind::Postgres => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
                self.quote(table_name),
                self.quote(&pk.name),
                quote_column_list(self.kind, &pk.columns)
            ),
            // MySQL always names the primary key PRIMARY
            DatabaseKind::MySql => format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({});",
                self.quote(table_name),
                quote_column_list(self.kind, &pk.columns)
            ),
        }
    }

    /// Generate SQL to add a foreign key
    pub fn foreign_key_sql(&self, table_name: &str, fk: &ForeignKeyDefinition) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
            self.quote(table_name),
            self.quote(&fk.name),
            quote_column_list(self.kind, &split_column_list(&fk.column)),
            self.quote(&fk.referenced_table),
            quote_column_list(self.kind, &split_column_list(&fk.referenced_column))
        )
    }

    /// Generate SQL to create an index
    pub fn create_index_sql(&self, table_name: &str, index: &IndexDefinition) -> String {
        let unique = if index.is_unique { "UNIQUE " } else { "" };
        let columns = quote_column_list(self.kind, &index.columns);

        match self.kind {
            DatabaseKind::Postgres => {
                let method = index.index_type.as_deref().unwrap_or("btree");
                format!(
                    "CREATE {}INDEX {} ON {} USING {} ({});",
                    unique,
                    self.quote(&index.name),
                    self.quote(table_name),
                    method,
                    columns
                )
            }
            DatabaseKind::MySql => {
                let using = match index.index_type.as_deref() {
                    Some(method) if !method.eq_ignore_ascii_case("btree") => format!(" USING {}", method),
                    _ => String::new(),
                };
                format!(
                    "CREATE {}INDEX {} ON {} ({}){};",
                    unique,
                    self.quote(&index.name),
                    self.quote(table_name),
                    columns,
                    using
                )
            }
        }
    }

    /// Recreate script for the primary key `name` among `keys`.
    ///
    /// A script the provider captured with the key wins over a rendered one.
    pub fn primary_key_script(&self, table_name: &str, keys: &[PrimaryKeyDefinition], name: &str) -> Option<String> {
        keys.iter().find(|pk| pk.name.eq_ignore_ascii_case(name)).map(|pk| {
            pk.create_script
                .clone()
                .unwrap_or_else(|| self.primary_key_sql(table_name, pk))
        })
    }

    /// Recreate script for the foreign key `name` among `keys`
    pub fn foreign_key_script(&self, table_name: &str, keys: &[ForeignKeyDefinition], name: &str) -> Option<String> {
        keys.iter()
            .find(|fk| fk.name.eq_ignore_ascii_case(name))
            .map(|fk| self.foreign_key_sql(table_name, fk))
    }

    /// Recreate script for the index `name` among `indexes`
    pub fn index_script(&self, table_name: &str, indexes: &[IndexDefinition], name: &str) -> Option<String> {
        indexes
            .iter()
            .find(|index| index.name.eq_ignore_ascii_case(name))
            .map(|index| self.create_index_sql(table_name, index))
    }

    /// Commented-out DROP INDEX for an index only the target has.
    ///
    /// Dropping is destructive, so it is never emitted as live SQL.
    pub fn drop_index_suggestion(&self, table_name: &str, index_name: &str) -> String {
        let statement = match self.kind {
            DatabaseKind::Postgres => format!("DROP INDEX IF EXISTS {};", self.quote(index_name)),
            DatabaseKind::MySql => format!(
                "DROP INDEX IF EXISTS {} ON {};",
                self.quote(index_name),
                self.quote(table_name)
            ),
        };

        format!(
            "-- Optional, destructive: index {} exists only in the target.\n-- {}",
            index_name, statement
        )
    }
}
