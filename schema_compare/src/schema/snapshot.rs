//! Schema snapshots
//!
//! A snapshot is a serialized capture of one schema. `SnapshotProvider`
//! answers the whole provider contract from it, so an environment captured
//! once can be compared later without a live connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::is_yaml;
use crate::error::{Error, Result};
use crate::schema::generator::ScriptGenerator;
use crate::schema::provider::{DatabaseKind, SchemaProvider};
use crate::schema::types::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, PrimaryKeyDefinition, RoutineDefinition,
    RoutineKind, TableDefinition, TriggerDefinition, ViewDefinition,
};

/// Serialized capture of one schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub kind: DatabaseKind,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableDefinition>,
    #[serde(default)]
    pub functions: Vec<RoutineDefinition>,
    #[serde(default)]
    pub procedures: Vec<RoutineDefinition>,
    #[serde(default)]
    pub views: Vec<ViewDefinition>,
    #[serde(default)]
    pub triggers: Vec<TriggerDefinition>,
}

impl SchemaSnapshot {
    pub fn new(kind: DatabaseKind) -> Self {
        Self {
            kind,
            schema_name: None,
            tables: Vec::new(),
            functions: Vec::new(),
            procedures: Vec::new(),
            views: Vec::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_schema_name(mut self, schema_name: &str) -> Self {
        self.schema_name = Some(schema_name.to_string());
        self
    }

    pub fn add_table(&mut self, table: TableDefinition) {
        self.tables.push(table);
    }

    pub fn add_routine(&mut self, kind: RoutineKind, routine: RoutineDefinition) {
        match kind {
            RoutineKind::Function => self.functions.push(routine),
            RoutineKind::Procedure => self.procedures.push(routine),
        }
    }

    fn routines(&self, kind: RoutineKind) -> &[RoutineDefinition] {
        match kind {
            RoutineKind::Function => &self.functions,
            RoutineKind::Procedure => &self.procedures,
        }
    }

    fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables
            .iter()
            .find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Load a snapshot from a JSON file, or YAML by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let snapshot = if is_yaml(path) {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        debug!(path = %path.display(), "Loaded schema snapshot");
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read everything a provider exposes into a snapshot
    pub async fn capture(provider: &dyn SchemaProvider) -> Result<Self> {
        let mut snapshot = SchemaSnapshot::new(provider.kind());
        snapshot.schema_name = provider.schema_name().map(str::to_string);

        let tables = provider.list_tables().await?;
        info!(tables = tables.len(), "Capturing schema snapshot");
        for name in &tables {
            snapshot.add_table(provider.get_table_definition(name).await?);
        }

        for kind in [RoutineKind::Function, RoutineKind::Procedure] {
            for routine in provider.list_routines(kind).await? {
                let definition = match routine.definition.as_deref() {
                    Some(definition) => definition.to_string(),
                    None => provider.get_routine_definition(kind, &routine).await?,
                };
                let routine = routine.with_definition(&definition);
                snapshot.add_routine(kind, routine);
            }
        }

        for view in provider.list_views().await? {
            let definition = match view.definition {
                Some(definition) => Some(definition),
                None => provider.get_view_definition(&view.name).await?,
            };
            snapshot.views.push(ViewDefinition {
                name: view.name,
                definition,
            });
        }

        for trigger in provider.list_triggers().await? {
            let definition = match trigger.definition {
                Some(definition) => Some(definition),
                None => provider.get_trigger_definition(&trigger.name).await?,
            };
            snapshot.triggers.push(TriggerDefinition {
                name: trigger.name,
                table: trigger.table,
                definition,
            });
        }

        Ok(snapshot)
    }
}

/// Provider backed by an in-memory snapshot
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    snapshot: SchemaSnapshot,
    generator: ScriptGenerator,
}

impl SnapshotProvider {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        let generator = ScriptGenerator::new(snapshot.kind);
        Self {
            snapshot,
            generator,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SchemaSnapshot::load(path)?))
    }

    pub fn snapshot(&self) -> &SchemaSnapshot {
        &self.snapshot
    }

    fn require_table(&self, name: &str) -> Result<&TableDefinition> {
        self.snapshot
            .table(name)
            .ok_or_else(|| Error::not_found("Table", name))
    }
}

#[async_trait]
impl SchemaProvider for SnapshotProvider {
    fn kind(&self) -> DatabaseKind {
        self.snapshot.kind
    }

    fn schema_name(&self) -> Option<&str> {
        self.snapshot.schema_name.as_deref()
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.snapshot.tables.iter().map(|table| table.name.clone()).collect())
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDefinition>> {
        Ok(self.require_table(table)?.columns.clone())
    }

    async fn get_primary_keys(&self, table: &str) -> Result<Vec<PrimaryKeyDefinition>> {
        Ok(self.require_table(table)?.primary_keys.clone())
    }

    async fn get_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDefinition>> {
        Ok(self.require_table(table)?.foreign_keys.clone())
    }

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>> {
        Ok(self.require_table(table)?.indexes.clone())
    }

    async fn get_create_table_script(&self, table: &str) -> Result<String> {
        let definition = self.require_table(table)?;
        if definition.create_script.trim().is_empty() {
            Ok(self.generator.create_table_sql(definition))
        } else {
            Ok(definition.create_script.clone())
        }
    }

    async fn get_table_definition(&self, table: &str) -> Result<TableDefinition> {
        let mut definition = self.require_table(table)?.clone();
        if definition.create_script.trim().is_empty() {
            definition.create_script = self.generator.create_table_sql(&definition);
        }
        Ok(definition)
    }

    async fn get_primary_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let definition = self.require_table(table)?;
        Ok(self
            .generator
            .primary_key_script(&definition.name, &definition.primary_keys, name))
    }

    async fn get_foreign_key_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let definition = self.require_table(table)?;
        Ok(self
            .generator
            .foreign_key_script(&definition.name, &definition.foreign_keys, name))
    }

    async fn get_index_create_script(&self, table: &str, name: &str) -> Result<Option<String>> {
        let definition = self.require_table(table)?;
        Ok(self.generator.index_script(&definition.name, &definition.indexes, name))
    }

    async fn list_routines(&self, kind: RoutineKind) -> Result<Vec<RoutineDefinition>> {
        Ok(self
            .snapshot
            .routines(kind)
            .iter()
            .map(|routine| RoutineDefinition::new(&routine.name, &routine.arguments))
            .collect())
    }

    async fn get_routine_definition(&self, kind: RoutineKind, routine: &RoutineDefinition) -> Result<String> {
        let key = routine.signature_key();
        let stored = self
            .snapshot
            .routines(kind)
            .iter()
            .find(|candidate| candidate.signature_key() == key)
            .ok_or_else(|| Error::not_found(kind.as_str(), &routine.signature()))?;

        stored.definition.clone().ok_or_else(|| {
            Error::ProviderError(format!(
                "{} {} was listed without a definition",
                kind,
                routine.signature()
            ))
        })
    }

    async fn list_views(&self) -> Result<Vec<ViewDefinition>> {
        Ok(self.snapshot.views.clone())
    }

    async fn get_view_definition(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .snapshot
            .views
            .iter()
            .find(|view| view.name.eq_ignore_ascii_case(name))
            .and_then(|view| view.definition.clone()))
    }

    async fn list_triggers(&self) -> Result<Vec<TriggerDefinition>> {
        Ok(self.snapshot.triggers.clone())
    }

    async fn get_trigger_definition(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .snapshot
            .triggers
            .iter()
            .find(|trigger| trigger.name.eq_ignore_ascii_case(name))
            .and_then(|trigger| trigger.definition.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn orders() -> TableDefinition {
        let mut table = TableDefinition::new("orders");
        table.add_column(ColumnDefinition::new("id", "integer").nullable(false));
        table.add_column(ColumnDefinition::new("total", "numeric"));
        table.set_primary_key(PrimaryKeyDefinition {
            name: "orders_pkey".to_string(),
            columns: vec!["id".to_string()],
            create_script: None,
        });
        table.add_index(IndexDefinition {
            name: "idx_orders_total".to_string(),
            columns: vec!["total".to_string()],
            is_unique: false,
            index_type: None,
        });
        table
    }

    fn provider() -> SnapshotProvider {
        let mut snapshot = SchemaSnapshot::new(DatabaseKind::Postgres).with_schema_name("public");
        snapshot.add_table(orders());
        snapshot.add_routine(
            RoutineKind::Function,
            RoutineDefinition::new("calc_tax", "numeric").with_definition("SELECT amt*0.1"),
        );
        SnapshotProvider::new(snapshot)
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let provider = provider();
        let columns = provider.get_columns("ORDERS").await.unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let provider = provider();
        let err = provider.get_columns("customers").await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_synthesizes_scripts() {
        let provider = provider();

        let definition = provider.get_table_definition("orders").await.unwrap();
        assert!(definition.create_script.starts_with("CREATE TABLE \"orders\""));

        assert_eq!(
            provider.get_primary_key_create_script("orders", "orders_pkey").await.unwrap(),
            Some("ALTER TABLE \"orders\" ADD CONSTRAINT \"orders_pkey\" PRIMARY KEY (\"id\");".to_string())
        );
        assert_eq!(
            provider.get_index_create_script("orders", "missing").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_routines_are_listed_without_definitions() {
        let provider = provider();

        let listed = provider.list_functions().await.unwrap();
        assert_eq!(listed, vec![RoutineDefinition::new("calc_tax", "numeric")]);

        let definition = provider
            .get_routine_definition(RoutineKind::Function, &RoutineDefinition::new("CALC_TAX", "NUMERIC"))
            .await
            .unwrap();
        assert_eq!(definition, "SELECT amt*0.1");

        assert!(provider.list_procedures().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_capture_round_trips_through_json() {
        let captured = SchemaSnapshot::capture(&provider()).await.unwrap();

        assert_eq!(captured.schema_name.as_deref(), Some("public"));
        assert_eq!(captured.functions[0].definition.as_deref(), Some("SELECT amt*0.1"));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", captured.to_json().unwrap()).unwrap();

        let loaded = SchemaSnapshot::load(file.path()).unwrap();
        assert_eq!(loaded, captured);
    }

    #[test]
    fn test_load_yaml_snapshot() {
        let yaml = r#"
kind: mysql
schema_name: shop
tables:
  - name: customers
    columns:
      - name: id
        data_type: int
        nullable: false
"#;
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "{}", yaml).unwrap();

        let snapshot = SchemaSnapshot::load(file.path()).unwrap();
        assert_eq!(snapshot.kind, DatabaseKind::MySql);
        assert_eq!(snapshot.tables[0].columns[0].name, "id");
    }
}
