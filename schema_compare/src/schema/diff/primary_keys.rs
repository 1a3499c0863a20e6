//! Primary key comparison

use crate::error::Result;
use crate::schema::diff::{ComponentDiff, DiffContext};
use crate::schema::provider::SchemaProvider;
use crate::schema::result::{Component, ComparisonStatus, ComparisonSubResult};
use crate::schema::types::{PrimaryKeyDefinition, TableDefinition};

/// Compare the primary keys of two tables. Only the first key on each side
/// is considered.
pub async fn compare_primary_keys(
    context: &DiffContext<'_>,
    source: &TableDefinition,
    target: &TableDefinition,
) -> Result<ComponentDiff> {
    let mut diff = ComponentDiff::default();

    match (source.primary_key(), target.primary_key()) {
        (None, None) => {}
        (Some(pk), None) => {
            let script = recreate_script(context.source, &source.name, pk).await?;
            diff.push(
                ComparisonSubResult::new(
                    Component::PrimaryKeys,
                    ComparisonStatus::MissingInTarget,
                    format!("Primary key {} ({}) is missing in target", pk.name, pk.columns.join(", ")),
                )
                .with_script(script),
            );
        }
        (None, Some(pk)) => {
            let script = recreate_script(context.target, &target.name, pk).await?;
            diff.push(
                ComparisonSubResult::new(
                    Component::PrimaryKeys,
                    ComparisonStatus::MissingInSource,
                    format!("Primary key {} ({}) exists only in target", pk.name, pk.columns.join(", ")),
                )
                .with_script(script),
            );
        }
        (Some(source_pk), Some(target_pk)) if source_pk == target_pk => {}
        (Some(source_pk), Some(target_pk)) => {
            let script = recreate_script(context.source, &source.name, source_pk).await?;
            diff.push(
                ComparisonSubResult::new(
                    Component::PrimaryKeys,
                    ComparisonStatus::Mismatch,
                    format!(
                        "Primary key differs: source {} ({}) vs target {} ({})",
                        source_pk.name,
                        source_pk.columns.join(", "),
                        target_pk.name,
                        target_pk.columns.join(", ")
                    ),
                )
                .with_script(script),
            );
        }
    }

    Ok(diff)
}

/// Ask the provider first, falling back to a script carried on the definition
async fn recreate_script(
    provider: &dyn SchemaProvider,
    table: &str,
    pk: &PrimaryKeyDefinition,
) -> Result<Option<String>> {
    let script = provider.get_primary_key_create_script(table, &pk.name).await?;
    Ok(script.or_else(|| pk.create_script.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generator::ScriptGenerator;
    use crate::schema::provider::DatabaseKind;
    use crate::schema::snapshot::{SchemaSnapshot, SnapshotProvider};
    use crate::schema::types::ColumnDefinition;
    use pretty_assertions::assert_eq;

    fn accounts(primary_key: Option<&[&str]>) -> TableDefinition {
        let mut table = TableDefinition::new("accounts");
        table.add_column(ColumnDefinition::new("id", "integer").nullable(false));
        table.add_column(ColumnDefinition::new("region", "integer").nullable(false));
        if let Some(columns) = primary_key {
            table.set_primary_key(PrimaryKeyDefinition {
                name: "accounts_pkey".to_string(),
                columns: columns.iter().map(|c| c.to_string()).collect(),
                create_script: None,
            });
        }
        table
    }

    fn snapshot_of(table: &TableDefinition) -> SnapshotProvider {
        let mut snapshot = SchemaSnapshot::new(DatabaseKind::Postgres);
        snapshot.add_table(table.clone());
        SnapshotProvider::new(snapshot)
    }

    async fn diff(source: &TableDefinition, target: &TableDefinition) -> ComponentDiff {
        let (source_provider, target_provider) = (snapshot_of(source), snapshot_of(target));
        let context = DiffContext {
            source: &source_provider,
            target: &target_provider,
            generator: ScriptGenerator::new(DatabaseKind::Postgres),
        };
        compare_primary_keys(&context, source, target).await.unwrap()
    }

    #[tokio::test]
    async fn test_primary_key_missing_in_target() {
        let result = diff(&accounts(Some(&["id"])), &accounts(None)).await;

        assert_eq!(result.status, ComparisonStatus::Mismatch);
        assert_eq!(result.sub_results.len(), 1);
        assert_eq!(result.sub_results[0].status, ComparisonStatus::MissingInTarget);
        assert_eq!(
            result.sub_results[0].create_script.as_deref(),
            Some("ALTER TABLE \"accounts\" ADD CONSTRAINT \"accounts_pkey\" PRIMARY KEY (\"id\");")
        );
    }

    #[tokio::test]
    async fn test_primary_key_only_in_target_uses_target_script() {
        let result = diff(&accounts(None), &accounts(Some(&["id", "region"]))).await;

        assert_eq!(result.sub_results[0].status, ComparisonStatus::MissingInSource);
        assert_eq!(
            result.sub_results[0].create_script.as_deref(),
            Some("ALTER TABLE \"accounts\" ADD CONSTRAINT \"accounts_pkey\" PRIMARY KEY (\"id\", \"region\");")
        );
    }

    #[tokio::test]
    async fn test_equal_primary_keys_ignore_case() {
        let result = diff(&accounts(Some(&["ID"])), &accounts(Some(&["id"]))).await;
        assert!(result.is_match());
        assert!(result.sub_results.is_empty());
    }
}
