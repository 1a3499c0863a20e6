//! Foreign key comparison

use crate::error::Result;
use crate::schema::diff::{ComponentDiff, DiffContext};
use crate::schema::result::{Component, ComparisonStatus, ComparisonSubResult};
use crate::schema::types::{ForeignKeyDefinition, TableDefinition};
use crate::utils::naming::{index_by_name, union_keys};

/// Compare foreign keys, matched by case-insensitive constraint name.
/// When two keys on one side share a name, the first one is used.
pub async fn compare_foreign_keys(
    context: &DiffContext<'_>,
    source: &TableDefinition,
    target: &TableDefinition,
) -> Result<ComponentDiff> {
    let source_fks = index_by_name(&source.foreign_keys, |fk| fk.name.as_str());
    let target_fks = index_by_name(&target.foreign_keys, |fk| fk.name.as_str());
    let mut diff = ComponentDiff::default();

    for key in union_keys(&source_fks, &target_fks) {
        match (source_fks.get(&key), target_fks.get(&key)) {
            (Some(source_fk), Some(target_fk)) => {
                if source_fk == target_fk {
                    continue;
                }
                let script = context
                    .source
                    .get_foreign_key_create_script(&source.name, &source_fk.name)
                    .await?;
                diff.push(
                    ComparisonSubResult::new(
                        Component::ForeignKeys,
                        ComparisonStatus::Mismatch,
                        format!(
                            "Foreign key {} differs: source {} vs target {}",
                            source_fk.name,
                            describe(source_fk),
                            describe(target_fk)
                        ),
                    )
                    .with_script(script),
                );
            }
            (Some(source_fk), None) => {
                let script = context
                    .source
                    .get_foreign_key_create_script(&source.name, &source_fk.name)
                    .await?;
                diff.push(
                    ComparisonSubResult::new(
                        Component::ForeignKeys,
                        ComparisonStatus::MissingInTarget,
                        format!(
                            "Foreign key {} {} is missing in target",
                            source_fk.name,
                            describe(source_fk)
                        ),
                    )
                    .with_script(script),
                );
            }
            (None, Some(target_fk)) => {
                let script = context
                    .target
                    .get_foreign_key_create_script(&target.name, &target_fk.name)
                    .await?;
                diff.push(
                    ComparisonSubResult::new(
                        Component::ForeignKeys,
                        ComparisonStatus::MissingInSource,
                        format!(
                            "Foreign key {} {} exists only in target",
                            target_fk.name,
                            describe(target_fk)
                        ),
                    )
                    .with_script(script),
                );
            }
            (None, None) => {}
        }
    }

    Ok(diff)
}

fn describe(fk: &ForeignKeyDefinition) -> String {
    format!(
        "({}) -> {} ({})",
        fk.column, fk.referenced_table, fk.referenced_column
    )
}
