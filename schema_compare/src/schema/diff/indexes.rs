//! Index comparison
//!
//! Indexes are matched by name only. Two indexes with different names but
//! the same columns are reported as one missing on each side.

use crate::error::Result;
use crate::schema::diff::{ComponentDiff, DiffContext};
use crate::schema::result::{Component, ComparisonStatus, ComparisonSubResult};
use crate::schema::types::{IndexDefinition, TableDefinition};
use crate::utils::naming::index_by_name;

pub async fn compare_indexes(
    context: &DiffContext<'_>,
    source: &TableDefinition,
    target: &TableDefinition,
) -> Result<ComponentDiff> {
    let source_indexes = index_by_name(&source.indexes, |idx| idx.name.as_str());
    let target_indexes = index_by_name(&target.indexes, |idx| idx.name.as_str());
    let mut diff = ComponentDiff::default();

    for (key, source_idx) in &source_indexes {
        match target_indexes.get(key) {
            None => {
                let script = context
                    .source
                    .get_index_create_script(&source.name, &source_idx.name)
                    .await?;
                diff.push(
                    ComparisonSubResult::new(
                        Component::Indexes,
                        ComparisonStatus::MissingInTarget,
                        format!("Index {} {} is missing in target", source_idx.name, describe(source_idx)),
                    )
                    .with_script(script),
                );
            }
            Some(target_idx) if !same_shape(source_idx, target_idx) => {
                let script = context
                    .source
                    .get_index_create_script(&source.name, &source_idx.name)
                    .await?;
                diff.push(
                    ComparisonSubResult::new(
                        Component::Indexes,
                        ComparisonStatus::Mismatch,
                        format!(
                            "Index {} differs: source {} vs target {}; drop the target index before recreating it",
                            source_idx.name,
                            describe(source_idx),
                            describe(target_idx)
                        ),
                    )
                    .with_script(script),
                );
            }
            Some(_) => {}
        }
    }

    for (key, target_idx) in &target_indexes {
        if source_indexes.contains_key(key) {
            continue;
        }
        let suggestion = context
            .generator
            .drop_index_suggestion(&target.name, &target_idx.name);
        diff.push(
            ComparisonSubResult::new(
                Component::Indexes,
                ComparisonStatus::MissingInSource,
                format!("Index {} {} exists only in target", target_idx.name, describe(target_idx)),
            )
            .with_script(Some(suggestion)),
        );
    }

    Ok(diff)
}

fn same_shape(a: &IndexDefinition, b: &IndexDefinition) -> bool {
    let same_type = match (&a.index_type, &b.index_type) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => true,
    };
    a.is_unique == b.is_unique
        && same_type
        && a.columns.len() == b.columns.len()
        && a.columns
            .iter()
            .zip(&b.columns)
            .all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn describe(index: &IndexDefinition) -> String {
    format!(
        "{}({})",
        if index.is_unique { "UNIQUE " } else { "" },
        index.columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generator::ScriptGenerator;
    use crate::schema::provider::DatabaseKind;
    use crate::schema::snapshot::{SchemaSnapshot, SnapshotProvider};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn index(name: &str, columns: &[&str], is_unique: bool, index_type: Option<&str>) -> IndexDefinition {
        IndexDefinition {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            is_unique,
            index_type: index_type.map(str::to_string),
        }
    }

    fn events(indexes: Vec<IndexDefinition>) -> TableDefinition {
        let mut table = TableDefinition::new("events");
        for index in indexes {
            table.add_index(index);
        }
        table
    }

    async fn diff(source: &TableDefinition, target: &TableDefinition) -> ComponentDiff {
        let mut source_snapshot = SchemaSnapshot::new(DatabaseKind::Postgres);
        source_snapshot.add_table(source.clone());
        let mut target_snapshot = SchemaSnapshot::new(DatabaseKind::Postgres);
        target_snapshot.add_table(target.clone());
        let (source_provider, target_provider) =
            (SnapshotProvider::new(source_snapshot), SnapshotProvider::new(target_snapshot));

        let context = DiffContext {
            source: &source_provider,
            target: &target_provider,
            generator: ScriptGenerator::new(DatabaseKind::Postgres),
        };
        compare_indexes(&context, source, target).await.unwrap()
    }

    #[rstest]
    #[case::uniqueness(index("idx_events_at", &["at"], false, Some("btree")))]
    #[case::columns(index("idx_events_at", &["at", "kind"], true, Some("btree")))]
    #[case::method(index("idx_events_at", &["at"], true, Some("hash")))]
    #[tokio::test]
    async fn test_same_name_different_shape_is_mismatch(#[case] target_index: IndexDefinition) {
        let source = events(vec![index("idx_events_at", &["at"], true, Some("btree"))]);
        let target = events(vec![target_index]);

        let result = diff(&source, &target).await;

        assert_eq!(result.status, ComparisonStatus::Mismatch);
        assert_eq!(result.sub_results.len(), 1);
        assert_eq!(
            result.sub_results[0].create_script.as_deref(),
            Some("CREATE UNIQUE INDEX \"idx_events_at\" ON \"events\" USING btree (\"at\");")
        );
    }

    #[tokio::test]
    async fn test_unknown_method_on_one_side_still_matches() {
        let source = events(vec![index("IDX_EVENTS_AT", &["AT"], false, None)]);
        let target = events(vec![index("idx_events_at", &["at"], false, Some("btree"))]);

        assert!(diff(&source, &target).await.is_match());
    }

    #[tokio::test]
    async fn test_renamed_index_is_missing_on_both_sides() {
        let source = events(vec![index("idx_events_at", &["at"], false, None)]);
        let target = events(vec![index("events_at_idx", &["at"], false, None)]);

        let result = diff(&source, &target).await;

        let statuses: Vec<_> = result.sub_results.iter().map(|sub| sub.status).collect();
        assert_eq!(
            statuses,
            vec![ComparisonStatus::MissingInTarget, ComparisonStatus::MissingInSource]
        );
        assert_eq!(result.status, ComparisonStatus::Mismatch);
    }
}
