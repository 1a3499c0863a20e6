//! Column comparison

use crate::schema::diff::ComponentDiff;
use crate::schema::generator::ScriptGenerator;
use crate::schema::result::{Component, ComparisonStatus, ComparisonSubResult};
use crate::schema::types::{ColumnDefinition, TableDefinition};
use crate::utils::naming::index_by_name;

/// Compare the columns of two tables.
///
/// Only columns missing in the target get a script (`ADD COLUMN`). Changed
/// columns are flagged for manual review and target-only columns are
/// reported without a destructive suggestion.
pub fn compare_columns(
    generator: &ScriptGenerator,
    source: &TableDefinition,
    target: &TableDefinition,
) -> ComponentDiff {
    let source_columns = index_by_name(&source.columns, |col| col.name.as_str());
    let target_columns = index_by_name(&target.columns, |col| col.name.as_str());
    let mut diff = ComponentDiff::default();

    for (key, source_col) in &source_columns {
        match target_columns.get(key) {
            None => diff.push(
                ComparisonSubResult::new(
                    Component::Columns,
                    ComparisonStatus::MissingInTarget,
                    format!(
                        "Column {} ({}) is missing in target",
                        source_col.name,
                        describe(generator, source_col)
                    ),
                )
                .with_script(Some(generator.add_column_sql(&source.name, source_col))),
            ),
            Some(target_col) if *source_col != *target_col => diff.push(ComparisonSubResult::new(
                Component::Columns,
                ComparisonStatus::Mismatch,
                format!(
                    "Column {} differs: source {} vs target {}; review manually",
                    source_col.name,
                    describe(generator, source_col),
                    describe(generator, target_col)
                ),
            )),
            Some(_) => {}
        }
    }

    for (key, target_col) in &target_columns {
        if !source_columns.contains_key(key) {
            diff.push(ComparisonSubResult::new(
                Component::Columns,
                ComparisonStatus::MissingInSource,
                format!(
                    "Column {} ({}) exists only in target",
                    target_col.name,
                    describe(generator, target_col)
                ),
            ));
        }
    }

    diff
}

fn describe(generator: &ScriptGenerator, column: &ColumnDefinition) -> String {
    let mut parts = vec![generator.column_type(column)];
    parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());
    if let Some(default) = column.default.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push(format!("DEFAULT {}", default));
    }
    if column.is_identity {
        parts.push("IDENTITY".to_string());
    }
    if column.is_computed {
        parts.push("COMPUTED".to_string());
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::provider::DatabaseKind;
    use pretty_assertions::assert_eq;

    fn table(name: &str, columns: Vec<ColumnDefinition>) -> TableDefinition {
        let mut table = TableDefinition::new(name);
        for column in columns {
            table.add_column(column);
        }
        table
    }

    fn pg() -> ScriptGenerator {
        ScriptGenerator::new(DatabaseKind::Postgres)
    }

    #[test]
    fn test_identical_columns_match() {
        let source = table("orders", vec![ColumnDefinition::new("id", "int").nullable(false)]);
        let target = table("ORDERS", vec![ColumnDefinition::new("ID", "INT").nullable(false)]);

        let diff = compare_columns(&pg(), &source, &target);
        assert!(diff.is_match());
        assert!(diff.sub_results.is_empty());
    }

    #[test]
    fn test_missing_in_target_gets_add_column() {
        let source = table(
            "orders",
            vec![
                ColumnDefinition::new("id", "int").nullable(false),
                ColumnDefinition::new("total", "numeric"),
            ],
        );
        let target = table("orders", vec![ColumnDefinition::new("id", "int").nullable(false)]);

        let diff = compare_columns(&pg(), &source, &target);

        assert_eq!(diff.status, ComparisonStatus::Mismatch);
        assert_eq!(diff.sub_results.len(), 1);
        let sub = &diff.sub_results[0];
        assert_eq!(sub.status, ComparisonStatus::MissingInTarget);
        assert_eq!(
            sub.create_script.as_deref(),
            Some("ALTER TABLE \"orders\" ADD COLUMN \"total\" numeric;")
        );
    }

    #[test]
    fn test_changed_column_has_no_script() {
        let source = table("orders", vec![ColumnDefinition::new("note", "varchar").max_length(50)]);
        let target = table("orders", vec![ColumnDefinition::new("note", "varchar").max_length(20)]);

        let diff = compare_columns(&pg(), &source, &target);

        assert_eq!(diff.sub_results.len(), 1);
        assert_eq!(diff.sub_results[0].status, ComparisonStatus::Mismatch);
        assert!(!diff.sub_results[0].has_script());
        assert!(diff.sub_results[0].details.contains("varchar(50)"));
    }

    #[test]
    fn test_precision_and_array_types_are_compared() {
        let source = table(
            "orders",
            vec![
                ColumnDefinition::new("total", "numeric(10,2)"),
                ColumnDefinition::new("tags", "text[]"),
                ColumnDefinition::new("mood", "mood"),
                ColumnDefinition::new("extra", "integer[]"),
            ],
        );
        let target = table(
            "orders",
            vec![
                ColumnDefinition::new("total", "numeric(18,6)"),
                ColumnDefinition::new("tags", "integer[]"),
                ColumnDefinition::new("mood", "colour"),
            ],
        );

        let diff = compare_columns(&pg(), &source, &target);

        let statuses: Vec<_> = diff.sub_results.iter().map(|sub| sub.status).collect();
        assert_eq!(
            statuses,
            vec![
                ComparisonStatus::Mismatch,
                ComparisonStatus::Mismatch,
                ComparisonStatus::Mismatch,
                ComparisonStatus::MissingInTarget,
            ]
        );
        assert_eq!(
            diff.sub_results[3].create_script.as_deref(),
            Some("ALTER TABLE \"orders\" ADD COLUMN \"extra\" integer[];")
        );
    }

    #[test]
    fn test_target_only_column_is_not_dropped() {
        let source = table("orders", vec![]);
        let target = table("orders", vec![ColumnDefinition::new("legacy_flag", "boolean")]);

        let diff = compare_columns(&pg(), &source, &target);

        assert_eq!(diff.status, ComparisonStatus::Mismatch);
        assert_eq!(diff.sub_results[0].status, ComparisonStatus::MissingInSource);
        assert_eq!(diff.sub_results[0].create_script, None);
    }

    #[test]
    fn test_swapping_sides_flips_labels_only() {
        let a = table("t", vec![ColumnDefinition::new("x", "int"), ColumnDefinition::new("y", "int")]);
        let b = table("t", vec![ColumnDefinition::new("x", "int")]);

        let forward = compare_columns(&pg(), &a, &b);
        let backward = compare_columns(&pg(), &b, &a);

        assert_eq!(forward.status, backward.status);
        assert_eq!(forward.sub_results.len(), backward.sub_results.len());
        assert_eq!(forward.sub_results[0].status.reversed(), backward.sub_results[0].status);
    }
}
