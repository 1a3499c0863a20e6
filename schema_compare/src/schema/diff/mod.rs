//! Table difference calculator
//!
//! Compares one table between source and target, facet by facet, and
//! assembles the table's `ComparisonResult`.

pub mod columns;
pub mod foreign_keys;
pub mod indexes;
pub mod primary_keys;

use tracing::debug;

use crate::error::Result;
use crate::schema::canonical::Canonicalizer;
use crate::schema::diff_script::build_table_diff_script;
use crate::schema::generator::ScriptGenerator;
use crate::schema::provider::SchemaProvider;
use crate::schema::result::{
    Component, ComparisonResult, ComparisonStatus, ComparisonSubResult, ObjectType,
};
use crate::schema::types::TableDefinition;

pub use columns::compare_columns;
pub use foreign_keys::compare_foreign_keys;
pub use indexes::compare_indexes;
pub use primary_keys::compare_primary_keys;

/// Findings of one sub-comparator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentDiff {
    pub status: ComparisonStatus,
    pub sub_results: Vec<ComparisonSubResult>,
}

impl ComponentDiff {
    pub fn push(&mut self, sub_result: ComparisonSubResult) {
        self.status = self.status.escalate(sub_result.status);
        self.sub_results.push(sub_result);
    }

    pub fn is_match(&self) -> bool {
        self.status.is_match()
    }
}

/// Providers and generator the sub-comparators call back into for
/// recreate scripts
#[derive(Clone, Copy)]
pub struct DiffContext<'a> {
    pub source: &'a dyn SchemaProvider,
    pub target: &'a dyn SchemaProvider,
    pub generator: ScriptGenerator,
}

/// Runs every sub-comparator over one table
pub struct TableDiffer<'a> {
    context: DiffContext<'a>,
    canonicalizer: &'a Canonicalizer,
}

impl<'a> TableDiffer<'a> {
    pub fn new(context: DiffContext<'a>, canonicalizer: &'a Canonicalizer) -> Self {
        Self {
            context,
            canonicalizer,
        }
    }

    /// Compare one table. A side that lacks the table is passed as `None`;
    /// the sub-comparators then run against an empty table so the result
    /// still enumerates everything the present side has.
    pub async fn compare(
        &self,
        source: Option<&TableDefinition>,
        target: Option<&TableDefinition>,
    ) -> Result<ComparisonResult> {
        let name = source
            .or(target)
            .map(|table| table.name.clone())
            .unwrap_or_default();

        let empty_source;
        let source_table = match source {
            Some(table) => table,
            None => {
                empty_source = TableDefinition::new(&name);
                &empty_source
            }
        };
        let empty_target;
        let target_table = match target {
            Some(table) => table,
            None => {
                empty_target = TableDefinition::new(&name);
                &empty_target
            }
        };

        let mut result = ComparisonResult::new(ObjectType::Table, &name);

        if let Some(sub_result) = self.compare_create_scripts(source, target) {
            result.push(sub_result);
        }

        let facets = [
            compare_columns(&self.context.generator, source_table, target_table),
            compare_primary_keys(&self.context, source_table, target_table).await?,
            compare_foreign_keys(&self.context, source_table, target_table).await?,
            compare_indexes(&self.context, source_table, target_table).await?,
        ];
        for facet in facets {
            for sub_result in facet.sub_results {
                result.push(sub_result);
            }
        }

        result.status = match (source, target) {
            (Some(_), None) => ComparisonStatus::MissingInTarget,
            (None, Some(_)) => ComparisonStatus::MissingInSource,
            _ => result.status,
        };
        result.details = describe(&result);
        result.diff_script = build_table_diff_script(
            &result,
            &source_table.create_script,
            &target_table.create_script,
        );

        debug!(table = %name, status = %result.status, findings = result.sub_results.len(), "Compared table");

        Ok(result)
    }

    fn compare_create_scripts(
        &self,
        source: Option<&TableDefinition>,
        target: Option<&TableDefinition>,
    ) -> Option<ComparisonSubResult> {
        match (source, target) {
            (Some(source), Some(target)) => {
                if self
                    .canonicalizer
                    .equivalent(&source.create_script, &target.create_script)
                {
                    None
                } else {
                    Some(ComparisonSubResult::new(
                        Component::CreateScript,
                        ComparisonStatus::Mismatch,
                        "Create scripts differ after canonicalization",
                    ))
                }
            }
            (Some(source), None) => Some(
                ComparisonSubResult::new(
                    Component::CreateScript,
                    ComparisonStatus::MissingInTarget,
                    format!("Table {} is missing in target", source.name),
                )
                .with_script(Some(source.create_script.clone())),
            ),
            (None, Some(target)) => Some(
                ComparisonSubResult::new(
                    Component::CreateScript,
                    ComparisonStatus::MissingInSource,
                    format!("Table {} exists only in target", target.name),
                )
                .with_script(Some(target.create_script.clone())),
            ),
            (None, None) => None,
        }
    }
}

fn describe(result: &ComparisonResult) -> String {
    match result.status {
        ComparisonStatus::Match => "Table definitions match".to_string(),
        ComparisonStatus::MissingInTarget => format!("Table {} is missing in target", result.name),
        ComparisonStatus::MissingInSource => format!("Table {} is missing in source", result.name),
        ComparisonStatus::Mismatch => {
            let mut components: Vec<String> = Vec::new();
            for sub in &result.sub_results {
                let label = sub.component.to_string();
                if !components.contains(&label) {
                    components.push(label);
                }
            }
            format!(
                "{} difference(s) in {}",
                result.sub_results.len(),
                components.join(", ")
            )
        }
    }
}
