//! Diff script assembly
//!
//! Turns the remediation scripts attached to sub-results into one
//! reviewable script per object.

use crate::schema::result::{Component, ComparisonResult, ComparisonStatus, ComparisonSubResult};

/// Build the composite diff script for a table result.
///
/// Returns `None` for a matching table. For a table missing on one side the
/// whole create script is the remediation, so the create-script block is
/// used on its own when it carries a script.
pub fn build_table_diff_script(
    result: &ComparisonResult,
    source_create: &str,
    target_create: &str,
) -> Option<String> {
    if result.status.is_match() {
        return None;
    }

    if matches!(
        result.status,
        ComparisonStatus::MissingInSource | ComparisonStatus::MissingInTarget
    ) {
        if let Some(block) = result
            .sub_results_for(Component::CreateScript)
            .find(|sub| sub.has_script())
            .and_then(labeled_block)
        {
            return Some(block);
        }
    }

    let blocks: Vec<String> = result.sub_results.iter().filter_map(labeled_block).collect();
    if blocks.is_empty() {
        Some(side_by_side(source_create, target_create))
    } else {
        Some(blocks.join("\n\n"))
    }
}

/// Both raw scripts under `-- SOURCE` / `-- TARGET` markers
pub fn side_by_side(source: &str, target: &str) -> String {
    format!("-- SOURCE\n{}\n\n-- TARGET\n{}", source.trim_end(), target.trim_end())
}

fn labeled_block(sub_result: &ComparisonSubResult) -> Option<String> {
    let script = sub_result.create_script.as_deref()?.trim_end();
    if script.trim().is_empty() {
        return None;
    }
    Some(format!(
        "-- {}: {}\n{}",
        sub_result.component, sub_result.status, script
    ))
}
