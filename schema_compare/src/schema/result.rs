//! Comparison results
//!
//! The serialized form of these types is what the reporting layer consumes,
//! hence the PascalCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::schema::types::RoutineKind;

/// Kind of object a result describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Table,
    Function,
    Procedure,
}

impl From<RoutineKind> for ObjectType {
    fn from(kind: RoutineKind) -> Self {
        match kind {
            RoutineKind::Function => ObjectType::Function,
            RoutineKind::Procedure => ObjectType::Procedure,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectType::Table => write!(f, "Table"),
            ObjectType::Function => write!(f, "Function"),
            ObjectType::Procedure => write!(f, "Procedure"),
        }
    }
}

/// Outcome of comparing one object or one facet of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComparisonStatus {
    #[default]
    Match,
    Mismatch,
    MissingInSource,
    MissingInTarget,
}

impl ComparisonStatus {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonStatus::Match)
    }

    /// Fold a facet status into an object's aggregate status.
    ///
    /// Anything other than `Match` collapses to `Mismatch`; whole-object
    /// absence is decided by the caller, never by folding facets.
    pub fn escalate(self, facet: ComparisonStatus) -> ComparisonStatus {
        if facet.is_match() {
            self
        } else {
            ComparisonStatus::Mismatch
        }
    }

    /// The same finding seen with source and target swapped
    pub fn reversed(self) -> ComparisonStatus {
        match self {
            ComparisonStatus::MissingInSource => ComparisonStatus::MissingInTarget,
            ComparisonStatus::MissingInTarget => ComparisonStatus::MissingInSource,
            other => other,
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComparisonStatus::Match => "Match",
            ComparisonStatus::Mismatch => "Mismatch",
            ComparisonStatus::MissingInSource => "MissingInSource",
            ComparisonStatus::MissingInTarget => "MissingInTarget",
        };
        write!(f, "{}", label)
    }
}

/// Structural facet a sub-result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    CreateScript,
    Columns,
    PrimaryKeys,
    ForeignKeys,
    Indexes,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Component::CreateScript => "CreateScript",
            Component::Columns => "Columns",
            Component::PrimaryKeys => "PrimaryKeys",
            Component::ForeignKeys => "ForeignKeys",
            Component::Indexes => "Indexes",
        };
        write!(f, "{}", label)
    }
}

/// One facet finding inside an object result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComparisonSubResult {
    pub component: Component,
    pub status: ComparisonStatus,
    pub details: String,
    /// Remediation script for this facet, if one can be prescribed
    pub create_script: Option<String>,
}

impl ComparisonSubResult {
    pub fn new(component: Component, status: ComparisonStatus, details: impl Into<String>) -> Self {
        Self {
            component,
            status,
            details: details.into(),
            create_script: None,
        }
    }

    pub fn with_script(mut self, script: Option<String>) -> Self {
        self.create_script = script.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn has_script(&self) -> bool {
        self.create_script
            .as_deref()
            .map_or(false, |script| !script.trim().is_empty())
    }
}

/// Comparison outcome for one table, function or procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComparisonResult {
    pub object_type: ObjectType,
    pub name: String,
    pub status: ComparisonStatus,
    pub details: String,
    pub diff_script: Option<String>,
    pub sub_results: Vec<ComparisonSubResult>,
}

impl ComparisonResult {
    pub fn new(object_type: ObjectType, name: &str) -> Self {
        Self {
            object_type,
            name: name.to_string(),
            status: ComparisonStatus::Match,
            details: String::new(),
            diff_script: None,
            sub_results: Vec::new(),
        }
    }

    /// Append a sub-result, escalating the aggregate status
    pub fn push(&mut self, sub_result: ComparisonSubResult) {
        self.status = self.status.escalate(sub_result.status);
        self.sub_results.push(sub_result);
    }

    pub fn sub_results_for(&self, component: Component) -> impl Iterator<Item = &ComparisonSubResult> {
        self.sub_results
            .iter()
            .filter(move |sub| sub.component == component)
    }
}

/// Counts of results per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComparisonSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub missing_in_source: usize,
    pub missing_in_target: usize,
}

/// A finished comparison run, as handed to the reporting layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComparisonReport {
    pub source: String,
    pub target: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<ComparisonResult>,
}

impl ComparisonReport {
    pub fn new(source: &str, target: &str, results: Vec<ComparisonResult>) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn summary(&self) -> ComparisonSummary {
        let mut summary = ComparisonSummary {
            total: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            match result.status {
                ComparisonStatus::Match => summary.matched += 1,
                ComparisonStatus::Mismatch => summary.mismatched += 1,
                ComparisonStatus::MissingInSource => summary.missing_in_source += 1,
                ComparisonStatus::MissingInTarget => summary.missing_in_target += 1,
            }
        }
        summary
    }

    /// True when every object matched
    pub fn is_in_sync(&self) -> bool {
        self.results.iter().all(|result| result.status.is_match())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mismatched_table() -> ComparisonResult {
        let mut result = ComparisonResult::new(ObjectType::Table, "orders");
        result.push(
            ComparisonSubResult::new(
                Component::Columns,
                ComparisonStatus::MissingInTarget,
                "Column total is missing in target",
            )
            .with_script(Some("ALTER TABLE \"orders\" ADD COLUMN \"total\" numeric;".to_string())),
        );
        result.push(ComparisonSubResult::new(
            Component::Indexes,
            ComparisonStatus::MissingInSource,
            "Index idx_orders_total exists only in target",
        ));
        result.diff_script = Some("-- Columns: MissingInTarget".to_string());
        result
    }

    #[test]
    fn test_status_aggregation_is_order_independent() {
        let facets = [
            ComparisonStatus::MissingInSource,
            ComparisonStatus::Match,
            ComparisonStatus::MissingInTarget,
        ];
        let forward = facets.iter().fold(ComparisonStatus::Match, |acc, s| acc.escalate(*s));
        let backward = facets.iter().rev().fold(ComparisonStatus::Match, |acc, s| acc.escalate(*s));

        assert_eq!(forward, ComparisonStatus::Mismatch);
        assert_eq!(forward, backward);
        assert_eq!(
            ComparisonStatus::Match.escalate(ComparisonStatus::Match),
            ComparisonStatus::Match
        );
    }

    #[test]
    fn test_push_escalates_status() {
        let result = mismatched_table();
        assert_eq!(result.status, ComparisonStatus::Mismatch);
        assert_eq!(result.sub_results_for(Component::Columns).count(), 1);
    }

    #[test]
    fn test_blank_script_is_dropped() {
        let sub = ComparisonSubResult::new(Component::Indexes, ComparisonStatus::Mismatch, "x")
            .with_script(Some("   ".to_string()));
        assert!(!sub.has_script());
        assert_eq!(sub.create_script, None);
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(mismatched_table()).unwrap();

        assert_eq!(value["ObjectType"], "Table");
        assert_eq!(value["Status"], "Mismatch");
        assert_eq!(value["SubResults"][0]["Component"], "Columns");
        assert_eq!(value["SubResults"][0]["Status"], "MissingInTarget");
        assert!(value["SubResults"][1]["CreateScript"].is_null());
        assert!(value["DiffScript"].is_string());
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let report = ComparisonReport::new("prod", "staging", vec![mismatched_table()]);
        let json = serde_json::to_string_pretty(&report).unwrap();
        let back: ComparisonReport = serde_json::from_str(&json).unwrap();

        assert_eq!(back, report);
    }

    #[test]
    fn test_summary_counts() {
        let mut missing = ComparisonResult::new(ObjectType::Function, "f(int)");
        missing.status = ComparisonStatus::MissingInTarget;
        let report = ComparisonReport::new(
            "a",
            "b",
            vec![
                mismatched_table(),
                missing,
                ComparisonResult::new(ObjectType::Table, "users"),
            ],
        );

        let summary = report.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.missing_in_target, 1);
        assert!(!report.is_in_sync());
    }
}
