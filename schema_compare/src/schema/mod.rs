//! Schema module for SchemaCompare
//!
//! This module holds the schema model, the provider contract and the
//! comparators that turn two providers into comparison results.

pub mod canonical;
pub mod diff;
pub mod diff_script;
pub mod generator;
pub mod provider;
pub mod result;
pub mod routines;
pub mod snapshot;
pub mod types;

// Re-export key types
pub use canonical::Canonicalizer;
pub use diff::TableDiffer;
pub use generator::ScriptGenerator;
pub use provider::{DatabaseKind, SchemaProvider};
pub use result::{
    Component, ComparisonReport, ComparisonResult, ComparisonStatus, ComparisonSubResult,
    ComparisonSummary, ObjectType,
};
pub use routines::RoutineComparer;
pub use snapshot::{SchemaSnapshot, SnapshotProvider};
pub use types::{
    ColumnDefinition, DbFunctionDefinition, DbProcedureDefinition, ForeignKeyDefinition,
    IndexDefinition, PrimaryKeyDefinition, RoutineDefinition, RoutineKind, TableDefinition,
    TriggerDefinition, ViewDefinition,
};
