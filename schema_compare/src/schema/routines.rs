//! Function and procedure comparison
//!
//! Routines are matched by signature key, so overloads with different
//! argument lists are separate objects. Definitions are compared in their
//! canonical form; the raw text is what ends up in the result.

use tracing::debug;

use crate::error::Result;
use crate::schema::canonical::Canonicalizer;
use crate::schema::diff_script::side_by_side;
use crate::schema::provider::SchemaProvider;
use crate::schema::result::{Component, ComparisonResult, ComparisonStatus, ComparisonSubResult, ObjectType};
use crate::schema::types::{RoutineDefinition, RoutineKind};

pub struct RoutineComparer<'a> {
    source: &'a dyn SchemaProvider,
    target: &'a dyn SchemaProvider,
    canonicalizer: &'a Canonicalizer,
}

impl<'a> RoutineComparer<'a> {
    pub fn new(
        source: &'a dyn SchemaProvider,
        target: &'a dyn SchemaProvider,
        canonicalizer: &'a Canonicalizer,
    ) -> Self {
        Self {
            source,
            target,
            canonicalizer,
        }
    }

    /// Compare one routine signature. A side that lacks it is `None`.
    pub async fn compare(
        &self,
        kind: RoutineKind,
        source: Option<&RoutineDefinition>,
        target: Option<&RoutineDefinition>,
    ) -> Result<ComparisonResult> {
        let name = source
            .or(target)
            .map(RoutineDefinition::signature)
            .unwrap_or_default();
        let mut result = ComparisonResult::new(ObjectType::from(kind), &name);

        match (source, target) {
            (Some(source_routine), Some(target_routine)) => {
                let (source_text, target_text) = futures::try_join!(
                    definition_of(self.source, kind, source_routine),
                    definition_of(self.target, kind, target_routine),
                )?;

                if self.canonicalizer.equivalent(&source_text, &target_text) {
                    result.details = format!("{} definitions match", kind);
                } else {
                    result.push(
                        ComparisonSubResult::new(
                            Component::CreateScript,
                            ComparisonStatus::Mismatch,
                            "Definitions differ after canonicalization",
                        )
                        .with_script(Some(source_text.clone())),
                    );
                    result.details = format!("{} {} differs between source and target", kind, name);
                    result.diff_script = Some(side_by_side(&source_text, &target_text));
                }
            }
            (Some(routine), None) => {
                let text = definition_of(self.source, kind, routine).await?;
                self.record_missing(&mut result, kind, ComparisonStatus::MissingInTarget, text);
            }
            (None, Some(routine)) => {
                let text = definition_of(self.target, kind, routine).await?;
                self.record_missing(&mut result, kind, ComparisonStatus::MissingInSource, text);
            }
            (None, None) => {}
        }

        debug!(routine = %name, kind = %kind, status = %result.status, "Compared routine");
        Ok(result)
    }

    fn record_missing(
        &self,
        result: &mut ComparisonResult,
        kind: RoutineKind,
        status: ComparisonStatus,
        text: String,
    ) {
        let side = match status {
            ComparisonStatus::MissingInTarget => "target",
            _ => "source",
        };
        let details = format!("{} {} is missing in {}", kind, result.name, side);

        result.push(
            ComparisonSubResult::new(Component::CreateScript, status, details.clone())
                .with_script(Some(text.clone())),
        );
        result.status = status;
        result.details = details;
        result.diff_script = Some(text).filter(|text| !text.trim().is_empty());
    }
}

/// Definition text of a listed routine, fetched only when the listing did not carry it
async fn definition_of(
    provider: &dyn SchemaProvider,
    kind: RoutineKind,
    routine: &RoutineDefinition,
) -> Result<String> {
    match routine.definition.as_deref() {
        Some(definition) if !definition.trim().is_empty() => Ok(definition.to_string()),
        _ => provider.get_routine_definition(kind, routine).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::provider::DatabaseKind;
    use crate::schema::snapshot::{SchemaSnapshot, SnapshotProvider};
    use pretty_assertions::assert_eq;

    fn provider(kind: DatabaseKind, functions: &[(&str, &str, &str)]) -> SnapshotProvider {
        let mut snapshot = SchemaSnapshot::new(kind);
        for (name, args, body) in functions {
            snapshot.add_routine(
                RoutineKind::Function,
                RoutineDefinition::new(name, args).with_definition(body),
            );
        }
        SnapshotProvider::new(snapshot)
    }

    #[tokio::test]
    async fn test_definer_and_comment_noise_is_ignored() {
        let source = provider(
            DatabaseKind::MySql,
            &[("calc_tax", "numeric", "CREATE FUNCTION calc_tax(amt numeric) RETURN amt*0.1")],
        );
        let target = provider(
            DatabaseKind::MySql,
            &[(
                "calc_tax",
                "numeric",
                "CREATE DEFINER=`admin`@`localhost` FUNCTION calc_tax(amt numeric) RETURN amt*0.1 -- v2",
            )],
        );
        let canonicalizer = Canonicalizer::new(DatabaseKind::MySql, true);
        let comparer = RoutineComparer::new(&source, &target, &canonicalizer);
        let routine = RoutineDefinition::new("calc_tax", "numeric");

        let result = comparer
            .compare(RoutineKind::Function, Some(&routine), Some(&routine))
            .await
            .unwrap();

        assert_eq!(result.status, ComparisonStatus::Match);
        assert_eq!(result.diff_script, None);
        assert_eq!(result.object_type, ObjectType::Function);
    }

    #[tokio::test]
    async fn test_body_change_embeds_both_raw_definitions() {
        let source = provider(DatabaseKind::Postgres, &[("f", "integer", "SELECT 1")]);
        let target = provider(DatabaseKind::Postgres, &[("f", "integer", "SELECT  2")]);
        let canonicalizer = Canonicalizer::new(DatabaseKind::Postgres, true);
        let comparer = RoutineComparer::new(&source, &target, &canonicalizer);
        let routine = RoutineDefinition::new("f", "integer");

        let result = comparer
            .compare(RoutineKind::Function, Some(&routine), Some(&routine))
            .await
            .unwrap();

        assert_eq!(result.status, ComparisonStatus::Mismatch);
        assert_eq!(
            result.diff_script.as_deref(),
            Some("-- SOURCE\nSELECT 1\n\n-- TARGET\nSELECT  2")
        );
    }

    #[tokio::test]
    async fn test_missing_routine_carries_raw_definition() {
        let source = provider(DatabaseKind::Postgres, &[]);
        let target = provider(DatabaseKind::Postgres, &[("audit", "", "SELECT now()")]);
        let canonicalizer = Canonicalizer::new(DatabaseKind::Postgres, true);
        let comparer = RoutineComparer::new(&source, &target, &canonicalizer);
        let routine = RoutineDefinition::new("audit", "");

        let result = comparer
            .compare(RoutineKind::Function, None, Some(&routine))
            .await
            .unwrap();

        assert_eq!(result.status, ComparisonStatus::MissingInSource);
        assert_eq!(result.name, "audit()");
        assert_eq!(result.diff_script.as_deref(), Some("SELECT now()"));
    }
}
