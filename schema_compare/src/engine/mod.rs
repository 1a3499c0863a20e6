//! Comparison engine
//!
//! Drives a full run: tables first, then functions, then procedures. Objects
//! are compared one at a time; only the fetches for a single object run
//! concurrently.

pub mod progress;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::ComparisonConfig;
use crate::error::{Error, Result};
use crate::schema::canonical::Canonicalizer;
use crate::schema::diff::{DiffContext, TableDiffer};
use crate::schema::generator::ScriptGenerator;
use crate::schema::provider::SchemaProvider;
use crate::schema::result::ComparisonResult;
use crate::schema::routines::RoutineComparer;
use crate::schema::types::{RoutineDefinition, RoutineKind, TableDefinition};
use crate::utils::naming::match_key;

pub use progress::{ChannelProgressListener, ProgressEvent, ProgressListener, TracingProgressListener};

/// Options for one comparison run
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Strip ownership, grants, comments and schema prefixes before comparing text
    pub ignore_ownership: bool,
    /// Compare only the first N source objects of each kind
    pub sample_size: Option<usize>,
    pub compare_tables: bool,
    pub compare_functions: bool,
    pub compare_procedures: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self::from(&ComparisonConfig::default())
    }
}

impl From<&ComparisonConfig> for CompareOptions {
    fn from(config: &ComparisonConfig) -> Self {
        Self {
            ignore_ownership: config.ignore_ownership,
            sample_size: config.sample_size,
            compare_tables: config.compare_tables,
            compare_functions: config.compare_functions,
            compare_procedures: config.compare_procedures,
        }
    }
}

/// Compares everything one provider exposes against another
pub struct SchemaComparer<'a> {
    source: &'a dyn SchemaProvider,
    target: &'a dyn SchemaProvider,
    options: CompareOptions,
    canonicalizer: Canonicalizer,
    generator: ScriptGenerator,
    listener: Option<&'a dyn ProgressListener>,
}

impl<'a> SchemaComparer<'a> {
    /// Create a comparer. Both providers must speak the same dialect.
    pub fn new(
        source: &'a dyn SchemaProvider,
        target: &'a dyn SchemaProvider,
        options: CompareOptions,
    ) -> Result<Self> {
        if source.kind() != target.kind() {
            return Err(Error::ConfigError(format!(
                "Cannot compare a {} source with a {} target",
                source.kind(),
                target.kind()
            )));
        }

        let kind = source.kind();
        let canonicalizer = Canonicalizer::new(kind, options.ignore_ownership)
            .with_schemas(source.schema_name().into_iter().chain(target.schema_name()));

        Ok(Self {
            source,
            target,
            options,
            canonicalizer,
            generator: ScriptGenerator::new(kind),
            listener: None,
        })
    }

    pub fn with_listener(mut self, listener: &'a dyn ProgressListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Run the full comparison
    pub async fn compare(&self) -> Result<Vec<ComparisonResult>> {
        let mut results = Vec::new();
        self.compare_into(&mut results).await?;
        Ok(results)
    }

    /// Run the full comparison, appending to `results` as objects finish.
    ///
    /// On error, `results` keeps everything compared before the failure.
    pub async fn compare_into(&self, results: &mut Vec<ComparisonResult>) -> Result<()> {
        if self.options.compare_tables {
            self.compare_tables(results).await?;
        }
        if self.options.compare_functions {
            self.compare_routines(RoutineKind::Function, results).await?;
        }
        if self.options.compare_procedures {
            self.compare_routines(RoutineKind::Procedure, results).await?;
        }

        info!(results = results.len(), "Comparison finished");
        Ok(())
    }

    /// Compare every table, appending one result per table
    pub async fn compare_tables(&self, results: &mut Vec<ComparisonResult>) -> Result<()> {
        let (source_tables, target_tables) =
            futures::try_join!(self.source.list_tables(), self.target.list_tables())?;

        let pairs = pair_objects(
            source_tables,
            target_tables,
            |name| match_key(name),
            self.options.sample_size,
        );

        let total = pairs.len();
        self.emit(ProgressEvent::info(format!("Comparing {} tables", total)));
        info!(tables = total, "Comparing tables");

        for (i, (source, target)) in pairs.into_iter().enumerate() {
            let result = self.compare_table(source.as_deref(), target.as_deref()).await?;
            let label = result.name.clone();
            results.push(result);
            self.emit(ProgressEvent::tick(i + 1, total, label));
        }

        Ok(())
    }

    /// Compare one table by name. `None` marks the side that lacks it.
    pub async fn compare_table(
        &self,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<ComparisonResult> {
        let (source_table, target_table) = futures::try_join!(
            fetch_table(self.source, source),
            fetch_table(self.target, target),
        )?;

        let context = DiffContext {
            source: self.source,
            target: self.target,
            generator: self.generator,
        };

        TableDiffer::new(context, &self.canonicalizer)
            .compare(source_table.as_ref(), target_table.as_ref())
            .await
    }

    /// Compare every routine of one kind, matched by signature
    pub async fn compare_routines(
        &self,
        kind: RoutineKind,
        results: &mut Vec<ComparisonResult>,
    ) -> Result<()> {
        let (source_routines, target_routines) = futures::try_join!(
            self.source.list_routines(kind),
            self.target.list_routines(kind),
        )?;

        let pairs = pair_objects(
            source_routines,
            target_routines,
            RoutineDefinition::signature_key,
            self.options.sample_size,
        );

        let total = pairs.len();
        let label = match kind {
            RoutineKind::Function => "functions",
            RoutineKind::Procedure => "procedures",
        };
        self.emit(ProgressEvent::info(format!("Comparing {} {}", total, label)));
        info!(kind = %kind, count = total, "Comparing routines");

        let comparer = RoutineComparer::new(self.source, self.target, &self.canonicalizer);
        for (i, (source, target)) in pairs.into_iter().enumerate() {
            let result = comparer.compare(kind, source.as_ref(), target.as_ref()).await?;
            let name = result.name.clone();
            results.push(result);
            self.emit(ProgressEvent::tick(i + 1, total, name));
        }

        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(listener) = self.listener {
            listener.on_progress(event);
        }
    }
}

async fn fetch_table(provider: &dyn SchemaProvider, name: Option<&str>) -> Result<Option<TableDefinition>> {
    match name {
        Some(name) => {
            debug!(table = %name, "Fetching table definition");
            Ok(Some(provider.get_table_definition(name).await?))
        }
        None => Ok(None),
    }
}

/// Pair source and target objects by case-insensitive key.
///
/// Source order comes first, then objects only the target has. Duplicate keys
/// on one side keep the first entry. With a sample size, the source set is
/// truncated and the target set is filtered to the sampled keys, so a sampled
/// run never reports a sampled-out object as missing.
pub(crate) fn pair_objects<T, K>(
    source: Vec<T>,
    target: Vec<T>,
    key: K,
    sample_size: Option<usize>,
) -> Vec<(Option<T>, Option<T>)>
where
    K: Fn(&T) -> String,
{
    let mut source_map: IndexMap<String, T> = IndexMap::new();
    for item in source {
        source_map.entry(key(&item)).or_insert(item);
    }
    let mut target_map: IndexMap<String, T> = IndexMap::new();
    for item in target {
        target_map.entry(key(&item)).or_insert(item);
    }

    if let Some(size) = sample_size {
        source_map.truncate(size);
        target_map.retain(|k, _| source_map.contains_key(k));
    }

    let mut pairs: Vec<(Option<T>, Option<T>)> = source_map
        .into_iter()
        .map(|(k, item)| {
            let counterpart = target_map.shift_remove(&k);
            (Some(item), counterpart)
        })
        .collect();
    pairs.extend(target_map.into_values().map(|item| (None, Some(item))));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairs_case_insensitively() {
        let pairs = pair_objects(
            names(&["Orders", "customers"]),
            names(&["orders", "audit_log"]),
            |name| match_key(name),
            None,
        );

        assert_eq!(
            pairs,
            vec![
                (Some("Orders".to_string()), Some("orders".to_string())),
                (Some("customers".to_string()), None),
                (None, Some("audit_log".to_string())),
            ]
        );
    }

    #[test]
    fn test_first_duplicate_wins() {
        let pairs = pair_objects(names(&["a", "A"]), names(&[]), |name| match_key(name), None);
        assert_eq!(pairs, vec![(Some("a".to_string()), None)]);
    }

    #[test]
    fn test_sampling_filters_target() {
        let pairs = pair_objects(
            names(&["a", "b", "c"]),
            names(&["c", "b", "a", "z"]),
            |name| match_key(name),
            Some(2),
        );

        assert_eq!(
            pairs,
            vec![
                (Some("a".to_string()), Some("a".to_string())),
                (Some("b".to_string()), Some("b".to_string())),
            ]
        );
    }
}
