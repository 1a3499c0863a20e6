//! SchemaCompare: compares two database schemas and scripts the differences
//!
//! SchemaCompare reads the structure of a source and a target database (live
//! or from a snapshot), compares tables, functions and procedures, and
//! produces per-object results with reviewable remediation SQL.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use engine::{
    ChannelProgressListener, CompareOptions, ProgressEvent, ProgressListener, SchemaComparer,
    TracingProgressListener,
};
pub use error::{Error, Result};
pub use schema::provider::{DatabaseKind, SchemaProvider};
pub use schema::result::{ComparisonReport, ComparisonResult, ComparisonStatus};
pub use schema::snapshot::{SchemaSnapshot, SnapshotProvider};

use tracing::info;

/// Initialize SchemaCompare with the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaCompareClient> {
    let config = config::load_from_file(config_path)?;
    SchemaCompareClient::new(config).await
}

/// Which configured database a call refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// The main client for interacting with SchemaCompare
pub struct SchemaCompareClient {
    config: Config,
    source: Box<dyn SchemaProvider>,
    target: Box<dyn SchemaProvider>,
}

impl SchemaCompareClient {
    /// Create a new client from configuration, opening both sides
    pub async fn new(config: Config) -> Result<Self> {
        let source = db::connect_provider(&config.source).await?;
        let target = db::connect_provider(&config.target).await?;
        Self::with_providers(config, source, target)
    }

    /// Create a client over providers that are already open
    pub fn with_providers(
        config: Config,
        source: Box<dyn SchemaProvider>,
        target: Box<dyn SchemaProvider>,
    ) -> Result<Self> {
        // Snapshot sides only reveal their dialect once loaded
        if source.kind() != target.kind() {
            return Err(Error::ConfigError(format!(
                "Source ({}) and target ({}) must use the same database kind",
                source.kind(),
                target.kind()
            )));
        }

        Ok(Self {
            config,
            source,
            target,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self, side: Side) -> &dyn SchemaProvider {
        match side {
            Side::Source => self.source.as_ref(),
            Side::Target => self.target.as_ref(),
        }
    }

    /// Compare source against target using the configured options
    pub async fn compare(&self, listener: Option<&dyn ProgressListener>) -> Result<ComparisonReport> {
        let options = CompareOptions::from(&self.config.comparison);
        let mut comparer = SchemaComparer::new(self.source.as_ref(), self.target.as_ref(), options)?;
        if let Some(listener) = listener {
            comparer = comparer.with_listener(listener);
        }

        let results = comparer.compare().await?;
        let report = ComparisonReport::new(
            &self.config.source.label(),
            &self.config.target.label(),
            results,
        );

        let summary = report.summary();
        info!(
            total = summary.total,
            matched = summary.matched,
            mismatched = summary.mismatched,
            missing_in_source = summary.missing_in_source,
            missing_in_target = summary.missing_in_target,
            "Comparison complete"
        );

        Ok(report)
    }

    /// Capture one side into a snapshot
    pub async fn snapshot(&self, side: Side) -> Result<SchemaSnapshot> {
        SchemaSnapshot::capture(self.provider(side)).await
    }
}
