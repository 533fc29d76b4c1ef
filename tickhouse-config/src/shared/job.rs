use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// What a replication job reads from the source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecConfig {
    /// Replicate a whole named stream.
    Stream(String),
    /// Replicate the result of a source-side query.
    Query(String),
}

/// How resolved column names are built from source field descriptors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingSchemeConfig {
    TypeAndName,
    Name,
    NameAndDatatype,
}

/// How existing target tables are treated when a replication run starts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteModeConfig {
    /// Resume from the maximum already-replicated timestamp.
    Append,
    /// Drop and recreate the target tables.
    Rewrite,
}

/// Configuration for a single replication job.
///
/// A job binds a source selection to a target table layout plus the batching
/// parameters for the streaming loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique identifier for this job within the replicator instance.
    pub key: String,
    /// Source selection this job replicates.
    pub spec: SpecConfig,
    /// Base target table name.
    pub table: String,
    /// Column naming scheme.
    #[serde(default = "default_naming")]
    pub naming: NamingSchemeConfig,
    /// Write mode for existing tables.
    #[serde(default = "default_write_mode")]
    pub write_mode: WriteModeConfig,
    /// Whether tables carry a materialized partition date column.
    #[serde(default = "default_true")]
    pub include_partition_column: bool,
    /// Route each record type into its own table instead of one union table.
    #[serde(default)]
    pub split_by_type: bool,
    /// Explicit record type name to table name overrides.
    #[serde(default)]
    pub type_tables: HashMap<String, String>,
    /// Flush the batch once it holds at least this many rows.
    pub flush_row_count: usize,
    /// Flush the batch once this many milliseconds have elapsed since the
    /// previous flush.
    pub flush_interval_ms: u64,
}

fn default_naming() -> NamingSchemeConfig {
    NamingSchemeConfig::TypeAndName
}

fn default_write_mode() -> WriteModeConfig {
    WriteModeConfig::Append
}

fn default_true() -> bool {
    true
}

impl JobConfig {
    /// Validates batching parameters for this job.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::EmptyJobKey);
        }
        if self.flush_row_count == 0 {
            return Err(ValidationError::FlushRowCountZero(self.key.clone()));
        }
        if self.flush_interval_ms == 0 {
            return Err(ValidationError::FlushIntervalZero(self.key.clone()));
        }

        Ok(())
    }
}
