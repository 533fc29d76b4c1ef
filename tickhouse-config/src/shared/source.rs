use serde::{Deserialize, Serialize};

/// Configuration for supported record sources.
///
/// Specifies where the replicator reads record types and records from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfig {
    /// In-memory source for ephemeral or test data.
    Memory,
    /// File-backed source reading a JSON schema file and newline-delimited
    /// JSON records.
    File {
        /// Path to the JSON file describing the record types.
        schema_path: String,
        /// Path to the newline-delimited JSON records file.
        records_path: String,
    },
}
