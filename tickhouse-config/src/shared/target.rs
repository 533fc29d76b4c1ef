use serde::{Deserialize, Serialize};

use crate::SerializableSecretString;

/// Configuration for supported replication targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetConfig {
    /// In-memory target for ephemeral or test data.
    Memory {
        /// Database name used when resolving table declarations.
        database: String,
    },
    /// ClickHouse target configuration.
    ClickHouse {
        /// HTTP(S) endpoint of the ClickHouse server.
        url: String,
        /// Database that replicated tables are created in.
        database: String,
        /// Optional username for authentication.
        #[serde(skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        /// Optional password for authentication.
        #[serde(skip_serializing_if = "Option::is_none")]
        password: Option<SerializableSecretString>,
    },
}

impl TargetConfig {
    /// Returns the database replicated tables live in.
    pub fn database(&self) -> &str {
        match self {
            TargetConfig::Memory { database } => database,
            TargetConfig::ClickHouse { database, .. } => database,
        }
    }
}
