use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::shared::{JobConfig, SourceConfig, TargetConfig, ValidationError};

/// Complete configuration for the replicator service.
///
/// Aggregates the source, the target, and the replication jobs to run against
/// them. Typically loaded from configuration files at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    /// Configuration for the record source.
    pub source: SourceConfig,
    /// Configuration for the replication target.
    pub target: TargetConfig,
    /// Replication jobs to run concurrently.
    pub jobs: Vec<JobConfig>,
}

impl ReplicatorConfig {
    /// Validates the complete replicator configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.jobs.is_empty() {
            return Err(ValidationError::NoJobs);
        }

        let mut keys = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !keys.insert(job.key.as_str()) {
                return Err(ValidationError::DuplicateJobKey(job.key.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{NamingSchemeConfig, SpecConfig, WriteModeConfig};

    fn job(key: &str) -> JobConfig {
        JobConfig {
            key: key.to_string(),
            spec: SpecConfig::Stream("ticks".to_string()),
            table: "market_data".to_string(),
            naming: NamingSchemeConfig::TypeAndName,
            write_mode: WriteModeConfig::Append,
            include_partition_column: true,
            split_by_type: false,
            type_tables: Default::default(),
            flush_row_count: 1000,
            flush_interval_ms: 1000,
        }
    }

    fn config(jobs: Vec<JobConfig>) -> ReplicatorConfig {
        ReplicatorConfig {
            source: SourceConfig::Memory,
            target: TargetConfig::Memory {
                database: "ticks".to_string(),
            },
            jobs,
        }
    }

    #[test]
    fn test_validate_accepts_distinct_jobs() {
        let config = config(vec![job("a"), job("b")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_jobs() {
        let config = config(vec![]);
        assert!(matches!(config.validate(), Err(ValidationError::NoJobs)));
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let config = config(vec![job("a"), job("a")]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateJobKey(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_flush_rows() {
        let mut bad = job("a");
        bad.flush_row_count = 0;
        let config = config(vec![bad]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::FlushRowCountZero(_))
        ));
    }

    #[test]
    fn test_job_config_deserializes_with_defaults() {
        let raw = serde_json::json!({
            "key": "trades",
            "spec": { "stream": "ticks" },
            "table": "market_data",
            "flush_row_count": 500,
            "flush_interval_ms": 250
        });

        let job: JobConfig = serde_json::from_value(raw).unwrap();
        assert!(matches!(job.naming, NamingSchemeConfig::TypeAndName));
        assert!(matches!(job.write_mode, WriteModeConfig::Append));
        assert!(job.include_partition_column);
        assert!(!job.split_by_type);
        assert!(job.type_tables.is_empty());
    }
}
