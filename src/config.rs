use std::env;
use std::time::Duration;

use crate::error::{CardinalityError, Result};

/// How many metrics the aggregation stage forwards when the environment
/// does not say otherwise.
pub const DEFAULT_TOP_N: usize = 10;

const DEFAULT_FLUSH_GRACE_MS: u64 = 2000;
const DEFAULT_EXPORT_INTERVAL_MS: u64 = 1000;
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Coordinates of the Managed Prometheus workspace the query-side functions
/// talk to.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub workspace_id: String,
    pub region: String,
}

impl WorkspaceConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            workspace_id: require("AMP_WORKSPACE_ID")?,
            region: require("AWS_REGION")?,
        })
    }
}

/// Settings for the discovery function.
#[derive(Debug, Clone)]
pub struct DiscoverConfig {
    pub workspace: WorkspaceConfig,
    pub jobs_queue_url: String,
}

impl DiscoverConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            workspace: WorkspaceConfig::from_env()?,
            jobs_queue_url: require("SQS_QUEUE_URL")?,
        })
    }
}

/// Settings for the per-metric counting function.
#[derive(Debug, Clone)]
pub struct CountConfig {
    pub workspace: WorkspaceConfig,
    pub results_queue_url: String,
}

impl CountConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            workspace: WorkspaceConfig::from_env()?,
            results_queue_url: require("SQS_QUEUE_URL")?,
        })
    }
}

/// Settings for the aggregation function.
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub ingest_queue_url: String,
    pub top_n: usize,
}

impl AggregateConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ingest_queue_url: require("INGEST_QUEUE_URL")?,
            top_n: top_n_from(env::var("TOPN_CARDINALITY_VALUE").ok()),
        })
    }
}

/// Settings for the ingest function.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// How long the handler lingers after registration so an export cycle
    /// can pick up the fresh values.
    pub flush_grace: Duration,
    pub otlp_endpoint: String,
    pub export_interval: Duration,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            flush_grace: duration_from(
                env::var("INGEST_FLUSH_GRACE_MS").ok(),
                DEFAULT_FLUSH_GRACE_MS,
            ),
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_owned()),
            export_interval: duration_from(
                env::var("OTEL_METRIC_EXPORT_INTERVAL").ok(),
                DEFAULT_EXPORT_INTERVAL_MS,
            ),
        })
    }
}

fn require(name: &'static str) -> Result<String> {
    env::var(name).map_err(|_| CardinalityError::Config(format!("{name} is not set")))
}

/// Unset or non-numeric values fall back to the default rather than failing
/// the invocation.
fn top_n_from(raw: Option<String>) -> usize {
    raw.and_then(|value| value.parse().ok()).unwrap_or(DEFAULT_TOP_N)
}

fn duration_from(raw: Option<String>, default_ms: u64) -> Duration {
    Duration::from_millis(raw.and_then(|value| value.parse().ok()).unwrap_or(default_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_parses_value() {
        assert_eq!(top_n_from(Some("25".to_owned())), 25);
    }

    #[test]
    fn test_top_n_defaults_when_unset() {
        assert_eq!(top_n_from(None), DEFAULT_TOP_N);
    }

    #[test]
    fn test_top_n_defaults_when_not_numeric() {
        assert_eq!(top_n_from(Some("ten".to_owned())), DEFAULT_TOP_N);
    }

    #[test]
    fn test_duration_parses_millis() {
        assert_eq!(
            duration_from(Some("250".to_owned()), DEFAULT_FLUSH_GRACE_MS),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_duration_defaults_when_invalid() {
        assert_eq!(
            duration_from(Some("soon".to_owned()), DEFAULT_FLUSH_GRACE_MS),
            Duration::from_millis(DEFAULT_FLUSH_GRACE_MS)
        );
        assert_eq!(
            duration_from(None, DEFAULT_EXPORT_INTERVAL_MS),
            Duration::from_millis(DEFAULT_EXPORT_INTERVAL_MS)
        );
    }
}
