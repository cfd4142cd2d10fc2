//! Data shapes shared across the pipeline stages.
//!
//! The queue payloads keep the camelCase field names the functions have always
//! exchanged, so a deployment can roll stages over one at a time.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Gauge the ingest function exports.
pub const CARDINALITY_GAUGE_NAME: &str = "metrics_cardinality_count";
pub const CARDINALITY_GAUGE_DESCRIPTION: &str =
    "Cardinality count for top N metrics in the workspace";

/// Attribute key carrying the metric name on every exported value.
pub const METRIC_NAME_ATTRIBUTE: &str = "metric_name";

/// One counting job produced by discovery: a metric name plus how many names
/// the workspace had in total at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricNameJob {
    pub name: String,
    #[serde(rename = "totalMetricsCount", default)]
    pub total_metrics_count: u64,
}

/// Cardinality measured for a single metric name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCardinality {
    pub name: String,
    pub count: u64,
    #[serde(rename = "totalMetricsCount", default)]
    pub total_metrics_count: u64,
}

/// What the ingest function requires of a queue record body. Extra fields
/// (such as `totalMetricsCount` from aggregation) are tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CountPayload {
    pub name: String,
    #[serde(deserialize_with = "coerce_count")]
    pub count: u64,
}

/// `count` arrives as a JSON integer from the aggregation stage, but the
/// contract also admits numeric strings. Anything else is a parse error;
/// floats are rejected rather than truncated because every producer in the
/// pipeline emits integers.
fn coerce_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(number) => number
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("count {number} is not a non-negative integer"))),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| D::Error::custom(format!("count {text:?} is not a non-negative integer"))),
        other => Err(D::Error::custom(format!(
            "count must be a number or numeric string, got {other}"
        ))),
    }
}

/// A single gauge value with its attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub value: u64,
    pub attributes: BTreeMap<String, String>,
}

impl Observation {
    /// The observation exported for one parsed payload.
    pub fn for_payload(payload: &CountPayload) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(METRIC_NAME_ATTRIBUTE.to_owned(), payload.name.clone());
        Self { value: payload.count, attributes }
    }
}

/// Immutable set of observations captured at registration time and replayed,
/// unchanged, on every scrape until the next registration supersedes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// The captured observations, in the order they were parsed.
    pub fn snapshot(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Lambda proxy-style response returned by the ingest function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    /// `body` carries the message as a JSON-encoded string, per the proxy
    /// integration convention.
    pub fn new(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: serde_json::Value::String(message.to_owned()).to_string(),
        }
    }
}
