use async_trait::async_trait;

use crate::domain::ObservationSet;

/// Pull-based metrics registry the ingest use case publishes through.
///
/// Registering a name again replaces whatever that name currently exports;
/// implementations must never merge successive sets. Kept as a port so tests
/// can substitute a recording fake and assert exactly what was registered.
pub trait GaugeRegistry: Send + Sync {
    fn register_gauge(
        &self,
        name: &str,
        description: &str,
        values: ObservationSet,
    ) -> Result<(), String>;
}

/// Read side of the Prometheus-compatible workspace API.
#[async_trait]
pub trait WorkspaceQuery: Send + Sync {
    /// Every metric name currently present in the workspace.
    async fn metric_names(&self) -> Result<Vec<String>, String>;

    /// Series count for one metric name.
    async fn metric_cardinality(&self, name: &str) -> Result<u64, String>;
}

/// Destination queue for the next pipeline stage. One call publishes one
/// batch of serialized job bodies.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn send_batch(&self, bodies: Vec<String>) -> Result<(), String>;
}
