use std::time::Duration;

use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::ports::GaugeRegistry;
use crate::domain::{
    CountPayload, InvocationResponse, Observation, ObservationSet, CARDINALITY_GAUGE_DESCRIPTION,
    CARDINALITY_GAUGE_NAME,
};
use crate::error::{CardinalityError, Result};

const NO_EVENT_MESSAGE: &str = "No event provided";
const PROCESSED_MESSAGE: &str = "Processed records";

/// Use case for turning a queued batch of count records into an exported
/// cardinality gauge.
///
/// One invocation parses the whole batch up front, registers the resulting
/// observations under `metrics_cardinality_count`, then lingers for a grace
/// period so the export cycle can scrape the fresh values before the
/// environment is frozen. Parsing is all-or-nothing: a single bad record
/// fails the invocation before anything reaches the registry.
pub struct IngestUseCase {
    registry: Box<dyn GaugeRegistry>,
    flush_grace: Duration,
    shutdown: CancellationToken,
}

impl IngestUseCase {
    pub fn new(
        registry: Box<dyn GaugeRegistry>,
        flush_grace: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self { registry, flush_grace, shutdown }
    }

    pub async fn handle(&self, event: SqsEvent) -> Result<InvocationResponse> {
        if event.records.is_empty() {
            warn!("invoked without records");
            return Ok(InvocationResponse::new(404, NO_EVENT_MESSAGE));
        }

        let observations = parse_batch(&event.records)?;
        let values = ObservationSet::new(observations);

        info!(observations = values.len(), "registering cardinality gauge");
        self.registry
            .register_gauge(CARDINALITY_GAUGE_NAME, CARDINALITY_GAUGE_DESCRIPTION, values)
            .map_err(CardinalityError::Registry)?;

        self.drain().await;
        Ok(InvocationResponse::new(200, PROCESSED_MESSAGE))
    }

    /// Post-registration pause. A cancelled shutdown token cuts it short;
    /// registration has already happened by then, so the invocation still
    /// reports success.
    async fn drain(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.flush_grace) => {}
            _ = self.shutdown.cancelled() => {
                info!("flush grace period interrupted by shutdown");
            }
        }
    }
}

/// Decodes every record body, in input order, into one observation each.
/// The first malformed record aborts the batch; there is no per-message
/// isolation on the ingest path.
fn parse_batch(records: &[SqsMessage]) -> Result<Vec<Observation>> {
    let mut observations = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let body = record
            .body
            .as_deref()
            .ok_or(CardinalityError::MissingBody { index })?;
        info!(index, body, "consuming record");

        let payload: CountPayload = serde_json::from_str(body)
            .map_err(|err| CardinalityError::InvalidPayload { index, reason: err.to_string() })?;
        observations.push(Observation::for_payload(&payload));
    }
    Ok(observations)
}
