use aws_lambda_events::event::sqs::SqsEvent;
use tracing::{debug, info, warn};

use crate::app::ports::{JobQueue, WorkspaceQuery};
use crate::domain::{MetricCardinality, MetricNameJob};
use crate::error::{CardinalityError, Result};

/// Use case for the counting function: measure the series cardinality of
/// each queued metric name and forward the non-zero measurements to the
/// aggregation queue.
///
/// Unlike ingest, this stage isolates failures per record: a job that fails
/// to decode or to query is logged and skipped, never aborting its
/// neighbors.
pub struct CountUseCase {
    workspace: Box<dyn WorkspaceQuery>,
    queue: Box<dyn JobQueue>,
}

impl CountUseCase {
    pub fn new(workspace: Box<dyn WorkspaceQuery>, queue: Box<dyn JobQueue>) -> Self {
        Self { workspace, queue }
    }

    /// Returns how many measurements were forwarded.
    pub async fn handle(&self, event: SqsEvent) -> Result<usize> {
        let mut measured: Vec<MetricCardinality> = Vec::new();

        for (index, record) in event.records.iter().enumerate() {
            let Some(body) = record.body.as_deref() else {
                warn!(index, "skipping record with no body");
                continue;
            };
            let job: MetricNameJob = match serde_json::from_str(body) {
                Ok(job) => job,
                Err(err) => {
                    warn!(index, error = %err, "skipping malformed job");
                    continue;
                }
            };
            let count = match self.workspace.metric_cardinality(&job.name).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(name = %job.name, error = %err, "cardinality query failed");
                    continue;
                }
            };
            if count == 0 {
                debug!(name = %job.name, "metric has no series, dropping");
                continue;
            }
            measured.push(MetricCardinality {
                name: job.name,
                count,
                total_metrics_count: job.total_metrics_count,
            });
        }

        if measured.is_empty() {
            info!("no cardinalities to forward");
            return Ok(0);
        }

        // A trigger batch is at most ten records, so one send always fits.
        let bodies: Vec<String> = measured
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<_, _>>()?;
        self.queue
            .send_batch(bodies)
            .await
            .map_err(CardinalityError::Queue)?;

        info!(forwarded = measured.len(), "queued cardinality measurements");
        Ok(measured.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aws_lambda_events::event::sqs::SqsMessage;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct FakeWorkspace {
        cardinalities: HashMap<String, u64>,
    }

    #[async_trait]
    impl WorkspaceQuery for FakeWorkspace {
        async fn metric_names(&self) -> std::result::Result<Vec<String>, String> {
            Ok(self.cardinalities.keys().cloned().collect())
        }

        async fn metric_cardinality(&self, name: &str) -> std::result::Result<u64, String> {
            self.cardinalities
                .get(name)
                .copied()
                .ok_or_else(|| format!("empty result for {name}"))
        }
    }

    struct FakeQueue {
        batches: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl JobQueue for FakeQueue {
        async fn send_batch(&self, bodies: Vec<String>) -> std::result::Result<(), String> {
            self.batches.lock().await.push(bodies);
            Ok(())
        }
    }

    fn job_event(jobs: &[(&str, u64)]) -> SqsEvent {
        SqsEvent {
            records: jobs
                .iter()
                .map(|(name, total)| {
                    let body = serde_json::to_string(&MetricNameJob {
                        name: (*name).to_owned(),
                        total_metrics_count: *total,
                    })
                    .unwrap();
                    SqsMessage { body: Some(body), ..Default::default() }
                })
                .collect(),
        }
    }

    fn workspace(entries: &[(&str, u64)]) -> FakeWorkspace {
        FakeWorkspace {
            cardinalities: entries
                .iter()
                .map(|(name, count)| ((*name).to_owned(), *count))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_forwards_measurements_with_total_passthrough() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = CountUseCase::new(
            Box::new(workspace(&[("up", 12), ("api_requests", 7)])),
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
        );

        let forwarded = use_case
            .handle(job_event(&[("up", 40), ("api_requests", 40)]))
            .await
            .unwrap();

        assert_eq!(forwarded, 2);
        let sent = batches.lock().await;
        assert_eq!(sent.len(), 1);

        let first: MetricCardinality = serde_json::from_str(&sent[0][0]).unwrap();
        assert_eq!(first.name, "up");
        assert_eq!(first.count, 12);
        assert_eq!(first.total_metrics_count, 40);
    }

    #[tokio::test]
    async fn test_skips_malformed_and_unanswerable_records() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = CountUseCase::new(
            Box::new(workspace(&[("up", 3)])),
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
        );

        let mut event = job_event(&[("up", 5), ("unknown_metric", 5)]);
        event.records.push(SqsMessage {
            body: Some("{broken".to_owned()),
            ..Default::default()
        });
        event.records.push(SqsMessage::default());

        let forwarded = use_case.handle(event).await.unwrap();

        assert_eq!(forwarded, 1);
        let sent = batches.lock().await;
        let only: MetricCardinality = serde_json::from_str(&sent[0][0]).unwrap();
        assert_eq!(only.name, "up");
    }

    #[tokio::test]
    async fn test_drops_zero_cardinality_metrics() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = CountUseCase::new(
            Box::new(workspace(&[("gone_metric", 0), ("up", 2)])),
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
        );

        let forwarded = use_case
            .handle(job_event(&[("gone_metric", 2), ("up", 2)]))
            .await
            .unwrap();

        assert_eq!(forwarded, 1);
    }

    #[tokio::test]
    async fn test_nothing_measured_sends_nothing() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = CountUseCase::new(
            Box::new(workspace(&[])),
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
        );

        let forwarded = use_case.handle(job_event(&[("up", 1)])).await.unwrap();

        assert_eq!(forwarded, 0);
        assert!(batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_failure_fails_invocation() {
        struct RejectingQueue;

        #[async_trait]
        impl JobQueue for RejectingQueue {
            async fn send_batch(&self, _bodies: Vec<String>) -> std::result::Result<(), String> {
                Err("queue unavailable".to_owned())
            }
        }

        let use_case = CountUseCase::new(
            Box::new(workspace(&[("up", 3)])),
            Box::new(RejectingQueue),
        );

        let result = use_case.handle(job_event(&[("up", 1)])).await;
        assert!(matches!(result, Err(CardinalityError::Queue(_))));
    }
}
