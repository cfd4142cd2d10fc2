use std::collections::HashMap;

use aws_lambda_events::event::sqs::SqsEvent;
use tracing::{error, info, warn};

use crate::app::ports::JobQueue;
use crate::domain::MetricCardinality;
use crate::error::Result;

/// Use case for the aggregation function: deduplicate the measurements that
/// arrived in this batch, keep the top N by cardinality, and queue the
/// winners for ingestion.
pub struct AggregateUseCase {
    queue: Box<dyn JobQueue>,
    top_n: usize,
}

impl AggregateUseCase {
    pub fn new(queue: Box<dyn JobQueue>, top_n: usize) -> Self {
        Self { queue, top_n }
    }

    /// Returns how many winners were queued. Publish failures are logged but
    /// do not fail the invocation: redriving consumed measurements would
    /// only produce duplicate ingestion.
    pub async fn handle(&self, event: SqsEvent) -> Result<usize> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        let mut total_metrics_count = 0;

        for (index, record) in event.records.iter().enumerate() {
            let Some(body) = record.body.as_deref() else {
                warn!(index, "skipping record with no body");
                continue;
            };
            match serde_json::from_str::<MetricCardinality>(body) {
                Ok(measurement) => {
                    total_metrics_count = measurement.total_metrics_count;
                    counts.insert(measurement.name, measurement.count);
                }
                Err(err) => warn!(index, error = %err, "skipping malformed measurement"),
            }
        }

        info!(
            total_metrics_count,
            deduplicated = counts.len(),
            "aggregated batch"
        );

        let winners = top_n(counts, self.top_n);
        if winners.is_empty() {
            return Ok(0);
        }

        let bodies: Vec<String> = winners
            .iter()
            .map(|(name, count)| {
                serde_json::to_string(&MetricCardinality {
                    name: name.clone(),
                    count: *count,
                    total_metrics_count,
                })
            })
            .collect::<std::result::Result<_, _>>()?;

        let queued = bodies.len();
        if let Err(err) = self.queue.send_batch(bodies).await {
            error!(error = %err, "failed queueing winners for ingestion");
            return Ok(0);
        }

        info!(queued, "queued top cardinalities for ingestion");
        Ok(queued)
    }
}

/// Highest counts first, at most `n` entries. Ties break on name so the
/// selection is deterministic.
pub fn top_n(counts: HashMap<String, u64>, n: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aws_lambda_events::event::sqs::SqsMessage;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn counts(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries
            .iter()
            .map(|(name, count)| ((*name).to_owned(), *count))
            .collect()
    }

    #[test]
    fn test_top_n_empty_list() {
        assert!(top_n(HashMap::new(), 5).is_empty());
    }

    #[test]
    fn test_top_n_shorter_than_n_keeps_everything_sorted() {
        let ranked = top_n(counts(&[("a", 1), ("b", 50), ("c", 15)]), 5);
        assert_eq!(
            ranked,
            vec![
                ("b".to_owned(), 50),
                ("c".to_owned(), 15),
                ("a".to_owned(), 1),
            ]
        );
    }

    #[test]
    fn test_top_n_truncates_to_n() {
        let ranked = top_n(
            counts(&[
                ("a", 1),
                ("b", 50),
                ("c", 15),
                ("d", 80),
                ("e", 6),
                ("f", 90),
                ("g", 26),
            ]),
            5,
        );
        assert_eq!(
            ranked,
            vec![
                ("f".to_owned(), 90),
                ("d".to_owned(), 80),
                ("b".to_owned(), 50),
                ("g".to_owned(), 26),
                ("c".to_owned(), 15),
            ]
        );
    }

    #[test]
    fn test_top_n_breaks_ties_by_name() {
        let ranked = top_n(counts(&[("z", 5), ("a", 5), ("m", 5)]), 2);
        assert_eq!(ranked, vec![("a".to_owned(), 5), ("m".to_owned(), 5)]);
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

    fn measurement_event(measurements: &[(&str, u64, u64)]) -> SqsEvent {
        SqsEvent {
            records: measurements
                .iter()
                .map(|(name, count, total)| {
                    let body = serde_json::to_string(&MetricCardinality {
                        name: (*name).to_owned(),
                        count: *count,
                        total_metrics_count: *total,
                    })
                    .unwrap();
                    SqsMessage { body: Some(body), ..Default::default() }
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_deduplicates_by_name_last_wins() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = AggregateUseCase::new(
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
            10,
        );

        let queued = use_case
            .handle(measurement_event(&[
                ("up", 3, 40),
                ("up", 9, 40),
                ("api_requests", 5, 40),
            ]))
            .await
            .unwrap();

        assert_eq!(queued, 2);
        let sent = batches.lock().await;
        let decoded: Vec<MetricCardinality> = sent[0]
            .iter()
            .map(|body| serde_json::from_str(body).unwrap())
            .collect();
        assert_eq!(decoded[0].name, "up");
        assert_eq!(decoded[0].count, 9);
        assert_eq!(decoded[0].total_metrics_count, 40);
    }

    #[tokio::test]
    async fn test_honors_top_n_limit() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = AggregateUseCase::new(
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
            2,
        );

        let queued = use_case
            .handle(measurement_event(&[
                ("a", 1, 9),
                ("b", 50, 9),
                ("c", 15, 9),
            ]))
            .await
            .unwrap();

        assert_eq!(queued, 2);
        let sent = batches.lock().await;
        let names: Vec<String> = sent[0]
            .iter()
            .map(|body| serde_json::from_str::<MetricCardinality>(body).unwrap().name)
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_malformed_records_are_skipped() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = AggregateUseCase::new(
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
            10,
        );

        let mut event = measurement_event(&[("up", 3, 7)]);
        event.records.push(SqsMessage {
            body: Some("not json".to_owned()),
            ..Default::default()
        });

        let queued = use_case.handle(event).await.unwrap();
        assert_eq!(queued, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let use_case = AggregateUseCase::new(
            Box::new(FakeQueue { batches: Arc::clone(&batches) }),
            10,
        );

        let queued = use_case.handle(SqsEvent { records: Vec::new() }).await.unwrap();

        assert_eq!(queued, 0);
        assert!(batches.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_invocation() {
        struct RejectingQueue;

        #[async_trait]
        impl JobQueue for RejectingQueue {
            async fn send_batch(&self, _bodies: Vec<String>) -> std::result::Result<(), String> {
                Err("queue unavailable".to_owned())
            }
        }

        let use_case = AggregateUseCase::new(Box::new(RejectingQueue), 10);

        let queued = use_case
            .handle(measurement_event(&[("up", 3, 7)]))
            .await
            .unwrap();
        assert_eq!(queued, 0);
    }
}
