use tracing::{info, warn};

use crate::app::ports::{JobQueue, WorkspaceQuery};
use crate::domain::MetricNameJob;
use crate::error::{CardinalityError, Result};

/// SQS accepts at most ten entries per SendMessageBatch call.
pub const MAX_BATCH_ENTRIES: usize = 10;

/// Use case for the scheduled discovery function: list every metric name in
/// the workspace and fan one counting job per name out to the job queue.
pub struct DiscoverUseCase {
    workspace: Box<dyn WorkspaceQuery>,
    queue: Box<dyn JobQueue>,
}

impl DiscoverUseCase {
    pub fn new(workspace: Box<dyn WorkspaceQuery>, queue: Box<dyn JobQueue>) -> Self {
        Self { workspace, queue }
    }

    /// Returns how many names were discovered. A failed discovery query
    /// fails the invocation; a failed chunk publish is logged and the
    /// remaining chunks still go out.
    pub async fn run(&self) -> Result<usize> {
        let names = self
            .workspace
            .metric_names()
            .await
            .map_err(CardinalityError::Query)?;
        let total = names.len();
        info!(metric_names = total, "discovered workspace metric names");

        if names.is_empty() {
            return Ok(0);
        }

        let jobs: Vec<MetricNameJob> = names
            .into_iter()
            .map(|name| MetricNameJob { name, total_metrics_count: total as u64 })
            .collect();

        let mut batches = 0;
        for chunk in jobs.chunks(MAX_BATCH_ENTRIES) {
            let bodies: Vec<String> = chunk
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<_, _>>()?;
            if let Err(err) = self.queue.send_batch(bodies).await {
                warn!(error = %err, "failed enqueueing job chunk");
                continue;
            }
            batches += 1;
        }

        info!(batches, "queued metric name jobs");
        Ok(total)
    }
}
