use async_trait::async_trait;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use tracing::warn;
use uuid::Uuid;

use crate::app::ports::JobQueue;

/// SQS-backed job queue. One `send_batch` call maps to one
/// `SendMessageBatch`, so callers must keep batches within the SQS limit
/// of ten entries.
pub struct SqsJobQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsJobQueue {
    pub fn new(sdk_config: &aws_config::SdkConfig, queue_url: String) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(sdk_config),
            queue_url,
        }
    }
}

#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn send_batch(&self, bodies: Vec<String>) -> Result<(), String> {
        let mut entries = Vec::with_capacity(bodies.len());
        for body in bodies {
            let entry = SendMessageBatchRequestEntry::builder()
                .id(Uuid::new_v4().to_string())
                .message_body(body)
                .build()
                .map_err(|err| err.to_string())?;
            entries.push(entry);
        }

        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let failed = output.failed();
        if !failed.is_empty() {
            for entry in failed {
                warn!(
                    entry_id = %entry.id,
                    code = %entry.code,
                    "queue rejected batch entry"
                );
            }
            return Err(format!("{} entries failed to enqueue", failed.len()));
        }
        Ok(())
    }
}
