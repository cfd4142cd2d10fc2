pub mod amp_client;
pub mod otel_registry;
pub mod sqs_queue;
