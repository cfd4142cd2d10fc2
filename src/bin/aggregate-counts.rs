use amp_cardinality::app::aggregate_use_case::AggregateUseCase;
use amp_cardinality::config::AggregateConfig;
use amp_cardinality::infra::sqs_queue::SqsJobQueue;
use amp_cardinality::logging;
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler(
    use_case: &AggregateUseCase,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), Error> {
    use_case.handle(event.payload).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_logging();
    let config = AggregateConfig::from_env()?;

    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let queue = SqsJobQueue::new(&sdk_config, config.ingest_queue_url.clone());
    let use_case = AggregateUseCase::new(Box::new(queue), config.top_n);

    let use_case_ref = &use_case;
    run(service_fn(move |event| async move {
        function_handler(use_case_ref, event).await
    }))
    .await
}
