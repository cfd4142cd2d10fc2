use amp_cardinality::app::discover_use_case::DiscoverUseCase;
use amp_cardinality::config::DiscoverConfig;
use amp_cardinality::infra::amp_client::AmpClient;
use amp_cardinality::infra::sqs_queue::SqsJobQueue;
use amp_cardinality::logging;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

/// Scheduled trigger; the event payload carries nothing this function needs.
async fn function_handler(
    use_case: &DiscoverUseCase,
    _event: LambdaEvent<serde_json::Value>,
) -> Result<(), Error> {
    use_case.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_logging();
    let config = DiscoverConfig::from_env()?;

    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let workspace = AmpClient::new(
        &sdk_config,
        &config.workspace.workspace_id,
        &config.workspace.region,
    )?;
    let queue = SqsJobQueue::new(&sdk_config, config.jobs_queue_url.clone());
    let use_case = DiscoverUseCase::new(Box::new(workspace), Box::new(queue));

    let use_case_ref = &use_case;
    run(service_fn(move |event| async move {
        function_handler(use_case_ref, event).await
    }))
    .await
}
