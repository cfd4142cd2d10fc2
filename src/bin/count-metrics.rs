use amp_cardinality::app::count_use_case::CountUseCase;
use amp_cardinality::config::CountConfig;
use amp_cardinality::infra::amp_client::AmpClient;
use amp_cardinality::infra::sqs_queue::SqsJobQueue;
use amp_cardinality::logging;
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

async fn function_handler(
    use_case: &CountUseCase,
    event: LambdaEvent<SqsEvent>,
) -> Result<(), Error> {
    use_case.handle(event.payload).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_logging();
    let config = CountConfig::from_env()?;

    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let workspace = AmpClient::new(
        &sdk_config,
        &config.workspace.workspace_id,
        &config.workspace.region,
    )?;
    let queue = SqsJobQueue::new(&sdk_config, config.results_queue_url.clone());
    let use_case = CountUseCase::new(Box::new(workspace), Box::new(queue));

    let use_case_ref = &use_case;
    run(service_fn(move |event| async move {
        function_handler(use_case_ref, event).await
    }))
    .await
}
