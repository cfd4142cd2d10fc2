use amp_cardinality::app::ingest_use_case::IngestUseCase;
use amp_cardinality::config::IngestConfig;
use amp_cardinality::domain::InvocationResponse;
use amp_cardinality::infra::otel_registry::OtelGaugeRegistry;
use amp_cardinality::{logging, telemetry};
use aws_lambda_events::event::sqs::SqsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

async fn function_handler(
    use_case: &IngestUseCase,
    event: LambdaEvent<SqsEvent>,
) -> Result<InvocationResponse, Error> {
    Ok(use_case.handle(event.payload).await?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_logging();
    let config = IngestConfig::from_env()?;

    let provider = telemetry::init_meter_provider(&telemetry::TelemetrySettings {
        service_name: "ingest-amp",
        otlp_endpoint: config.otlp_endpoint.clone(),
        export_interval: config.export_interval,
    })?;

    // The execution environment sends SIGTERM before freezing; cancelling the
    // token lets an in-flight flush grace period end early.
    let shutdown = CancellationToken::new();
    let sigterm_token = shutdown.clone();
    tokio::spawn(async move {
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            sigterm.recv().await;
            sigterm_token.cancel();
        }
    });

    let registry = OtelGaugeRegistry::new(opentelemetry::global::meter("amp_cardinality"));
    let use_case = IngestUseCase::new(Box::new(registry), config.flush_grace, shutdown);

    let use_case_ref = &use_case;
    let result = run(service_fn(move |event| async move {
        function_handler(use_case_ref, event).await
    }))
    .await;

    telemetry::shutdown_meter_provider(provider);
    result
}
