//! OpenTelemetry metrics bootstrap for the ingest function.
//!
//! Installs a global meter provider backed by a periodic OTLP exporter. The
//! handler itself only talks to the `GaugeRegistry` port; nothing in the core
//! depends on which transport this module wires up.

use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{MetricExporter, WithExportConfig};
use opentelemetry_sdk::{
    metrics::{PeriodicReader, SdkMeterProvider},
    runtime, Resource,
};
use tracing::warn;

pub struct TelemetrySettings {
    pub service_name: &'static str,
    pub otlp_endpoint: String,
    pub export_interval: Duration,
}

/// Builds the OTLP metric pipeline and registers it as the global meter
/// provider. Keep the returned provider alive for the life of the process and
/// hand it back to [`shutdown_meter_provider`] on the way out.
pub fn init_meter_provider(settings: &TelemetrySettings) -> Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(&settings.otlp_endpoint)
        .build()
        .context("building OTLP metric exporter")?;

    let reader = PeriodicReader::builder(exporter, runtime::Tokio)
        .with_interval(settings.export_interval)
        .build();

    let resource = Resource::new(vec![KeyValue::new(
        opentelemetry_semantic_conventions::resource::SERVICE_NAME,
        settings.service_name,
    )]);

    let provider = SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

/// Flushes pending metrics and tears the provider down. Failures are logged
/// rather than propagated; the process is exiting either way.
pub fn shutdown_meter_provider(provider: SdkMeterProvider) {
    if let Err(err) = provider.shutdown() {
        warn!(error = %err, "meter provider shutdown failed");
    }
}
