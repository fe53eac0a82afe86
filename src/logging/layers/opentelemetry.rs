use crate::logging::config::OpenTelemetryConfig;
use crate::logging::layers::BoxLayer;
use anyhow::{anyhow, Context, Result};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{resource::Resource, trace::SdkTracerProvider};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

/// Flushes and shuts the tracer provider down when dropped.
pub struct OpenTelemetryGuard(SdkTracerProvider);

impl Drop for OpenTelemetryGuard {
    fn drop(&mut self) {
        let _ = self.0.force_flush();
        let _ = self.0.shutdown();
    }
}

/// Builds an OpenTelemetry layer wired to the configured OTLP endpoint.
pub fn build_opentelemetry_layer<S>(
    config: &OpenTelemetryConfig,
) -> Result<(BoxLayer<S>, OpenTelemetryGuard)>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    let endpoint = config
        .endpoint
        .as_deref()
        .ok_or_else(|| anyhow!("OpenTelemetry endpoint not configured"))?;
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP exporter")?;

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    let layer = OpenTelemetryLayer::new(tracer);

    Ok((Box::new(layer), OpenTelemetryGuard(provider)))
}
