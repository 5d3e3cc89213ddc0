//! Telemetry logic.
//! Support tracing, metrics and logging.
use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{Unit, gauge};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle,
};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::trace::{Span, TraceError, Tracer};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::{LogError, SdkLogger, SdkLoggerProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");
const PROCESS_REFRESH: Duration = Duration::from_secs(10);
/// Label used for requests no route matched, to bound cardinality.
const UNMATCHED_PATH: &str = "unmatched";

fn resource() -> Resource {
    Resource::builder().with_service_name(SERVICE_NAME).build()
}

/// Create tracer exporting spans to an OTLP endpoint.
pub fn setup_tracer(endpoint: &str) -> Result<SdkTracerProvider, TraceError> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource())
        .build())
}

/// Create OTLP exporter for logs, bridged from `tracing` events.
pub fn setup_logging(
    endpoint: &str,
) -> Result<OpenTelemetryTracingBridge<SdkLoggerProvider, SdkLogger>, LogError> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;
    let provider = SdkLoggerProvider::builder()
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build();

    Ok(OpenTelemetryTracingBridge::new(&provider))
}

/// Refresh process gauges forever.
async fn process_gauges() {
    let mut system = System::new_with_specifics(RefreshKind::nothing());
    let pid = Pid::from_u32(std::process::id());

    loop {
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        if let Some(process) = system.process(pid) {
            gauge!("process_memory_used_bytes").set(process.memory() as f64);
            gauge!("process_cpu_usage").set(process.cpu_usage() as f64);
        }

        tokio::time::sleep(PROCESS_REFRESH).await;
    }
}

/// Install the global Prometheus recorder.
///
/// Must be called from inside a tokio runtime.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    metrics::describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Handled HTTP requests."
    );
    metrics::describe_histogram!(
        "http_requests_duration_seconds",
        Unit::Seconds,
        "HTTP request latency."
    );
    metrics::describe_gauge!(
        "process_cpu_usage",
        Unit::Percent,
        "CPU usage of the process in percentage."
    );
    metrics::describe_gauge!(
        "process_memory_used_bytes",
        Unit::Bytes,
        "Total process memory in bytes."
    );

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )?
        .install_recorder()?;

    tokio::spawn(process_gauges());
    Ok(handle)
}

/// Record one span, one counter and one histogram per request.
pub async fn track(req: Request, next: Next) -> Response {
    let tracer = global::tracer("userbase-http");
    let mut span = tracer.start("http-request");

    let start = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_PATH.to_owned());
    let method = req.method().to_string();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    span.set_attribute(KeyValue::new("http.route", path.clone()));
    span.set_attribute(KeyValue::new("http.method", method.clone()));
    span.set_attribute(KeyValue::new("http.status_code", status.clone()));
    span.end();

    let labels = [("method", method), ("path", path), ("status", status)];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

    response
}
