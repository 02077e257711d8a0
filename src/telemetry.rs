//! Telemetry and structured logging for resume exports.

use crate::session::{ExportSession, ExportState};
use opentelemetry::trace::{Span, Tracer};
use opentelemetry::{global, KeyValue};
use tracing::{info, warn};

const TRACER_NAME: &str = "resume-export";

/// Exports slower than this are flagged.
const SLOW_EXPORT_MS: i64 = 5000;

/// Records a finished export session.
///
/// Emits one OpenTelemetry span with the session's state, duration and
/// errors, plus matching structured log lines.
pub fn record_export_telemetry(session: &ExportSession) {
    let tracer = global::tracer(TRACER_NAME);
    let mut span = tracer.start("resume_export");

    span.set_attribute(KeyValue::new("export_id", session.export_id.clone()));
    span.set_attribute(KeyValue::new("resume_name", session.resume_name.clone()));
    span.set_attribute(KeyValue::new("state", session.state.to_string()));
    span.set_attribute(KeyValue::new("fallback_used", session.raster_error.is_some()));

    if let Some(duration_ms) = session.duration_ms() {
        span.set_attribute(KeyValue::new("duration_ms", duration_ms));

        info!(
            export_id = %session.export_id,
            state = %session.state,
            duration_ms = duration_ms,
            "Resume export finished"
        );

        if duration_ms > SLOW_EXPORT_MS {
            warn!(
                export_id = %session.export_id,
                duration_ms = duration_ms,
                "Resume export exceeded performance threshold ({SLOW_EXPORT_MS}ms)"
            );
        }
    }

    if let Some(ref error) = session.raster_error {
        span.set_attribute(KeyValue::new("raster_error", error.clone()));
        warn!(
            export_id = %session.export_id,
            error = %error,
            "Raster capture failed, text layout used"
        );
    }

    if session.state == ExportState::Failed {
        if let Some(ref error) = session.fallback_error {
            span.set_attribute(KeyValue::new("fallback_error", error.clone()));
            warn!(
                export_id = %session.export_id,
                error = %error,
                "Resume export failed"
            );
        }
    }

    span.end();
}

/// Initializes OpenTelemetry with an OTLP exporter.
///
/// Call once at startup. Reads:
/// - `OTEL_EXPORTER_OTLP_ENDPOINT` - Collector endpoint (default: http://localhost:4317)
/// - `OTEL_SERVICE_NAME` - Service name (default: resume-export)
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::Config;

    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let service_name =
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| TRACER_NAME.to_string());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&endpoint),
        )
        .with_trace_config(Config::default().with_resource(
            opentelemetry_sdk::Resource::new(vec![
                KeyValue::new("service.name", service_name),
                KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    if let Some(provider) = tracer.provider() {
        global::set_tracer_provider(provider);
    }

    info!("Telemetry initialized: endpoint={}", endpoint);
    Ok(())
}
