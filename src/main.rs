//! Resume export command.
//!
//! Plays the part of the "download" action: for every argument it loads a
//! resume (a JSON file path, otherwise a resume id fetched from the API),
//! exports it and saves the resulting PDF.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RESUME_API_URL`: resume API base URL (default: http://localhost:5000/api)
//! - `EXPORT_OUTPUT_DIR`: where PDFs are written (default: .)
//! - `EXPORT_SETTLE_DELAY_MS` / `EXPORT_READINESS_TIMEOUT_MS` / `EXPORT_RASTER_SCALE`
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP collector endpoint
//! - `RUST_LOG`: Log level (default: info)
//! - `LOG_FORMAT`: `json` for structured log lines (default: text)

use anyhow::{Context, Result};
use resume_export::api::{load_resume_file, ResumeClient};
use resume_export::config::{HostConfig, LogFormat};
use resume_export::orchestrator::ExportOrchestrator;
use resume_export::render::ResumeDocumentRenderer;
use resume_export::{telemetry, ResumeData};
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let json_logs = LogFormat::from_env() == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    if let Err(e) = telemetry::init_telemetry() {
        warn!("Failed to initialize telemetry: {}", e);
    }

    let targets: Vec<String> = std::env::args().skip(1).collect();
    if targets.is_empty() {
        anyhow::bail!("usage: resume-export <resume-id | resume.json>...");
    }

    let config = HostConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration: api_url={}, output_dir={}",
        config.api_url,
        config.output_dir.display()
    );
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let client = ResumeClient::new(config.api_url.clone());
    let orchestrator = ExportOrchestrator::with_defaults(&config.export);
    let renderer = ResumeDocumentRenderer::new();

    let mut failures = 0usize;
    for target in &targets {
        let resume = match load(&client, target).await {
            Ok(resume) => resume,
            Err(e) => {
                error!("Failed to load resume {}: {:#}", target, e);
                failures += 1;
                continue;
            }
        };

        if let Err(e) = resume.validate() {
            warn!("Skipping resume {}: {}", target, e);
            failures += 1;
            continue;
        }

        let mut view = renderer.render(&resume);
        let outcome = orchestrator.export(&resume, Some(&mut view)).await;

        match outcome.artifact() {
            Some(artifact) => {
                let path = artifact
                    .save_to(&config.output_dir)
                    .await
                    .with_context(|| format!("Failed to save {}", artifact.filename))?;
                info!(
                    "{} path={}, mode={}, pages={}",
                    outcome.notification(),
                    path.display(),
                    artifact.mode,
                    artifact.page_count
                );
            }
            None => {
                error!("{} resume={}", outcome.notification(), target);
                failures += 1;
            }
        }
    }

    opentelemetry::global::shutdown_tracer_provider();

    if failures > 0 {
        anyhow::bail!("{} of {} exports failed", failures, targets.len());
    }
    Ok(())
}

async fn load(client: &ResumeClient, target: &str) -> Result<ResumeData> {
    if Path::new(target).is_file() {
        return load_resume_file(target).await;
    }
    client
        .fetch_resume(target)
        .await
        .with_context(|| format!("Failed to fetch {}", client.resume_url(target)))
}
