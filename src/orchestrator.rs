//! Strategy selection: raster first, text layout as the fallback.

use crate::artifact::{ExportArtifact, ExportMode};
use crate::config::ExportConfig;
use crate::model::ResumeData;
use crate::raster::{RasterExportStrategy, Rasterizer, ResvgRasterizer};
use crate::render::RenderedView;
use crate::session::ExportSession;
use crate::telemetry;
use crate::text_layout::TextLayoutExportStrategy;
use crate::writer::{LopdfWriterFactory, WriterFactory};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of one export call as the caller sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Success {
        mode: ExportMode,
        artifact: ExportArtifact,
    },
    Failed {
        raster_error: String,
        fallback_error: String,
    },
}

impl ExportOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ExportOutcome::Success { .. })
    }

    pub fn mode(&self) -> Option<ExportMode> {
        match self {
            ExportOutcome::Success { mode, .. } => Some(*mode),
            ExportOutcome::Failed { .. } => None,
        }
    }

    pub fn artifact(&self) -> Option<&ExportArtifact> {
        match self {
            ExportOutcome::Success { artifact, .. } => Some(artifact),
            ExportOutcome::Failed { .. } => None,
        }
    }

    /// Message shown to the user once the call settles.
    pub fn notification(&self) -> &'static str {
        match self {
            ExportOutcome::Success {
                mode: ExportMode::Raster,
                ..
            } => "Resume downloaded successfully!",
            ExportOutcome::Success {
                mode: ExportMode::Text,
                ..
            } => "Resume downloaded successfully (text-based version).",
            ExportOutcome::Failed { .. } => {
                "Failed to generate PDF. Please use your browser's print function (Ctrl+P) and choose \"Save as PDF\" instead."
            }
        }
    }
}

pub struct ExportOrchestrator {
    raster: RasterExportStrategy,
    text: TextLayoutExportStrategy,
}

impl ExportOrchestrator {
    /// Creates an orchestrator from already configured strategies.
    pub fn new(raster: RasterExportStrategy, text: TextLayoutExportStrategy) -> Self {
        Self { raster, text }
    }

    /// Wires both strategies to the given capabilities.
    pub fn with_capabilities(
        rasterizer: Arc<dyn Rasterizer>,
        writers: Arc<dyn WriterFactory>,
        config: &ExportConfig,
    ) -> Self {
        Self::new(
            RasterExportStrategy::new(rasterizer, writers.clone(), config),
            TextLayoutExportStrategy::new(writers, config),
        )
    }

    /// resvg capture and lopdf output.
    pub fn with_defaults(config: &ExportConfig) -> Self {
        Self::with_capabilities(
            Arc::new(ResvgRasterizer::new()),
            Arc::new(LopdfWriterFactory),
            config,
        )
    }

    /// Exports `data`, capturing `view` when possible.
    ///
    /// Each strategy is attempted at most once. Errors never escape: they
    /// select the next state and end up in the returned outcome.
    ///
    /// # Arguments
    ///
    /// * `data` - Resume to export
    /// * `view` - Mounted rendered view; `None` goes straight to text layout
    ///
    /// # Returns
    ///
    /// `Success` with the mode that produced the artifact, or `Failed` with
    /// both strategies' error messages.
    pub async fn export(
        &self,
        data: &ResumeData,
        view: Option<&mut RenderedView>,
    ) -> ExportOutcome {
        let mut session = ExportSession::new(data.full_name());
        session.start();
        info!(
            export_id = %session.export_id,
            resume = %session.resume_name,
            "Starting resume export"
        );

        // Raster capture first; any capture error selects the text fallback
        let outcome = match self.raster.export(data, view).await {
            Ok(artifact) => {
                session.succeed();
                ExportOutcome::Success {
                    mode: ExportMode::Raster,
                    artifact,
                }
            }
            Err(capture_error) => {
                let raster_error = capture_error.to_string();
                warn!(
                    export_id = %session.export_id,
                    error = %raster_error,
                    "Raster export failed, falling back to text layout"
                );
                session.fall_back(raster_error.clone());

                match self.text.export(data) {
                    Ok(artifact) => {
                        session.succeed();
                        ExportOutcome::Success {
                            mode: ExportMode::Text,
                            artifact,
                        }
                    }
                    Err(layout_error) => {
                        let fallback_error = layout_error.to_string();
                        error!(
                            export_id = %session.export_id,
                            error = %fallback_error,
                            "Text layout export failed"
                        );
                        session.fail(fallback_error.clone());
                        ExportOutcome::Failed {
                            raster_error,
                            fallback_error,
                        }
                    }
                }
            }
        };

        telemetry::record_export_telemetry(&session);
        outcome
    }
}
