//! Error types for the export pipeline.
//!
//! Each stage owns its own error enum so the orchestrator can tell a capture
//! failure (recoverable through the text fallback) from a fallback failure
//! (terminal for the call).

use thiserror::Error;

/// Errors raised by a [`DocumentWriter`](crate::writer::DocumentWriter).
#[derive(Debug, Error)]
pub enum WriterError {
    /// The document could not be serialized to PDF bytes.
    #[error("Failed to encode document: {0}")]
    Encode(String),

    /// A bitmap could not be embedded.
    #[error("Invalid image: {0}")]
    Image(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raster strategy failures. All of them are recovered by falling back to
/// the text layout strategy.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No rendered view was supplied to capture.
    #[error("Capture source element is missing")]
    MissingElement,

    /// The view did not report readiness within the configured bound.
    #[error("View was not ready after {0} ms")]
    NotReady(u64),

    /// The rasterizer produced a bitmap without pixels.
    #[error("Capture produced an empty bitmap ({width}x{height})")]
    EmptyCapture { width: u32, height: u32 },

    /// The rasterizer itself failed (unparseable tree, unreadable resources).
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error(transparent)]
    Writer(#[from] WriterError),
}

/// Text layout failures. The text strategy is the terminal fallback, so the
/// only source of errors is the document writer.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Writer(#[from] WriterError),
}

/// Caller-side input checks performed before an export is requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Full name is required")]
    MissingFullName,
}

/// Errors while loading resume data from the API or a file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Malformed resume JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resume API returned status {status} for {url}")]
    Status { status: u16, url: String },
}
