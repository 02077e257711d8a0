//! Resume PDF export library.
//!
//! Turns structured resume data into a downloadable PDF. The primary path
//! renders the resume, captures it as a bitmap and places it on an A4 page;
//! when capture fails the data is laid out directly as paginated text.
//!
//! ## Module Overview
//!
//! - `model`: resume data and lenient ingestion of API payloads
//! - `api`: resume API client and file loading
//! - `render`: deterministic on-screen rendering into a capturable view
//! - `raster`: capture-and-embed export strategy
//! - `text_layout`: flowed text export strategy
//! - `orchestrator`: strategy selection and outcome reporting
//! - `session`: per-call export state machine
//! - `writer`: document writer capability backed by lopdf
//! - `typography`: font metrics and word wrapping
//! - `telemetry`: OpenTelemetry integration and structured logging
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use resume_export::{
//!     config::ExportConfig,
//!     model::ResumeData,
//!     orchestrator::ExportOrchestrator,
//!     render::ResumeDocumentRenderer,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let resume = ResumeData::from_json(
//!         r#"{"data": {"personalInfo": {"fullName": "Jane Q. Public"}}}"#,
//!     )
//!     .unwrap();
//!
//!     let mut view = ResumeDocumentRenderer::new().render(&resume);
//!     let orchestrator = ExportOrchestrator::with_defaults(&ExportConfig::default());
//!
//!     let outcome = orchestrator.export(&resume, Some(&mut view)).await;
//!     println!("{}", outcome.notification());
//! }
//! ```

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod raster;
pub mod render;
pub mod session;
pub mod telemetry;
pub mod text_layout;
pub mod typography;
pub mod writer;

pub use artifact::{ExportArtifact, ExportMode};
pub use model::ResumeData;
pub use orchestrator::{ExportOrchestrator, ExportOutcome};
