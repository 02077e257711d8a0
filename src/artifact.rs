//! Export artifacts and their file names.

use crate::writer::PDF_MIME;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const FALLBACK_NAME: &str = "resume";

/// Which strategy produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    Raster,
    Text,
}

impl fmt::Display for ExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportMode::Raster => write!(f, "raster"),
            ExportMode::Text => write!(f, "text"),
        }
    }
}

/// A finished PDF ready to be handed to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub mode: ExportMode,
}

impl ExportArtifact {
    pub fn mime_type(&self) -> &'static str {
        PDF_MIME
    }

    /// Writes the document into `dir` under its file name and returns the
    /// full path. Path separators in the name are replaced so the file
    /// always lands inside `dir`.
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> std::io::Result<PathBuf> {
        let safe_name: String = self
            .filename
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
            .collect();
        let path = dir.as_ref().join(safe_name);
        tokio::fs::write(&path, &self.bytes).await?;
        Ok(path)
    }
}

/// `"Jane Q. Public"` → `"Jane Q. Public.pdf"`
pub fn raster_filename(full_name: &str) -> String {
    format!("{}.pdf", display_name(full_name))
}

/// `"Jane Q. Public"` → `"Jane_Q._Public_Resume.pdf"`
pub fn text_filename(full_name: &str) -> String {
    let joined = display_name(full_name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("{joined}_Resume.pdf")
}

fn display_name(full_name: &str) -> &str {
    match full_name.trim() {
        "" => FALLBACK_NAME,
        name => name,
    }
}
