//! Export tunables and host settings.
//!
//! Environment variables read by [`HostConfig::from_env`]:
//! - `RESUME_API_URL`: base URL of the resume API (default: http://localhost:5000/api)
//! - `EXPORT_OUTPUT_DIR`: directory artifacts are saved into (default: .)
//! - `EXPORT_SETTLE_DELAY_MS`: fixed delay before capture (default: 0)
//! - `EXPORT_READINESS_TIMEOUT_MS`: bound on the readiness wait (default: 5000)
//! - `EXPORT_RASTER_SCALE`: capture oversampling factor (default: 2.0)

use crate::writer::PageFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Capture oversampling factor.
    pub raster_scale: f32,
    /// Fixed delay before the readiness wait. Zero disables it.
    pub settle_delay_ms: u64,
    pub readiness_timeout_ms: u64,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub text_layout: TextLayoutConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            raster_scale: 2.0,
            settle_delay_ms: 0,
            readiness_timeout_ms: 5000,
            page_width_mm: PageFormat::A4.width_mm,
            page_height_mm: PageFormat::A4.height_mm,
            text_layout: TextLayoutConfig::default(),
        }
    }
}

impl ExportConfig {
    pub fn page_format(&self) -> PageFormat {
        PageFormat {
            width_mm: self.page_width_mm,
            height_mm: self.page_height_mm,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }
}

/// Text fallback geometry. Lengths are millimetres, font sizes points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLayoutConfig {
    pub margin_mm: f32,
    pub top_mm: f32,
    /// Blocks that would end below this line start a new page.
    pub page_break_mm: f32,
    pub name_size_pt: f32,
    pub section_size_pt: f32,
    pub heading_size_pt: f32,
    pub body_size_pt: f32,
    pub name_line_mm: f32,
    pub section_line_mm: f32,
    pub heading_line_mm: f32,
    pub body_line_mm: f32,
    pub block_gap_mm: f32,
    pub section_gap_mm: f32,
}

impl Default for TextLayoutConfig {
    fn default() -> Self {
        Self {
            margin_mm: 20.0,
            top_mm: 20.0,
            page_break_mm: 250.0,
            name_size_pt: 20.0,
            section_size_pt: 14.0,
            heading_size_pt: 11.0,
            body_size_pt: 10.0,
            name_line_mm: 10.0,
            section_line_mm: 8.0,
            heading_line_mm: 6.0,
            body_line_mm: 5.0,
            block_gap_mm: 3.0,
            section_gap_mm: 5.0,
        }
    }
}

/// Log line format for the command-line host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line, for log shippers.
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`; unset or unrecognised values mean plain text.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Settings for the command-line host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub api_url: String,
    pub output_dir: PathBuf,
    pub export: ExportConfig,
}

impl HostConfig {
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("RESUME_API_URL")
            .unwrap_or_else(|_| "http://localhost:5000/api".to_string());
        let output_dir = std::env::var("EXPORT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        let mut export = ExportConfig::default();
        if let Some(delay) = env_parse("EXPORT_SETTLE_DELAY_MS")? {
            export.settle_delay_ms = delay;
        }
        if let Some(timeout) = env_parse("EXPORT_READINESS_TIMEOUT_MS")? {
            export.readiness_timeout_ms = timeout;
        }
        if let Some(scale) = env_parse::<f32>("EXPORT_RASTER_SCALE")? {
            anyhow::ensure!(scale > 0.0, "EXPORT_RASTER_SCALE must be positive, got {scale}");
            export.raster_scale = scale;
        }

        Ok(Self {
            api_url,
            output_dir,
            export,
        })
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid value for {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}
